use clap::Parser;

/// conductor-cli — run a single agent invocation end to end and print the
/// events it produces. Not an interactive loop: one `init` event in, the
/// resulting completion or tool-request events out.
#[derive(Parser, Debug)]
#[command(name = "conductor-cli", version, about)]
pub struct CliArgs {
    /// Message to send as the agent's initial user message.
    #[arg(long, default_value = "what is 2 + 2?")]
    pub message: String,

    /// Instance subject to run under. Defaults to a fresh id.
    #[arg(long)]
    pub subject: Option<String>,

    /// Base URL of an OpenAI-shaped chat endpoint. When unset, falls back
    /// to a scripted mock adapter that answers any calculator-style
    /// question without a network call.
    #[arg(long, env = "CONDUCTOR_LLM_URL")]
    pub llm_url: Option<String>,

    /// Model name passed to the HTTP adapter, ignored by the mock adapter.
    #[arg(long, env = "CONDUCTOR_LLM_MODEL", default_value = "gpt-4o-mini")]
    pub model: String,
}
