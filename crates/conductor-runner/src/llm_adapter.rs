//! The LLM adapter contract the Runner calls each iteration:
//! `{systemPrompt?, messages, tools, outputFormat?} -> {response,
//! toolRequests, usage}`. Concrete vendor wire formats are out of scope for
//! this crate; `conductor-llm` supplies a mock and a generic HTTP reference
//! implementation against this trait.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use conductor_core::{ConductorError, Message, ToolDefinition};

/// Token accounting reported by the adapter, passed through untouched.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// One tool call the LLM chose to make, by its agentic name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmToolCall {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// What the Runner sends the adapter each iteration. `tools` never carries
/// `requires_approval` semantics to the model; callers pass the registry's
/// definitions and the adapter is responsible for stripping fields the wire
/// format doesn't need.
#[derive(Debug, Clone)]
pub struct LlmInput {
    pub system_prompt: Option<String>,
    pub messages: Vec<Message>,
    pub tools: Vec<ToolDefinition>,
    pub output_schema: Option<Value>,
}

/// Exactly one of a final response or a batch of tool calls, per the
/// contract: never both, never neither.
#[derive(Debug, Clone)]
pub enum LlmOutcome {
    Response { value: Value, usage: Usage },
    ToolCalls { calls: Vec<LlmToolCall>, usage: Usage },
}

#[async_trait]
pub trait LlmAdapter: Send + Sync {
    async fn call(&self, input: LlmInput) -> Result<LlmOutcome, ConductorError>;

    fn provider_name(&self) -> &str {
        "generic"
    }
}
