//! Crate-wide error taxonomy shared by every conductor crate.

use thiserror::Error;

/// The error taxonomy every conductor crate ultimately converts into.
///
/// Each variant corresponds to one of the failure classes the runtime
/// distinguishes between: configuration mistakes are fatal at setup time,
/// validation/tool/unknown-tool errors stay inside the execution loop and are
/// surfaced to the model, lock acquisition is retryable, and everything else
/// is a fatal runtime failure that aborts the current invocation.
#[derive(Debug, Error)]
pub enum ConductorError {
    /// Invalid contract wiring, duplicate tool registrations, or a tool-name
    /// formatting collision. Fatal at startup/initialization.
    #[error("configuration error: {0}")]
    Config(String),

    /// A tool input or final output failed schema validation. Non-fatal
    /// while the interaction budget allows further iterations.
    #[error("validation error: {0}")]
    Validation(String),

    /// An external or MCP tool invocation failed. Non-fatal; inlined as a
    /// tool_result.
    #[error("tool execution error: {0}")]
    ToolExecution(String),

    /// A tool request referenced a name not present in the registry.
    #[error("unknown tool: {0}")]
    UnknownTool(String),

    /// A lock could not be acquired after exhausting retries. Retryable by
    /// the caller.
    #[error("lock acquisition failed for {0}")]
    LockAcquisition(String),

    /// Exceeded the iteration ceiling, an LLM adapter failure, or a
    /// persistence failure. Fatal; current instance state is not updated.
    #[error("runtime error: {0}")]
    Runtime(String),

    /// Catch-all for errors from dependencies that don't map cleanly onto
    /// the taxonomy above.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ConductorError {
    /// Name used in the `errorName` field of a `.error` system reply event.
    pub fn error_name(&self) -> &'static str {
        match self {
            ConductorError::Config(_) => "ConfigError",
            ConductorError::Validation(_) => "ValidationError",
            ConductorError::ToolExecution(_) => "ToolExecutionError",
            ConductorError::UnknownTool(_) => "UnknownToolError",
            ConductorError::LockAcquisition(_) => "LockAcquisitionError",
            ConductorError::Runtime(_) => "RuntimeError",
            ConductorError::Other(_) => "RuntimeError",
        }
    }

    /// Whether this error class is fatal to the current invocation (as
    /// opposed to being recoverable within the execution loop).
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            ConductorError::Config(_) | ConductorError::Runtime(_) | ConductorError::Other(_)
        )
    }
}
