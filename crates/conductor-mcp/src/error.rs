//! Error types for the MCP adapter.

use crate::types::{error_codes, JsonRpcError};

#[derive(Debug, thiserror::Error)]
pub enum McpError {
    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    #[error("method not found: {0}")]
    MethodNotFound(String),

    #[error("invalid params: {0}")]
    InvalidParams(String),

    #[error("tool not found: {0}")]
    ToolNotFound(String),

    #[error("tool execution failed: {0}")]
    ToolExecution(String),

    #[error("not connected: call connect first")]
    NotConnected,

    #[error("server unavailable: {0}")]
    ServerUnavailable(String),
}

impl McpError {
    pub fn to_rpc_error(&self) -> JsonRpcError {
        let (code, message) = match self {
            McpError::JsonParse(_) => (error_codes::PARSE_ERROR, self.to_string()),
            McpError::MethodNotFound(_) => (error_codes::METHOD_NOT_FOUND, self.to_string()),
            McpError::InvalidParams(_) | McpError::ToolNotFound(_) => {
                (error_codes::INVALID_PARAMS, self.to_string())
            }
            _ => (error_codes::INTERNAL_ERROR, self.to_string()),
        };
        JsonRpcError {
            code,
            message,
            data: None,
        }
    }
}

impl From<McpError> for conductor_core::ConductorError {
    fn from(err: McpError) -> Self {
        conductor_core::ConductorError::ToolExecution(err.to_string())
    }
}
