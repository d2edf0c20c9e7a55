//! Crate-local error type for LLM adapters, composed into
//! `conductor_core::ConductorError` at the call site.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error: {status} — {body}")]
    Api { status: u16, body: String },

    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("provider not configured: {0}")]
    NotConfigured(String),
}

impl From<LlmError> for conductor_core::ConductorError {
    fn from(err: LlmError) -> Self {
        conductor_core::ConductorError::Runtime(err.to_string())
    }
}
