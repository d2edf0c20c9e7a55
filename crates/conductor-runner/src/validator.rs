//! Input and output validators. Failures stay inside the loop: they are
//! delivered to the LLM as user messages carrying schema and a
//! human-readable message for self-correction.

use async_trait::async_trait;
use serde_json::Value;

/// A validation failure, carrying enough structure for the LLM to correct
/// itself.
#[derive(Debug, Clone)]
pub struct ValidationFailure {
    pub schema: Option<Value>,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            schema: None,
            message: message.into(),
        }
    }

    pub fn with_schema(mut self, schema: Value) -> Self {
        self.schema = Some(schema);
        self
    }

    /// Render as the text content of the user message the Runner appends on
    /// failure.
    pub fn to_user_text(&self) -> String {
        match &self.schema {
            Some(schema) => format!(
                "Validation failed: {}\nExpected schema: {}",
                self.message, schema
            ),
            None => format!("Validation failed: {}", self.message),
        }
    }
}

#[async_trait]
pub trait InputValidator: Send + Sync {
    async fn validate(&self, tool_name: &str, input: &Value) -> Result<(), ValidationFailure>;
}

/// Output validators receive whether the tool budget was exhausted this
/// iteration. They MUST return `Ok(())` when `exhausted` is true so a
/// partial response is accepted verbatim.
#[async_trait]
pub trait OutputValidator: Send + Sync {
    async fn validate(&self, output: &Value, exhausted: bool) -> Result<(), ValidationFailure>;
}
