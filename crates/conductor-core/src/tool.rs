//! Tool definitions and tool requests as they flow through the registry.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Which kind of server hosts a tool. Dispatch on this tag rather than a
/// trait-object hierarchy per server kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolServerKind {
    External,
    Mcp,
}

/// A tool as registered for one execution, after agentic-name formatting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The raw name as the tool server knows it (e.g. `com.calculator.execute`).
    pub raw_name: String,
    /// The agentic name presented to the LLM (e.g. `com_calculator_execute`).
    pub agentic_name: String,
    pub description: String,
    pub input_schema: Value,
    pub server_kind: ToolServerKind,
    #[serde(default)]
    pub priority: i32,
    #[serde(default)]
    pub requires_approval: bool,
}

impl fmt::Display for ToolDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.agentic_name, self.raw_name)
    }
}

/// A tool request as emitted by the LLM, keyed by the agentic name.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolRequest {
    /// The LLM-issued tool_use id. Unique within the emitted batch.
    pub id: String,
    /// The raw tool name this request must resolve to.
    #[serde(rename = "type")]
    pub request_type: String,
    pub data: Value,
}
