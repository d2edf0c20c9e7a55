//! The shape a caller describes a tool in, before the registry assigns it
//! an agentic name.

use serde_json::Value;

/// An externally-hosted tool, described by the caller of `init`/`resume`.
#[derive(Debug, Clone)]
pub struct ExternalToolDescriptor {
    pub raw_name: String,
    pub description: String,
    pub input_schema: Value,
    pub priority: i32,
    pub requires_approval: bool,
}

impl ExternalToolDescriptor {
    pub fn new(raw_name: impl Into<String>, description: impl Into<String>, input_schema: Value) -> Self {
        Self {
            raw_name: raw_name.into(),
            description: description.into(),
            input_schema,
            priority: 0,
            requires_approval: false,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_requires_approval(mut self, requires_approval: bool) -> Self {
        self.requires_approval = requires_approval;
        self
    }
}

/// A tool as reported by an MCP connection's `getTools`.
#[derive(Debug, Clone)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}
