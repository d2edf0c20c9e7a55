//! The MCP adapter contract the Runner schedules in-loop tool invocations
//! against.

use async_trait::async_trait;
use serde_json::Value;

use conductor_core::ConductorError;

use crate::tool_descriptor::McpToolInfo;

#[async_trait]
pub trait McpConnection: Send + Sync {
    async fn connect(&self) -> Result<(), ConductorError>;
    async fn disconnect(&self) -> Result<(), ConductorError>;
    async fn get_tools(&self) -> Result<Vec<McpToolInfo>, ConductorError>;

    /// Invoke a tool by its raw name. Failures are caught by the Runner and
    /// surfaced as a tool_result string, never thrown past the loop.
    async fn invoke_tool(&self, name: &str, arguments: Option<Value>) -> Result<String, ConductorError>;

    /// Raw names of tools this connection reports as requiring approval.
    fn restricted_tools(&self) -> Vec<String> {
        Vec::new()
    }
}
