//! The MCP client: spawns a server subprocess over stdio, performs the
//! initialize handshake, discovers tools, and forwards invocations.
//! Implements `conductor_runner::McpConnection` so it plugs directly into
//! the Runner's `RunnerParams::mcp_connection`.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::{Child, Command};

use conductor_core::ConductorError;
use conductor_runner::{McpConnection, McpToolInfo};

use crate::error::McpError;
use crate::transport::{ChildStdioTransport, McpTransport};
use crate::types::{
    CallToolResult, InitializeResult, JsonRpcRequest, JsonRpcResponse, ListToolsResult, RpcId,
    ToolContent, ToolInfo, PROTOCOL_VERSION,
};

struct Connected {
    child: Child,
    transport: ChildStdioTransport,
    next_id: i64,
    tools: HashMap<String, ToolInfo>,
}

/// An MCP connection backed by a spawned server subprocess. Built once per
/// execution (not process-global), matching `RunnerParams::mcp_connection`'s
/// per-call lifetime.
pub struct McpClient {
    program: String,
    args: Vec<String>,
    restricted: Vec<String>,
    state: tokio::sync::Mutex<Option<Connected>>,
}

impl McpClient {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            restricted: Vec::new(),
            state: tokio::sync::Mutex::new(None),
        }
    }

    /// Names this connection reports as requiring approval, surfaced via
    /// `McpConnection::restricted_tools`.
    pub fn with_restricted_tools(mut self, names: Vec<String>) -> Self {
        self.restricted = names;
        self
    }

    async fn request(
        transport: &mut ChildStdioTransport,
        next_id: &mut i64,
        method: &str,
        params: Option<Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let id = *next_id;
        *next_id += 1;
        let request = JsonRpcRequest::new(RpcId::Number(id), method, params);
        let json = serde_json::to_string(&request)?;
        tracing::debug!(method = %method, id, "sending mcp request");
        transport.send(&json).await?;
        let line = transport
            .receive()
            .await?
            .ok_or_else(|| McpError::ServerUnavailable("connection closed".to_string()))?;
        let response: JsonRpcResponse = serde_json::from_str(&line)?;
        Ok(response)
    }
}

#[async_trait]
impl McpConnection for McpClient {
    async fn connect(&self) -> Result<(), ConductorError> {
        let mut guard = self.state.lock().await;
        if guard.is_some() {
            return Ok(());
        }

        tracing::info!(program = %self.program, "spawning mcp server process");
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::inherit())
            .spawn()
            .map_err(McpError::from)?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| McpError::ServerUnavailable("failed to capture server stdin".into()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| McpError::ServerUnavailable("failed to capture server stdout".into()))?;
        let mut transport = ChildStdioTransport::new(stdout, stdin);
        let mut next_id = 1i64;

        let init_params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {"name": "conductor-mcp", "version": env!("CARGO_PKG_VERSION")},
        });
        let resp = Self::request(&mut transport, &mut next_id, "initialize", Some(init_params))
            .await
            .map_err(McpError::from)?;
        if let Some(err) = resp.error {
            return Err(McpError::ServerUnavailable(err.message).into());
        }
        let _: InitializeResult = serde_json::from_value(resp.result.unwrap_or_default())
            .map_err(McpError::from)?;

        let notif = crate::types::JsonRpcNotification::new("notifications/initialized", None);
        let json = serde_json::to_string(&notif).map_err(McpError::from)?;
        transport.send(&json).await.map_err(McpError::from)?;

        tracing::info!("mcp client initialized");
        *guard = Some(Connected {
            child,
            transport,
            next_id,
            tools: HashMap::new(),
        });
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), ConductorError> {
        let mut guard = self.state.lock().await;
        if let Some(mut connected) = guard.take() {
            let _ = connected.child.kill().await;
        }
        Ok(())
    }

    async fn get_tools(&self) -> Result<Vec<McpToolInfo>, ConductorError> {
        let mut guard = self.state.lock().await;
        let connected = guard
            .as_mut()
            .ok_or(McpError::NotConnected)
            .map_err(ConductorError::from)?;

        let resp = Self::request(&mut connected.transport, &mut connected.next_id, "tools/list", None)
            .await
            .map_err(McpError::from)?;
        if let Some(err) = resp.error {
            return Err(McpError::ServerUnavailable(err.message).into());
        }
        let result: ListToolsResult = serde_json::from_value(resp.result.unwrap_or_default())
            .map_err(McpError::from)?;

        connected.tools.clear();
        for tool in &result.tools {
            connected.tools.insert(tool.name.clone(), tool.clone());
        }
        tracing::info!(count = connected.tools.len(), "mcp tool discovery complete");

        Ok(result
            .tools
            .into_iter()
            .map(|t| McpToolInfo {
                name: t.name,
                description: t.description,
                input_schema: t.input_schema,
            })
            .collect())
    }

    async fn invoke_tool(&self, name: &str, arguments: Option<Value>) -> Result<String, ConductorError> {
        let mut guard = self.state.lock().await;
        let connected = guard
            .as_mut()
            .ok_or(McpError::NotConnected)
            .map_err(ConductorError::from)?;

        let params = serde_json::json!({
            "name": name,
            "arguments": arguments.unwrap_or(Value::Null),
        });
        let resp = Self::request(
            &mut connected.transport,
            &mut connected.next_id,
            "tools/call",
            Some(params),
        )
        .await
        .map_err(McpError::from)?;
        if let Some(err) = resp.error {
            return Err(McpError::ToolExecution(err.message).into());
        }
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap_or_default())
            .map_err(McpError::from)?;

        let text = result
            .content
            .into_iter()
            .map(|c| match c {
                ToolContent::Text { text } => text,
            })
            .collect::<Vec<_>>()
            .join("\n");

        if result.is_error {
            return Err(McpError::ToolExecution(text).into());
        }
        Ok(text)
    }

    fn restricted_tools(&self) -> Vec<String> {
        self.restricted.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restricted_tools_reports_configured_names() {
        let client = McpClient::new("mcp-server-binary", vec![])
            .with_restricted_tools(vec!["payments.charge".to_string()]);
        assert_eq!(client.restricted_tools(), vec!["payments.charge".to_string()]);
    }

    #[tokio::test]
    async fn invoking_before_connect_is_not_connected_error() {
        let client = McpClient::new("mcp-server-binary", vec![]);
        let err = client.invoke_tool("echo", None).await.unwrap_err();
        assert!(matches!(err, ConductorError::ToolExecution(_)));
    }
}
