//! A minimal MCP server: wraps a set of locally-implemented tools and
//! exposes them over the MCP protocol. Callers register `ServedTool`
//! implementations directly.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::error::McpError;
use crate::transport::McpTransport;
use crate::types::*;

/// A tool this server can execute, reported to clients via `tools/list` and
/// invoked via `tools/call`.
#[async_trait]
pub trait ServedTool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn input_schema(&self) -> Value;
    async fn call(&self, arguments: Value) -> Result<String, String>;
}

/// MCP server bridging a set of `ServedTool`s to MCP clients over a
/// transport.
pub struct McpServer {
    tools: HashMap<String, Arc<dyn ServedTool>>,
    server_name: String,
    server_version: String,
}

impl McpServer {
    pub fn new(server_name: impl Into<String>) -> Self {
        Self {
            tools: HashMap::new(),
            server_name: server_name.into(),
            server_version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }

    pub fn register(&mut self, tool: Arc<dyn ServedTool>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    pub async fn run<T: McpTransport>(&mut self, transport: &mut T) -> Result<(), McpError> {
        tracing::info!(server = %self.server_name, "mcp server starting");
        loop {
            let line = match transport.receive().await? {
                Some(line) => line,
                None => {
                    tracing::info!("transport closed, shutting down");
                    break;
                }
            };

            let raw: Value = match serde_json::from_str(&line) {
                Ok(v) => v,
                Err(e) => {
                    let resp = JsonRpcResponse::error(
                        RpcId::Number(0),
                        McpError::from(e).to_rpc_error().code,
                        "failed to parse request",
                    );
                    transport.send(&serde_json::to_string(&resp)?).await?;
                    continue;
                }
            };

            if raw.get("id").is_none() {
                if let Ok(notif) = serde_json::from_value::<JsonRpcNotification>(raw) {
                    self.handle_notification(&notif);
                }
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_value(raw) {
                Ok(req) => req,
                Err(e) => {
                    let resp = JsonRpcResponse::error(
                        RpcId::Number(0),
                        McpError::from(e).to_rpc_error().code,
                        "failed to parse request",
                    );
                    transport.send(&serde_json::to_string(&resp)?).await?;
                    continue;
                }
            };

            let response = self.handle_request(&request).await;
            transport.send(&serde_json::to_string(&response)?).await?;
        }
        Ok(())
    }

    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.id.clone();
        match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, &request.params).await,
            method => {
                let err = McpError::MethodNotFound(method.to_string());
                JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string())
            }
        }
    }

    fn handle_notification(&self, notif: &JsonRpcNotification) {
        match notif.method.as_str() {
            "notifications/initialized" => tracing::info!("client confirmed initialization"),
            method => tracing::debug!(method = %method, "unknown notification, ignoring"),
        }
    }

    fn handle_initialize(&self, id: RpcId) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability { list_changed: false }),
            },
            server_info: ServerInfo {
                name: self.server_name.clone(),
                version: Some(self.server_version.clone()),
            },
        };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    fn handle_list_tools(&self, id: RpcId) -> JsonRpcResponse {
        let tools: Vec<ToolInfo> = self
            .tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                input_schema: t.input_schema(),
            })
            .collect();
        JsonRpcResponse::success(id, serde_json::to_value(ListToolsResult { tools }).unwrap())
    }

    async fn handle_call_tool(&self, id: RpcId, params: &Option<Value>) -> JsonRpcResponse {
        let params = match params {
            Some(p) => p,
            None => {
                let err = McpError::InvalidParams("missing params".to_string());
                return JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string());
            }
        };
        let call_params: CallToolParams = match serde_json::from_value(params.clone()) {
            Ok(p) => p,
            Err(e) => {
                let err = McpError::InvalidParams(e.to_string());
                return JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string());
            }
        };

        let tool = match self.tools.get(&call_params.name) {
            Some(t) => t,
            None => {
                let err = McpError::ToolNotFound(call_params.name.clone());
                return JsonRpcResponse::error(id, err.to_rpc_error().code, err.to_string());
            }
        };

        let result = match tool.call(call_params.arguments).await {
            Ok(text) => CallToolResult {
                content: vec![ToolContent::Text { text }],
                is_error: false,
            },
            Err(message) => CallToolResult {
                content: vec![ToolContent::Text { text: message }],
                is_error: true,
            },
        };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::ChannelTransport;

    struct EchoTool;

    #[async_trait]
    impl ServedTool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }
        fn description(&self) -> &str {
            "echoes the message field back"
        }
        fn input_schema(&self) -> Value {
            serde_json::json!({"type": "object", "properties": {"message": {"type": "string"}}})
        }
        async fn call(&self, arguments: Value) -> Result<String, String> {
            Ok(arguments["message"].as_str().unwrap_or_default().to_string())
        }
    }

    fn test_server() -> McpServer {
        let mut server = McpServer::new("test-mcp-server");
        server.register(Arc::new(EchoTool));
        server
    }

    #[tokio::test]
    async fn initialize_reports_protocol_version() {
        let server = test_server();
        let req = JsonRpcRequest::new(RpcId::Number(1), "initialize", None);
        let resp = server.handle_request(&req).await;
        let result: InitializeResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.protocol_version, PROTOCOL_VERSION);
    }

    #[tokio::test]
    async fn list_tools_reports_registered_tool() {
        let server = test_server();
        let req = JsonRpcRequest::new(RpcId::Number(2), "tools/list", None);
        let resp = server.handle_request(&req).await;
        let result: ListToolsResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert_eq!(result.tools.len(), 1);
        assert_eq!(result.tools[0].name, "echo");
    }

    #[tokio::test]
    async fn call_tool_invokes_registered_tool() {
        let server = test_server();
        let req = JsonRpcRequest::new(
            RpcId::Number(3),
            "tools/call",
            Some(serde_json::json!({"name": "echo", "arguments": {"message": "hi"}})),
        );
        let resp = server.handle_request(&req).await;
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        assert!(!result.is_error);
        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "hi"),
        }
    }

    #[tokio::test]
    async fn call_unknown_tool_is_an_error_response() {
        let server = test_server();
        let req = JsonRpcRequest::new(
            RpcId::Number(4),
            "tools/call",
            Some(serde_json::json!({"name": "missing", "arguments": {}})),
        );
        let resp = server.handle_request(&req).await;
        assert!(resp.error.is_some());
        assert_eq!(resp.error.unwrap().code, error_codes::INVALID_PARAMS);
    }

    #[tokio::test]
    async fn full_roundtrip_over_channel_transport() {
        let (mut client_side, mut server_side) = ChannelTransport::pair();
        let mut server = test_server();
        let handle = tokio::spawn(async move { server.run(&mut server_side).await });

        let init = JsonRpcRequest::new(RpcId::Number(1), "initialize", None);
        client_side.send(&serde_json::to_string(&init).unwrap()).await.unwrap();
        let line = client_side.receive().await.unwrap().unwrap();
        let resp: JsonRpcResponse = serde_json::from_str(&line).unwrap();
        assert!(resp.error.is_none());

        let call = JsonRpcRequest::new(
            RpcId::Number(2),
            "tools/call",
            Some(serde_json::json!({"name": "echo", "arguments": {"message": "via transport"}})),
        );
        client_side.send(&serde_json::to_string(&call).unwrap()).await.unwrap();
        let line = client_side.receive().await.unwrap().unwrap();
        let resp: JsonRpcResponse = serde_json::from_str(&line).unwrap();
        let result: CallToolResult = serde_json::from_value(resp.result.unwrap()).unwrap();
        match &result.content[0] {
            ToolContent::Text { text } => assert_eq!(text, "via transport"),
        }

        drop(client_side);
        handle.await.unwrap().unwrap();
    }
}
