//! Reference MCP adapter: JSON-RPC-over-stdio client and server, tool
//! discovery, and `invokeTool`. The client implements
//! `conductor_runner::McpConnection` so it plugs straight into the Runner.

pub mod client;
pub mod error;
pub mod server;
pub mod transport;
pub mod types;

pub use client::McpClient;
pub use error::McpError;
pub use server::{McpServer, ServedTool};
pub use transport::{ChannelTransport, ChildStdioTransport, McpTransport, StdioTransport};
