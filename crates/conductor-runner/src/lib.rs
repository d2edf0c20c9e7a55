//! The Agent Execution Loop: tool registry, name-formatted tool
//! definitions, LLM/MCP/approval-cache adapter contracts, the context
//! builder, validators, and the `init`/`resume` Runner.

pub mod approval_cache;
pub mod context;
pub mod error;
pub mod identity;
pub mod llm_adapter;
pub mod mcp_adapter;
pub mod registry;
pub mod runner;
pub mod stream;
pub mod tool_descriptor;
pub mod validator;

pub use approval_cache::ApprovalCache;
pub use context::{ContextBuilder, ContextInput, ContextOutput, DefaultContextBuilder};
pub use error::RunnerError;
pub use identity::{DelegatorIdentity, SelfIdentity};
pub use llm_adapter::{LlmAdapter, LlmInput, LlmOutcome, LlmToolCall, Usage};
pub use mcp_adapter::McpConnection;
pub use registry::ToolRegistry;
pub use runner::{Runner, RunnerOutcome, RunnerParams, RunnerResult};
pub use stream::RunnerEvent;
pub use tool_descriptor::{ExternalToolDescriptor, McpToolInfo};
pub use validator::{InputValidator, OutputValidator, ValidationFailure};
