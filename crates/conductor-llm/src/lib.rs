//! Reference implementations of `conductor_runner::LlmAdapter`: a
//! queue-driven mock for deterministic tests and a generic,
//! non-vendor-specific HTTP chat adapter. Concrete vendor wire formats
//! (Claude, OpenAI, Gemini, Ollama...) are out of scope for this core.

pub mod error;
pub mod http;
pub mod mock;

pub use error::LlmError;
pub use http::HttpChatAdapter;
pub use mock::MockLlmAdapter;
