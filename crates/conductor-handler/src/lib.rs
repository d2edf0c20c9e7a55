//! The Resumable Handler: instance lifecycle (init/resume dispatch),
//! correlation of arrived tool-result events against outstanding requests,
//! and the emission rules that turn a Runner outcome into outbound events.

pub mod config;
pub mod error;
pub mod handler;

pub use config::{HandlerConfig, ServiceRoute};
pub use error::HandlerError;
pub use handler::ResumableHandler;
