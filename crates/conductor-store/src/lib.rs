//! The Concurrent State Store: per-instance persistence, mutual exclusion
//! with TTL-based lock recovery, and the approval cache.

pub mod error;
pub mod lock;
pub mod store;

pub use error::StoreError;
pub use store::{StateStore, StoreConfig};
