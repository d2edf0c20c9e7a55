//! Event transport abstraction for the Resumable Handler: `EventPublisher`/
//! `EventSubscriber` traits plus an in-memory reference broker.

pub mod error;
pub mod memory;
pub mod traits;

pub use error::BrokerError;
pub use memory::{InMemoryBroker, InMemorySubscriber};
pub use traits::{EventPublisher, EventSubscriber};
