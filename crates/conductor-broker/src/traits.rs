//! The event transport abstraction the Resumable Handler is built against:
//! a publish/subscribe split over a single envelope type
//! (`conductor_core::Event`).

use std::sync::Arc;

use async_trait::async_trait;

use conductor_core::Event;

use crate::error::BrokerError;

/// Publishes events to their `to`/`domain` destination. Cross-process
/// queueing and durability are the concern of whatever backs this trait;
/// it only promises best-effort in-process or adapted delivery.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: Event) -> Result<(), BrokerError>;
}

#[async_trait]
impl<T: EventPublisher + ?Sized> EventPublisher for Arc<T> {
    async fn publish(&self, event: Event) -> Result<(), BrokerError> {
        (**self).publish(event).await
    }
}

/// Subscribes to events addressed to a given handler/domain and receives
/// them one at a time.
#[async_trait]
pub trait EventSubscriber: Send + Sync {
    /// Subscribe to events routed to `address_or_domain` (a handler's
    /// `source`, or a `domain` tag).
    async fn subscribe(&self, address_or_domain: &str) -> Result<(), BrokerError>;

    /// Receive the next event. Blocks until one is available.
    async fn recv(&self) -> Result<Event, BrokerError>;
}
