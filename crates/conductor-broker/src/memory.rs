//! In-memory reference broker.
//!
//! Events carrying a `domain` are steered to that domain's subscribers
//! (human-interaction routing); everything else is delivered to the handler
//! address named in `to`. Delivery to an unregistered destination is a
//! non-fatal no-op, logged at `warn!`.

use std::collections::HashMap;
use std::sync::Mutex;

use async_trait::async_trait;
use tokio::sync::mpsc;

use conductor_core::Event;

use crate::error::BrokerError;
use crate::traits::{EventPublisher, EventSubscriber};

const CHANNEL_CAPACITY: usize = 256;

/// Shared in-process event router. One instance is meant to be wrapped in
/// an `Arc` and handed to every publisher/subscriber in a process.
#[derive(Default)]
pub struct InMemoryBroker {
    by_address: Mutex<HashMap<String, mpsc::Sender<Event>>>,
    by_domain: Mutex<HashMap<String, mpsc::Sender<Event>>>,
}

impl InMemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers interest in events whose `to` equals `address`, returning
    /// the receiving half. Re-registering the same address replaces the
    /// previous subscription.
    pub fn register_address(&self, address: impl Into<String>) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.by_address
            .lock()
            .expect("broker address map poisoned")
            .insert(address.into(), tx);
        rx
    }

    /// Registers interest in events whose `domain` equals `domain`.
    pub fn register_domain(&self, domain: impl Into<String>) -> mpsc::Receiver<Event> {
        let (tx, rx) = mpsc::channel(CHANNEL_CAPACITY);
        self.by_domain
            .lock()
            .expect("broker domain map poisoned")
            .insert(domain.into(), tx);
        rx
    }
}

#[async_trait]
impl EventPublisher for InMemoryBroker {
    async fn publish(&self, event: Event) -> Result<(), BrokerError> {
        let sender = if let Some(domain) = event.domain.as_deref() {
            self.by_domain
                .lock()
                .expect("broker domain map poisoned")
                .get(domain)
                .cloned()
        } else {
            None
        };

        let sender = match sender {
            Some(sender) => Some(sender),
            None => match event.to.as_deref() {
                Some(to) => self
                    .by_address
                    .lock()
                    .expect("broker address map poisoned")
                    .get(to)
                    .cloned(),
                None => None,
            },
        };

        let Some(sender) = sender else {
            tracing::warn!(to = ?event.to, domain = ?event.domain, "no subscriber for event, dropping");
            return Ok(());
        };

        sender.send(event).await.map_err(|_| BrokerError::SendFailed)
    }
}

/// A subscriber bound to one address or domain on an `InMemoryBroker`.
pub struct InMemorySubscriber {
    broker: std::sync::Arc<InMemoryBroker>,
    topic: String,
    is_domain: bool,
    receiver: tokio::sync::Mutex<Option<mpsc::Receiver<Event>>>,
}

impl InMemorySubscriber {
    pub fn new_for_address(broker: std::sync::Arc<InMemoryBroker>, address: impl Into<String>) -> Self {
        Self {
            broker,
            topic: address.into(),
            is_domain: false,
            receiver: tokio::sync::Mutex::new(None),
        }
    }

    pub fn new_for_domain(broker: std::sync::Arc<InMemoryBroker>, domain: impl Into<String>) -> Self {
        Self {
            broker,
            topic: domain.into(),
            is_domain: true,
            receiver: tokio::sync::Mutex::new(None),
        }
    }
}

#[async_trait]
impl EventSubscriber for InMemorySubscriber {
    async fn subscribe(&self, address_or_domain: &str) -> Result<(), BrokerError> {
        let rx = if self.is_domain {
            self.broker.register_domain(address_or_domain)
        } else {
            self.broker.register_address(address_or_domain)
        };
        *self.receiver.lock().await = Some(rx);
        Ok(())
    }

    async fn recv(&self) -> Result<Event, BrokerError> {
        let mut guard = self.receiver.lock().await;
        match guard.as_mut() {
            None => Err(BrokerError::NotSubscribed),
            Some(rx) => rx.recv().await.ok_or(BrokerError::Closed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::event::Event as CoreEvent;
    use std::sync::Arc;

    fn event_to(to: &str) -> CoreEvent {
        CoreEvent::new("test.source", "test.event", "inst-1", serde_json::json!({})).with_to(to)
    }

    #[tokio::test]
    async fn publish_delivers_to_registered_address() {
        let broker = Arc::new(InMemoryBroker::new());
        let subscriber = InMemorySubscriber::new_for_address(broker.clone(), "handler-1");
        subscriber.subscribe("handler-1").await.unwrap();

        broker.publish(event_to("handler-1")).await.unwrap();

        let received = subscriber.recv().await.unwrap();
        assert_eq!(received.to.as_deref(), Some("handler-1"));
    }

    #[tokio::test]
    async fn publish_routes_by_domain_before_address() {
        let broker = Arc::new(InMemoryBroker::new());
        let domain_sub = InMemorySubscriber::new_for_domain(broker.clone(), "human-interaction");
        domain_sub.subscribe("human-interaction").await.unwrap();

        let event = event_to("handler-1").with_domain("human-interaction");
        broker.publish(event).await.unwrap();

        let received = domain_sub.recv().await.unwrap();
        assert_eq!(received.domain.as_deref(), Some("human-interaction"));
    }

    #[tokio::test]
    async fn publish_to_unknown_destination_is_a_non_fatal_noop() {
        let broker = InMemoryBroker::new();
        let result = broker.publish(event_to("nobody-listening")).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn recv_before_subscribe_is_an_error() {
        let broker = Arc::new(InMemoryBroker::new());
        let subscriber = InMemorySubscriber::new_for_address(broker, "handler-1");
        let err = subscriber.recv().await.unwrap_err();
        assert!(matches!(err, BrokerError::NotSubscribed));
    }
}
