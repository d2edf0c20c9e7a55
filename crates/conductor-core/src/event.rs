//! The event envelope exchanged between handlers, brokers, and tool servers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// W3C-style trace propagation headers. Opaque to this crate; carried
/// through so a real exporter downstream can make use of them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceHeaders {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub traceparent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tracestate: Option<String>,
}

/// A single event flowing through the system.
///
/// `subject` is the instance key for resumable handlers. `parent_id` chains
/// cause to effect. `to` is a routing destination (a handler's `source`).
/// `domain` is an optional routing tag steering human-interaction events to
/// a particular consumer pool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub id: String,
    pub source: String,
    #[serde(rename = "type")]
    pub event_type: String,
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<String>,
    pub data: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    #[serde(default)]
    pub trace_headers: TraceHeaders,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dataschema: Option<String>,
    pub time: DateTime<Utc>,
    pub specversion: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub executionunits: Option<f64>,
}

impl Event {
    /// Build a new event with a fresh id and the current timestamp.
    pub fn new(
        source: impl Into<String>,
        event_type: impl Into<String>,
        subject: impl Into<String>,
        data: Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            source: source.into(),
            event_type: event_type.into(),
            subject: subject.into(),
            parent_id: None,
            to: None,
            data,
            domain: None,
            trace_headers: TraceHeaders::default(),
            dataschema: None,
            time: Utc::now(),
            specversion: "1.0".to_string(),
            executionunits: None,
        }
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    pub fn with_to(mut self, to: impl Into<String>) -> Self {
        self.to = Some(to.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    pub fn with_trace_headers(mut self, trace_headers: TraceHeaders) -> Self {
        self.trace_headers = trace_headers;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_event_has_unique_id_and_specversion() {
        let a = Event::new("agent.calculator", "evt.do", "inst-1", Value::Null);
        let b = Event::new("agent.calculator", "evt.do", "inst-1", Value::Null);
        assert_ne!(a.id, b.id);
        assert_eq!(a.specversion, "1.0");
        assert_eq!(a.subject, "inst-1");
    }

    #[test]
    fn builder_methods_set_optional_fields() {
        let evt = Event::new("a", "t", "s", Value::Null)
            .with_parent("parent-1")
            .with_to("handler.b")
            .with_domain("human-interaction");
        assert_eq!(evt.parent_id.as_deref(), Some("parent-1"));
        assert_eq!(evt.to.as_deref(), Some("handler.b"));
        assert_eq!(evt.domain.as_deref(), Some("human-interaction"));
    }

    #[test]
    fn serde_round_trip_preserves_fields() {
        let evt = Event::new("a", "t", "s", serde_json::json!({"x": 1}));
        let json = serde_json::to_string(&evt).unwrap();
        let back: Event = serde_json::from_str(&json).unwrap();
        assert_eq!(back.id, evt.id);
        assert_eq!(back.data, evt.data);
    }
}
