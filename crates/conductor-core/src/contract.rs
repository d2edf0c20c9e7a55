//! Contract declarations: the event types a handler accepts and emits.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

/// Schema + accepted/emitted event types for one version of a contract.
///
/// A handler declares exactly one self-contract plus zero or more service
/// contracts it depends on. Resumable contracts additionally name a
/// completion event type. Versioning is explicit; a Runner/Handler pair
/// always pins a single version per execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Contract {
    pub uri: String,
    pub version: String,
    pub accepted_type: String,
    pub emitted_types: Vec<String>,
    #[serde(default)]
    pub schemas: HashMap<String, Value>,
    /// Set for resumable contracts: the event type emitted on completion.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completion_type: Option<String>,
}

impl Contract {
    pub fn new(
        uri: impl Into<String>,
        version: impl Into<String>,
        accepted_type: impl Into<String>,
    ) -> Self {
        Self {
            uri: uri.into(),
            version: version.into(),
            accepted_type: accepted_type.into(),
            emitted_types: Vec::new(),
            schemas: HashMap::new(),
            completion_type: None,
        }
    }

    pub fn with_emitted_type(mut self, event_type: impl Into<String>) -> Self {
        self.emitted_types.push(event_type.into());
        self
    }

    pub fn with_completion_type(mut self, event_type: impl Into<String>) -> Self {
        self.completion_type = Some(event_type.into());
        self
    }

    pub fn with_schema(mut self, event_type: impl Into<String>, schema: Value) -> Self {
        self.schemas.insert(event_type.into(), schema);
        self
    }

    pub fn accepts(&self, event_type: &str) -> bool {
        self.accepted_type == event_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_accumulates_emitted_types() {
        let c = Contract::new("urn:agent:calculator", "1.0.0", "com.calculator.execute")
            .with_emitted_type("evt.calculator.execute.success")
            .with_emitted_type("evt.calculator.execute.error")
            .with_completion_type("evt.calculator.execute.success");
        assert_eq!(c.emitted_types.len(), 2);
        assert_eq!(
            c.completion_type.as_deref(),
            Some("evt.calculator.execute.success")
        );
        assert!(c.accepts("com.calculator.execute"));
        assert!(!c.accepts("com.other.execute"));
    }
}
