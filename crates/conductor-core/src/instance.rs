//! The per-instance state record owned exclusively by the State Store, plus
//! the Approval Record and Lock entities it persists alongside it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::transcript::Message;

/// Persisted state for one long-running agent instance, keyed by `subject`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Instance {
    pub subject: String,
    pub messages: Vec<Message>,
    pub tool_interaction_count: u32,
    /// Count of each expected service-reply event type still outstanding
    /// for the in-flight suspension, keyed by event type.
    #[serde(default)]
    pub expected_tool_type_counts: HashMap<String, u32>,
    /// The agent (by contract source) that delegated this instance, if any.
    /// Cyclic peer relationships are modeled through this field, never
    /// through a shared object graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delegated_by: Option<String>,
}

impl Instance {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            messages: Vec::new(),
            tool_interaction_count: 0,
            expected_tool_type_counts: HashMap::new(),
            delegated_by: None,
        }
    }

    /// Record one event type as expected among the outstanding replies for
    /// the current suspension.
    pub fn expect_reply(&mut self, event_type: impl Into<String>) {
        *self
            .expected_tool_type_counts
            .entry(event_type.into())
            .or_insert(0) += 1;
    }

    /// Returns true once every expected reply type has arrived zero or
    /// fewer times remaining (i.e. all counts have been decremented to 0).
    pub fn all_replies_collected(&self) -> bool {
        self.expected_tool_type_counts.values().all(|&c| c == 0)
    }
}

/// A cached approval decision for one (instance scope, tool name) pair.
/// `true` may bypass future approval prompts for that pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApprovalRecord {
    pub value: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

/// Data-model view of a Lock: who holds `instance_key`, since when, and for
/// how long. The mutex mechanics that enforce this live in conductor-store;
/// this type is the record the Store reasons about.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockRecord {
    pub instance_key: String,
    pub acquired_at: chrono::DateTime<chrono::Utc>,
    pub ttl_secs: u64,
}

impl LockRecord {
    pub fn is_stale(&self, now: chrono::DateTime<chrono::Utc>) -> bool {
        let elapsed = (now - self.acquired_at).num_seconds();
        elapsed.max(0) as u64 > self.ttl_secs
    }
}
