//! The Concurrent State Store: per-instance state persistence plus the
//! mutual-exclusion lock protocol, and the approval cache that shares the
//! same per-key mutex discipline.

use std::collections::HashMap;

use tokio::sync::Mutex;

use conductor_core::{deep_clone, ApprovalRecord, ConductorError, Instance, LockConfig};

use crate::error::StoreError;
use crate::lock::LockTable;

/// Whether completed instances are removed on `cleanup`, or retained.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    pub lock: LockConfig,
    pub cleanup_enabled: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            lock: LockConfig::default(),
            cleanup_enabled: true,
        }
    }
}

/// In-process reference implementation of the Concurrent State Store.
/// Records are deep-cloned on every boundary crossing so no caller ever
/// observes or mutates the Store's internal objects directly.
pub struct StateStore {
    instances: Mutex<HashMap<String, Instance>>,
    approvals: Mutex<HashMap<(String, String), ApprovalRecord>>,
    instance_locks: LockTable,
    approval_locks: LockTable,
    config: StoreConfig,
}

impl StateStore {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            instances: Mutex::new(HashMap::new()),
            approvals: Mutex::new(HashMap::new()),
            instance_locks: LockTable::new(config.lock.clone()),
            approval_locks: LockTable::new(config.lock.clone()),
            config,
        }
    }

    /// Deep-cloned snapshot, or `None` if no instance is recorded under `id`.
    pub async fn read(&self, id: &str) -> Result<Option<Instance>, ConductorError> {
        let instances = self.instances.lock().await;
        match instances.get(id) {
            Some(instance) => Ok(Some(deep_clone(instance)?)),
            None => Ok(None),
        }
    }

    /// Store a deep clone of `data`; the caller's copy is never retained.
    pub async fn write(&self, id: &str, data: &Instance) -> Result<(), ConductorError> {
        let cloned = deep_clone(data)?;
        let mut instances = self.instances.lock().await;
        instances.insert(id.to_string(), cloned);
        Ok(())
    }

    /// Acquire the per-instance lock, retrying with backoff per
    /// `StoreConfig::lock`. Returns `true` on success.
    pub async fn lock(&self, id: &str) -> bool {
        self.instance_locks.lock(id).await
    }

    /// Idempotent unlock; unknown ids return `true`.
    pub async fn unlock(&self, id: &str) -> bool {
        self.instance_locks.unlock(id).await
    }

    /// Convenience wrapper returning the typed retryable error the Handler
    /// surfaces to its caller.
    pub async fn lock_or_err(&self, id: &str) -> Result<(), StoreError> {
        if self.lock(id).await {
            Ok(())
        } else {
            Err(StoreError::LockAcquisition(id.to_string()))
        }
    }

    /// Remove state and lock bookkeeping for a completed instance. No-op if
    /// cleanup is disabled in configuration.
    pub async fn cleanup(&self, id: &str) {
        if !self.config.cleanup_enabled {
            return;
        }
        let mut instances = self.instances.lock().await;
        instances.remove(id);
        drop(instances);
        self.instance_locks.remove(id).await;
    }

    /// Wipe all state. Intended for test resets.
    pub async fn clear(&self) {
        self.instances.lock().await.clear();
        self.approvals.lock().await.clear();
        self.instance_locks.clear().await;
        self.approval_locks.clear().await;
    }

    /// Batch-read cached approval decisions for `names` under `scope`.
    pub async fn get_batched_approvals(
        &self,
        scope: &str,
        names: &[String],
    ) -> HashMap<String, ApprovalRecord> {
        let approvals = self.approvals.lock().await;
        names
            .iter()
            .filter_map(|name| {
                approvals
                    .get(&(scope.to_string(), name.clone()))
                    .map(|record| (name.clone(), record.clone()))
            })
            .collect()
    }

    /// Batch-write approval decisions for `scope`.
    pub async fn set_batched_approvals(&self, scope: &str, decisions: &HashMap<String, bool>) {
        let mut approvals = self.approvals.lock().await;
        for (name, value) in decisions {
            approvals.insert(
                (scope.to_string(), name.clone()),
                ApprovalRecord {
                    value: *value,
                    comment: None,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_store() -> StateStore {
        StateStore::new(StoreConfig {
            lock: LockConfig {
                ttl_secs: 120,
                max_retries: 1,
                initial_delay_ms: 1,
                backoff_exponent: 1.0,
            },
            cleanup_enabled: true,
        })
    }

    #[tokio::test]
    async fn read_of_unknown_instance_is_none() {
        let store = fast_store();
        assert!(store.read("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let store = fast_store();
        let mut instance = Instance::new("inst-1");
        instance.tool_interaction_count = 2;
        store.write("inst-1", &instance).await.unwrap();
        let read_back = store.read("inst-1").await.unwrap().unwrap();
        assert_eq!(read_back.tool_interaction_count, 2);
    }

    #[tokio::test]
    async fn mutating_a_read_snapshot_does_not_affect_the_store() {
        let store = fast_store();
        store.write("inst-1", &Instance::new("inst-1")).await.unwrap();
        let mut snapshot = store.read("inst-1").await.unwrap().unwrap();
        snapshot.tool_interaction_count = 99;
        let fresh = store.read("inst-1").await.unwrap().unwrap();
        assert_eq!(fresh.tool_interaction_count, 0);
    }

    #[tokio::test]
    async fn cleanup_removes_instance_and_lock() {
        let store = fast_store();
        store.write("inst-1", &Instance::new("inst-1")).await.unwrap();
        assert!(store.lock("inst-1").await);
        store.unlock("inst-1").await;
        store.cleanup("inst-1").await;
        assert!(store.read("inst-1").await.unwrap().is_none());
        assert!(store.lock("inst-1").await);
    }

    #[tokio::test]
    async fn cleanup_disabled_is_a_no_op() {
        let store = StateStore::new(StoreConfig {
            lock: LockConfig::default(),
            cleanup_enabled: false,
        });
        store.write("inst-1", &Instance::new("inst-1")).await.unwrap();
        store.cleanup("inst-1").await;
        assert!(store.read("inst-1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn approval_batch_round_trip() {
        let store = fast_store();
        let mut decisions = HashMap::new();
        decisions.insert("com_calculator_execute".to_string(), true);
        store.set_batched_approvals("agent.calculator", &decisions).await;
        let names = vec!["com_calculator_execute".to_string(), "other_tool".to_string()];
        let result = store.get_batched_approvals("agent.calculator", &names).await;
        assert_eq!(result.len(), 1);
        assert!(result["com_calculator_execute"].value);
    }

    #[tokio::test]
    async fn concurrent_lock_attempts_never_both_succeed() {
        let store = std::sync::Arc::new(fast_store());
        let a = {
            let store = store.clone();
            tokio::spawn(async move { store.lock("shared").await })
        };
        let b = {
            let store = store.clone();
            tokio::spawn(async move { store.lock("shared").await })
        };
        let (a, b) = (a.await.unwrap(), b.await.unwrap());
        assert!(a ^ b, "exactly one of the two concurrent attempts should succeed");
    }
}
