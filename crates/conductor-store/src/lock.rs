//! Per-id TTL lock protocol: lazily-created entries, expiry evaluated only
//! on acquisition attempts (no background timers), exponential backoff
//! retry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tokio::time::sleep;

use conductor_core::LockConfig;

#[derive(Debug, Clone)]
struct LockEntry {
    held: bool,
    acquired_at: Instant,
    ttl: Duration,
}

impl LockEntry {
    fn is_stale(&self, now: Instant) -> bool {
        now.duration_since(self.acquired_at) > self.ttl
    }

    /// `held ∧ ¬stale`
    fn is_locked(&self, now: Instant) -> bool {
        self.held && !self.is_stale(now)
    }
}

/// Map of per-instance lock entries, guarded by a single mutex — a sharded
/// lock table isn't warranted at this scale of concurrency.
pub struct LockTable {
    entries: Mutex<HashMap<String, LockEntry>>,
    config: LockConfig,
}

impl LockTable {
    pub fn new(config: LockConfig) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            config,
        }
    }

    async fn try_acquire_once(&self, id: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.lock().await;
        let entry = entries.entry(id.to_string()).or_insert(LockEntry {
            held: false,
            acquired_at: now,
            ttl: Duration::from_secs(self.config.ttl_secs),
        });
        if !entry.held || entry.is_stale(now) {
            entry.held = true;
            entry.acquired_at = now;
            entry.ttl = Duration::from_secs(self.config.ttl_secs);
            true
        } else {
            false
        }
    }

    /// Attempt to acquire the lock for `id`, retrying with exponential
    /// backoff up to `lock_max_retries` additional attempts after the
    /// initial try. Returns `true` on first success, `false` once retries
    /// are exhausted.
    pub async fn lock(&self, id: &str) -> bool {
        if self.try_acquire_once(id).await {
            return true;
        }
        let mut delay_ms = self.config.initial_delay_ms as f64;
        for _ in 0..self.config.max_retries {
            sleep(Duration::from_millis(delay_ms as u64)).await;
            if self.try_acquire_once(id).await {
                return true;
            }
            delay_ms *= self.config.backoff_exponent;
        }
        false
    }

    /// Idempotent: releasing an unknown id is not an error.
    pub async fn unlock(&self, id: &str) -> bool {
        let mut entries = self.entries.lock().await;
        if let Some(entry) = entries.get_mut(id) {
            entry.held = false;
        }
        true
    }

    pub async fn is_locked(&self, id: &str) -> bool {
        let now = Instant::now();
        let entries = self.entries.lock().await;
        entries.get(id).map(|e| e.is_locked(now)).unwrap_or(false)
    }

    pub async fn remove(&self, id: &str) {
        let mut entries = self.entries.lock().await;
        entries.remove(id);
    }

    pub async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast_config() -> LockConfig {
        LockConfig {
            ttl_secs: 0,
            max_retries: 2,
            initial_delay_ms: 1,
            backoff_exponent: 1.0,
        }
    }

    #[tokio::test]
    async fn second_lock_fails_while_first_still_held() {
        let config = LockConfig {
            ttl_secs: 120,
            ..fast_config()
        };
        let table = LockTable::new(config);
        assert!(table.lock("X").await);
        assert!(!table.lock("X").await);
        assert!(table.is_locked("X").await);
    }

    #[tokio::test]
    async fn unlock_then_lock_succeeds() {
        let table = LockTable::new(LockConfig {
            ttl_secs: 120,
            ..fast_config()
        });
        assert!(table.lock("X").await);
        assert!(table.unlock("X").await);
        assert!(table.lock("X").await);
    }

    #[tokio::test]
    async fn unlock_on_unknown_id_is_a_no_op_success() {
        let table = LockTable::new(fast_config());
        assert!(table.unlock("never-locked").await);
    }

    #[tokio::test]
    async fn stale_lock_is_recovered_after_ttl_elapses() {
        let table = LockTable::new(LockConfig {
            ttl_secs: 0,
            max_retries: 0,
            initial_delay_ms: 1,
            backoff_exponent: 1.0,
        });
        assert!(table.lock("X").await);
        tokio::time::sleep(Duration::from_millis(5)).await;
        assert!(table.lock("X").await);
        assert!(table.is_locked("X").await);
    }
}
