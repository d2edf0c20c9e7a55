//! Environment-driven configuration: every key is looked up as
//! `{PROFILE}_{KEY}` first, falling back to plain `{KEY}`, where `PROFILE`
//! comes from `CONDUCTOR_PROFILE` (default `default`).

use std::env;

/// Load a `.env` file if present. Safe to call multiple times.
pub fn load_dotenv() {
    let _ = dotenvy::dotenv();
}

fn profile() -> String {
    env::var("CONDUCTOR_PROFILE").unwrap_or_else(|_| "default".to_string())
}

fn profiled_env(key: &str) -> Option<String> {
    let profile = profile().to_uppercase();
    let scoped = format!("{profile}_{key}");
    env::var(&scoped).ok().or_else(|| env::var(key).ok())
}

fn profiled_env_u32(key: &str, default: u32) -> u32 {
    profiled_env(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_u64(key: &str, default: u64) -> u64 {
    profiled_env(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn profiled_env_f64(key: &str, default: f64) -> f64 {
    profiled_env(key)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

/// Knobs for the Agent Execution Loop.
#[derive(Debug, Clone)]
pub struct RunnerConfig {
    /// Cap on tool-call iterations before the loop forces finalization.
    pub max_tool_interactions: u32,
    /// Hard iteration ceiling, independent of `max_tool_interactions`.
    pub max_iterations: u32,
}

impl RunnerConfig {
    pub fn from_env() -> Self {
        Self {
            max_tool_interactions: profiled_env_u32("RUNNER_MAX_TOOL_INTERACTIONS", 5),
            max_iterations: profiled_env_u32("RUNNER_MAX_ITERATIONS", 50),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            max_tool_interactions: 5,
            max_iterations: 50,
        }
    }
}

/// Knobs for the Concurrent State Store's lock protocol.
#[derive(Debug, Clone)]
pub struct LockConfig {
    pub ttl_secs: u64,
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub backoff_exponent: f64,
}

impl LockConfig {
    pub fn from_env() -> Self {
        Self {
            ttl_secs: profiled_env_u64("LOCK_TTL_SECS", 120),
            max_retries: profiled_env_u32("LOCK_MAX_RETRIES", 3),
            initial_delay_ms: profiled_env_u64("LOCK_INITIAL_DELAY_MS", 100),
            backoff_exponent: profiled_env_f64("LOCK_BACKOFF_EXPONENT", 1.5),
        }
    }
}

impl Default for LockConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 120,
            max_retries: 3,
            initial_delay_ms: 100,
            backoff_exponent: 1.5,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec_recommendations() {
        let runner = RunnerConfig::default();
        assert_eq!(runner.max_tool_interactions, 5);
        assert_eq!(runner.max_iterations, 50);

        let lock = LockConfig::default();
        assert_eq!(lock.ttl_secs, 120);
        assert_eq!(lock.max_retries, 3);
        assert_eq!(lock.initial_delay_ms, 100);
        assert!((lock.backoff_exponent - 1.5).abs() < f64::EPSILON);
    }
}
