//! The approval cache contract: batched reads/writes of cached approval
//! decisions, keyed by an instance-scoped identity and tool name.

use std::collections::HashMap;

use async_trait::async_trait;

use conductor_core::ApprovalRecord;

#[async_trait]
pub trait ApprovalCache: Send + Sync {
    async fn get_batched(&self, scope: &str, names: &[String]) -> HashMap<String, ApprovalRecord>;
    async fn set_batched(&self, scope: &str, decisions: &HashMap<String, bool>);
}
