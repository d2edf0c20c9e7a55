//! Self and delegator identity blocks threaded through the context builder.

#[derive(Debug, Clone)]
pub struct SelfIdentity {
    pub alias: String,
    pub source: String,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct DelegatorIdentity {
    pub alias: String,
    pub source: String,
}
