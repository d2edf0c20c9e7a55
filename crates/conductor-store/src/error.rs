use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to acquire lock for '{0}' after exhausting retries")]
    LockAcquisition(String),

    #[error("serialization failure: {0}")]
    Serde(String),
}

impl From<StoreError> for conductor_core::ConductorError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockAcquisition(id) => conductor_core::ConductorError::LockAcquisition(id),
            StoreError::Serde(msg) => conductor_core::ConductorError::Runtime(msg),
        }
    }
}
