//! The Handler's error surface. `Retry` is the one variant the broker is
//! expected to act on, retrying after backoff; everything else composes
//! into `ConductorError`.

use thiserror::Error;

use conductor_core::ConductorError;
use conductor_store::StoreError;

#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("lock acquisition failed for instance '{0}'")]
    Retry(String),

    #[error(transparent)]
    Core(#[from] ConductorError),

    #[error(transparent)]
    Broker(#[from] conductor_broker::BrokerError),
}

impl From<StoreError> for HandlerError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::LockAcquisition(id) => HandlerError::Retry(id),
            other => HandlerError::Core(other.into()),
        }
    }
}

impl HandlerError {
    /// Whether the broker should retry this invocation after backoff,
    /// rather than treat it as a terminal failure.
    pub fn is_retryable(&self) -> bool {
        matches!(self, HandlerError::Retry(_))
    }
}
