use thiserror::Error;

#[derive(Debug, Error)]
pub enum BrokerError {
    #[error("subscriber channel closed")]
    Closed,

    #[error("recv called before subscribe")]
    NotSubscribed,

    #[error("publish failed: destination channel closed")]
    SendFailed,
}

impl From<BrokerError> for conductor_core::ConductorError {
    fn from(err: BrokerError) -> Self {
        conductor_core::ConductorError::Runtime(err.to_string())
    }
}
