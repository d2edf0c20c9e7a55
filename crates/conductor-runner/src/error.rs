use thiserror::Error;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("exceeded iteration ceiling of {0}")]
    IterationCeiling(u32),

    #[error("llm adapter failure: {0}")]
    Llm(#[from] conductor_core::ConductorError),
}

impl From<RunnerError> for conductor_core::ConductorError {
    fn from(err: RunnerError) -> Self {
        match err {
            RunnerError::Config(msg) => conductor_core::ConductorError::Config(msg),
            RunnerError::IterationCeiling(n) => conductor_core::ConductorError::Runtime(format!(
                "exceeded iteration ceiling of {n}"
            )),
            RunnerError::Llm(e) => e,
        }
    }
}
