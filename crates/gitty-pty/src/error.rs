use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PtyError {
    #[error("pty configuration error: {0}")]
    Configuration(String),
    #[error("pty process error: {0}")]
    Process(String),
    #[error("pty internal error: {0}")]
    Internal(String),
}

pub type PtyResult<T> = Result<T, PtyError>;

pub(crate) fn process_error(error: impl std::fmt::Display) -> PtyError {
    PtyError::Process(error.to_string())
}
