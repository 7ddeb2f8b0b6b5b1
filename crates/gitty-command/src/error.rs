use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GitError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("dependency unavailable: {0}")]
    DependencyUnavailable(String),
    #[error("git command failed (`{command}`): {detail}")]
    CommandFailed {
        command: String,
        exit_code: Option<i32>,
        detail: String,
    },
    #[error("internal error: {0}")]
    Internal(String),
}

pub type GitResult<T> = Result<T, GitError>;
