use gitty_command::GitError;
use gitty_config::ConfigError;
use gitty_parse::ParseError;
use gitty_pty::PtyError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error(transparent)]
    Git(#[from] GitError),
    #[error(transparent)]
    Pty(#[from] PtyError),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Parse(#[from] ParseError),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;
