use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("malformed {kind} output: {detail}")]
    Malformed { kind: &'static str, detail: String },
}

impl ParseError {
    pub fn malformed(kind: &'static str, detail: impl Into<String>) -> Self {
        Self::Malformed {
            kind,
            detail: detail.into(),
        }
    }
}

pub type ParseResult<T> = Result<T, ParseError>;
