use gitty_parse::{parse_sync_error, parse_sync_success, SyncError, SyncSuccess};

use crate::request::{Credentials, SyncOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    WriteUsername,
    WritePassword,
    RecordError(SyncError),
    RecordSuccess(SyncSuccess),
}

impl Action {
    /// Bytes to write back into the terminal, for prompt actions.
    pub fn response(&self, credentials: &Credentials) -> Option<Vec<u8>> {
        match self {
            Self::WriteUsername => Some(credential_line(&credentials.user)),
            Self::WritePassword => Some(credential_line(&credentials.pass)),
            Self::RecordError(_) | Self::RecordSuccess(_) => None,
        }
    }
}

fn credential_line(value: &str) -> Vec<u8> {
    let mut line = Vec::with_capacity(value.len() + 1);
    line.extend_from_slice(value.as_bytes());
    line.push(b'\r');
    line
}

/// Classifies one chunk of terminal output, first match wins:
/// `username`, then `password`, then `error`/`fatal`, else success.
///
/// Only the given chunk is inspected. A prompt split across two chunks is
/// not recognised.
pub fn classify(chunk: &str) -> Action {
    let lowered = chunk.to_lowercase();
    if lowered.contains("username") {
        Action::WriteUsername
    } else if lowered.contains("password") {
        Action::WritePassword
    } else if lowered.contains("error") || lowered.contains("fatal") {
        Action::RecordError(parse_sync_error(chunk))
    } else {
        Action::RecordSuccess(parse_sync_success(chunk))
    }
}

/// Last-write-wins record of what the session has reported so far.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncState {
    pub last_error: Option<SyncError>,
    pub last_success: Option<SyncSuccess>,
}

impl SyncState {
    /// Prompt actions leave the state untouched.
    pub fn record(&mut self, action: Action) {
        match action {
            Action::RecordError(error) => self.last_error = Some(error),
            Action::RecordSuccess(success) => self.last_success = Some(success),
            Action::WriteUsername | Action::WritePassword => {}
        }
    }

    pub fn into_outcome(self, exit: Option<gitty_pty::PtyExit>) -> SyncOutcome {
        SyncOutcome {
            error: self.last_error,
            success: self.last_success,
            exit,
        }
    }
}
