use std::fmt;
use std::path::PathBuf;

use gitty_parse::{SyncError, SyncSuccess};
use gitty_pty::PtyExit;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncOperation {
    Push,
    Pull,
}

impl SyncOperation {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Push => "push",
            Self::Pull => "pull",
        }
    }
}

impl fmt::Display for SyncOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Username and password for a single sync. Never logged; `Debug` redacts the password.
#[derive(Clone, PartialEq, Eq, Deserialize)]
pub struct Credentials {
    pub user: String,
    pub pass: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, pass: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            pass: pass.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("pass", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRequest {
    pub workdir: PathBuf,
    pub operation: SyncOperation,
    pub remote: String,
    pub branch: String,
    pub flags: Vec<String>,
    pub credentials: Credentials,
}

impl SyncRequest {
    /// `<operation> <remote> <branch> <flags..>`; a blank remote or branch is
    /// left out so git falls back to the configured upstream.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec![self.operation.as_str().to_owned()];
        for positional in [&self.remote, &self.branch] {
            let positional = positional.trim();
            if !positional.is_empty() {
                args.push(positional.to_owned());
            }
        }
        args.extend(self.flags.iter().cloned());
        args
    }
}

/// What a finished sync reports: the last recorded error and the last
/// recorded success. Both, either or neither may be set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncOutcome {
    pub error: Option<SyncError>,
    pub success: Option<SyncSuccess>,
    /// `None` when the exit status could not be observed.
    pub exit: Option<PtyExit>,
}

impl SyncOutcome {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
