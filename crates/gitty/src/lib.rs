//! A thin handle over the `git` command-line tool.
//!
//! [`Repository`] methods shell out to git with fixed arguments and parse
//! the captured output. Push and pull run on a pseudo-terminal so git can
//! ask for credentials; see `gitty-sync`.

mod context;
mod error;
mod path;
mod repository;
#[cfg(test)]
mod test_support;

pub use context::GitContext;
pub use error::{RepositoryError, RepositoryResult};
pub use path::{is_repository_root, normalize_path};
pub use repository::{clone_repository, clone_repository_with, Repository};

pub use gitty_config::GittyConfig;
pub use gitty_parse::{
    BranchList, CommitSummary, FileChange, LogEntry, RefUpdate, Remote, StatusEntry,
    StatusSummary,
};
pub use gitty_sync::{
    Credentials, OutputSink, SyncError, SyncHandle, SyncOutcome, SyncSuccess, TracingSink,
};
