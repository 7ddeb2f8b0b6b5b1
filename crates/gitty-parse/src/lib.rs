//! Pure functions mapping the textual output of individual git commands to
//! structured records.
//!
//! Each parser is paired with the exact invocation it expects; the format
//! strings live next to the parser so the two cannot drift apart.

mod commit;
mod error;
mod log;
mod refs;
mod remote;
mod status;
mod sync;

pub use commit::{parse_commit, CommitSummary};
pub use error::{ParseError, ParseResult};
pub use log::{parse_log, LogEntry, LOG_FORMAT};
pub use refs::{parse_branches, parse_tags, BranchList};
pub use remote::{parse_remotes, Remote};
pub use status::{parse_status, FileChange, StatusEntry, StatusSummary};
pub use sync::{parse_sync_error, parse_sync_success, RefUpdate, SyncError, SyncSuccess};
