//! Command layer: builds a `git` argument vector, runs it over anonymous
//! pipes and hands back the captured output.
//!
//! Nothing here is interactive. Commands that may prompt for credentials
//! go through `gitty-sync`, which attaches the subprocess to a PTY.

mod command;
mod error;
mod runner;

pub use command::{CommandOutput, CommandRequest, GitCommand, GitCommandConfig};
pub use error::{GitError, GitResult};
pub use runner::{CommandRunner, ProcessCommandRunner};
