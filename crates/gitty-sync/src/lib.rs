//! Push and pull driven through a pseudo-terminal.
//!
//! git only asks for credentials when it believes it is talking to a real
//! terminal, so the subprocess is attached to a PTY. Each output chunk is
//! classified on its own (see [`classify`]): prompts are answered from the
//! supplied [`Credentials`], everything else is recorded as the latest error
//! or the latest success. When the process exits the caller receives one
//! [`SyncOutcome`] holding whatever was recorded last.
//!
//! There is no timeout and no loop detection. Wrong credentials make git
//! prompt again and the same credentials are sent again.

mod classify;
mod decode;
mod driver;
mod request;
mod sink;

pub use classify::{classify, Action, SyncState};
pub use driver::{drive, start_sync, SyncConfig, SyncHandle};
pub use gitty_parse::{SyncError, SyncSuccess};
pub use request::{Credentials, SyncOperation, SyncOutcome, SyncRequest};
pub use sink::{OutputSink, TracingSink, TERMINAL_TARGET};
