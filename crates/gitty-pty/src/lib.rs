//! Pseudo-terminal process spawning.
//!
//! A [`PtyProcess`] is three channels: raw output chunks exactly as each
//! read returned them, an input sink, and a one-shot exit notification.
//! The native implementation drives blocking PTY I/O on dedicated threads.

mod error;
mod loopback;
mod spawner;

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, oneshot};

pub use error::{PtyError, PtyResult};
pub use loopback::{loopback, LoopbackTerminal};
pub use spawner::NativeTerminalSpawner;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalSize {
    pub cols: u16,
    pub rows: u16,
}

impl Default for TerminalSize {
    fn default() -> Self {
        Self { cols: 80, rows: 24 }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PtySpawnSpec {
    pub program: String,
    pub args: Vec<String>,
    pub workdir: PathBuf,
    pub environment: Vec<(String, String)>,
    pub size: TerminalSize,
}

impl PtySpawnSpec {
    pub fn validate(&self) -> PtyResult<()> {
        if self.program.trim().is_empty() {
            return Err(PtyError::Configuration(
                "PTY spawn program must not be empty".to_owned(),
            ));
        }
        if self.size.cols == 0 || self.size.rows == 0 {
            return Err(PtyError::Configuration(
                "PTY size must have non-zero rows and columns".to_owned(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtyExit {
    pub code: u32,
    pub success: bool,
}

/// Handles to a running PTY subprocess.
///
/// `output` closes once the terminal reports end of stream. `exit` resolves
/// once the child has been reaped; if the waiter thread is lost it resolves
/// with a receive error instead.
pub struct PtyProcess {
    pub output: mpsc::UnboundedReceiver<Vec<u8>>,
    pub input: mpsc::UnboundedSender<Vec<u8>>,
    pub exit: oneshot::Receiver<PtyExit>,
}

pub trait TerminalSpawner: Send + Sync {
    fn spawn(&self, spec: PtySpawnSpec) -> PtyResult<PtyProcess>;
}
