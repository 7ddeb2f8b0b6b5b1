use tokio::sync::{mpsc, oneshot};

use crate::{PtyExit, PtyProcess};

/// The far side of an in-memory [`PtyProcess`]: whatever is emitted here
/// arrives as terminal output, and whatever the consumer writes can be read
/// back. Used to exercise terminal-driven logic without a real subprocess.
pub struct LoopbackTerminal {
    output: Option<mpsc::UnboundedSender<Vec<u8>>>,
    input: mpsc::UnboundedReceiver<Vec<u8>>,
    exit: Option<oneshot::Sender<PtyExit>>,
}

pub fn loopback() -> (PtyProcess, LoopbackTerminal) {
    let (output_tx, output_rx) = mpsc::unbounded_channel();
    let (input_tx, input_rx) = mpsc::unbounded_channel();
    let (exit_tx, exit_rx) = oneshot::channel();

    (
        PtyProcess {
            output: output_rx,
            input: input_tx,
            exit: exit_rx,
        },
        LoopbackTerminal {
            output: Some(output_tx),
            input: input_rx,
            exit: Some(exit_tx),
        },
    )
}

impl LoopbackTerminal {
    /// Returns `false` once the consumer has gone away or output was closed.
    pub fn emit(&self, chunk: impl AsRef<[u8]>) -> bool {
        self.output
            .as_ref()
            .is_some_and(|output| output.send(chunk.as_ref().to_vec()).is_ok())
    }

    pub async fn next_input(&mut self) -> Option<Vec<u8>> {
        self.input.recv().await
    }

    pub fn try_next_input(&mut self) -> Option<Vec<u8>> {
        self.input.try_recv().ok()
    }

    /// Reports process exit while leaving the output stream open, as happens
    /// when a grandchild still holds the terminal.
    pub fn signal_exit(&mut self, code: u32) {
        if let Some(exit) = self.exit.take() {
            let _ = exit.send(PtyExit {
                code,
                success: code == 0,
            });
        }
    }

    pub fn close_output(&mut self) {
        self.output = None;
    }

    /// Closes output and reports exit.
    pub fn finish(&mut self, code: u32) {
        self.close_output();
        self.signal_exit(code);
    }
}
