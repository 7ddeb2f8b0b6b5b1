pub const TERMINAL_TARGET: &str = "gitty::sync::terminal";

/// Receives every terminal chunk exactly as the subprocess produced it.
pub trait OutputSink: Send + Sync {
    fn echo(&self, chunk: &str);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl OutputSink for TracingSink {
    fn echo(&self, chunk: &str) {
        tracing::info!(target: TERMINAL_TARGET, chunk = %chunk, "terminal output");
    }
}
