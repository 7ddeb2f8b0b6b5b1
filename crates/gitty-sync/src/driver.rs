use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use gitty_parse::SyncError;
use gitty_pty::{PtyError, PtyExit, PtyProcess, PtyResult, PtySpawnSpec, TerminalSize, TerminalSpawner};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use crate::classify::{classify, SyncState};
use crate::decode::ChunkDecoder;
use crate::request::{Credentials, SyncOutcome, SyncRequest};
use crate::sink::OutputSink;

const DEFAULT_DRAIN_GRACE: Duration = Duration::from_millis(100);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub git_binary: String,
    pub size: TerminalSize,
    pub environment: Vec<(String, String)>,
    /// How long to keep reading queued output after the exit notification.
    pub drain_grace: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            git_binary: "git".to_owned(),
            size: TerminalSize::default(),
            environment: Vec::new(),
            drain_grace: DEFAULT_DRAIN_GRACE,
        }
    }
}

impl SyncConfig {
    fn spawn_spec(&self, request: &SyncRequest) -> PtySpawnSpec {
        PtySpawnSpec {
            program: self.git_binary.clone(),
            args: request.args(),
            workdir: request.workdir.clone(),
            environment: self.environment.clone(),
            size: self.size,
        }
    }
}

/// A sync in flight. Completion is delivered once, through either
/// [`SyncHandle::wait`] or [`SyncHandle::on_complete`].
#[derive(Debug)]
pub struct SyncHandle {
    task: JoinHandle<SyncOutcome>,
}

impl SyncHandle {
    pub fn from_task(task: JoinHandle<SyncOutcome>) -> Self {
        Self { task }
    }

    pub async fn wait(self) -> SyncOutcome {
        match self.task.await {
            Ok(outcome) => outcome,
            Err(error) => {
                let message = format!("sync task failed: {error}");
                SyncOutcome {
                    error: Some(SyncError {
                        raw: message.clone(),
                        message,
                    }),
                    success: None,
                    exit: None,
                }
            }
        }
    }

    pub fn on_complete<F>(self, callback: F) -> JoinHandle<()>
    where
        F: FnOnce(SyncOutcome) + Send + 'static,
    {
        tokio::spawn(async move {
            let outcome = self.wait().await;
            callback(outcome);
        })
    }
}

/// Spawns `git <operation> <remote> <branch> <flags..>` on a PTY and starts
/// answering its prompts. Spawn failures are returned here; everything that
/// happens afterwards is reported through the returned handle.
pub async fn start_sync(
    spawner: Arc<dyn TerminalSpawner>,
    config: &SyncConfig,
    request: SyncRequest,
    sink: Arc<dyn OutputSink>,
) -> PtyResult<SyncHandle> {
    let spec = config.spawn_spec(&request);
    let process = tokio::task::spawn_blocking(move || spawner.spawn(spec))
        .await
        .map_err(|error| PtyError::Internal(format!("PTY spawn task failed: {error}")))??;

    tracing::info!(
        operation = %request.operation,
        remote = %request.remote,
        branch = %request.branch,
        workdir = %request.workdir.display(),
        "sync started"
    );

    let drain_grace = config.drain_grace;
    let workdir = request.workdir;
    let credentials = request.credentials;
    let task = tokio::spawn(async move {
        let outcome = drive(process, &credentials, sink.as_ref(), drain_grace).await;
        log_outcome(&workdir, &outcome);
        outcome
    });

    Ok(SyncHandle::from_task(task))
}

/// Runs the classification loop over an already spawned process until it exits.
pub async fn drive(
    mut process: PtyProcess,
    credentials: &Credentials,
    sink: &dyn OutputSink,
    drain_grace: Duration,
) -> SyncOutcome {
    let mut session = Session {
        credentials,
        sink,
        state: SyncState::default(),
        decoder: ChunkDecoder::default(),
    };

    let exit = loop {
        tokio::select! {
            biased;
            chunk = process.output.recv() => match chunk {
                Some(chunk) => session.handle_chunk(&chunk, &process.input),
                None => break (&mut process.exit).await.ok(),
            },
            exit = &mut process.exit => {
                while let Ok(Some(chunk)) = timeout(drain_grace, process.output.recv()).await {
                    session.handle_chunk(&chunk, &process.input);
                }
                break exit.ok();
            }
        }
    };

    if let Some(rest) = session.decoder.finish() {
        session.handle_text(&rest, &process.input);
    }
    session.state.into_outcome(exit)
}

struct Session<'a> {
    credentials: &'a Credentials,
    sink: &'a dyn OutputSink,
    state: SyncState,
    decoder: ChunkDecoder,
}

impl Session<'_> {
    fn handle_chunk(&mut self, chunk: &[u8], input: &mpsc::UnboundedSender<Vec<u8>>) {
        let text = self.decoder.decode(chunk);
        // A read holding only part of a character yields nothing yet.
        if !text.is_empty() {
            self.handle_text(&text, input);
        }
    }

    fn handle_text(&mut self, text: &str, input: &mpsc::UnboundedSender<Vec<u8>>) {
        self.sink.echo(text);

        let action = classify(text);
        match action.response(self.credentials) {
            Some(response) => {
                if input.send(response).is_err() {
                    tracing::warn!("terminal input closed before a credential prompt could be answered");
                }
            }
            None => self.state.record(action),
        }
    }
}

fn log_outcome(workdir: &Path, outcome: &SyncOutcome) {
    let exit_code = outcome.exit.map(|exit: PtyExit| exit.code);
    match &outcome.error {
        Some(error) => tracing::warn!(
            workdir = %workdir.display(),
            exit_code = ?exit_code,
            error = %error,
            "sync finished with error"
        ),
        None => tracing::info!(
            workdir = %workdir.display(),
            exit_code = ?exit_code,
            "sync finished"
        ),
    }
}
