use std::path::PathBuf;
use std::sync::Arc;

use gitty_command::{GitCommand, GitCommandConfig, ProcessCommandRunner};
use gitty_config::GittyConfig;
use gitty_pty::{NativeTerminalSpawner, TerminalSize, TerminalSpawner};
use gitty_sync::{OutputSink, SyncConfig, TracingSink};

use crate::error::RepositoryResult;

/// Everything a [`crate::Repository`] needs to reach git: the pipe-mode
/// command layer, the PTY spawner used for push and pull, and the sink that
/// receives terminal output.
pub struct GitContext<R: gitty_command::CommandRunner = ProcessCommandRunner> {
    pub(crate) command: Arc<GitCommand<R>>,
    pub(crate) spawner: Arc<dyn TerminalSpawner>,
    pub(crate) sync: SyncConfig,
    pub(crate) sink: Arc<dyn OutputSink>,
}

impl GitContext<ProcessCommandRunner> {
    pub fn from_config(config: &GittyConfig) -> RepositoryResult<Self> {
        let git = config.git_runtime();
        let sync = config.sync_runtime();
        let command = GitCommand::from_config(GitCommandConfig {
            binary: PathBuf::from(&git.binary),
            allow_unsafe_command_paths: git.allow_unsafe_command_paths,
        })?;

        Ok(Self::new(
            command,
            Arc::new(NativeTerminalSpawner),
            SyncConfig {
                git_binary: git.binary,
                size: TerminalSize {
                    cols: sync.cols,
                    rows: sync.rows,
                },
                environment: sync.environment,
                drain_grace: sync.drain_grace,
            },
        ))
    }
}

impl Default for GitContext<ProcessCommandRunner> {
    fn default() -> Self {
        Self::new(
            GitCommand::with_binary(ProcessCommandRunner, PathBuf::from("git"), false),
            Arc::new(NativeTerminalSpawner),
            SyncConfig::default(),
        )
    }
}

impl<R: gitty_command::CommandRunner> GitContext<R> {
    pub fn new(command: GitCommand<R>, spawner: Arc<dyn TerminalSpawner>, sync: SyncConfig) -> Self {
        Self {
            command: Arc::new(command),
            spawner,
            sync,
            sink: Arc::new(TracingSink),
        }
    }

    pub fn with_sink(mut self, sink: Arc<dyn OutputSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn command(&self) -> &GitCommand<R> {
        &self.command
    }

    pub fn sync_config(&self) -> &SyncConfig {
        &self.sync
    }
}
