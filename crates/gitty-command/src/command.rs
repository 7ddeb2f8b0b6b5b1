use std::ffi::OsString;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use gitty_config::{ENV_ALLOW_UNSAFE_COMMAND_PATHS, ENV_GIT_BIN};

use crate::error::{GitError, GitResult};
use crate::runner::{CommandRunner, ProcessCommandRunner};

const PIPE_MODE_ENV: [(&str, &str); 1] = [("GIT_TERMINAL_PROMPT", "0")];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitCommandConfig {
    pub binary: PathBuf,
    pub allow_unsafe_command_paths: bool,
}

impl Default for GitCommandConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("git"),
            allow_unsafe_command_paths: false,
        }
    }
}

/// One pipe-mode invocation: `git -C <workdir> <operation> <flags..> <arguments..>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandRequest {
    pub workdir: PathBuf,
    pub operation: String,
    pub flags: Vec<String>,
    pub arguments: Vec<String>,
}

impl CommandRequest {
    pub fn new(workdir: impl Into<PathBuf>, operation: impl Into<String>) -> Self {
        Self {
            workdir: workdir.into(),
            operation: operation.into(),
            flags: Vec::new(),
            arguments: Vec::new(),
        }
    }

    pub fn flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.push(flag.into());
        self
    }

    pub fn flags<I, S>(mut self, flags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.flags.extend(flags.into_iter().map(Into::into));
        self
    }

    pub fn argument(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    pub fn arguments<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    pub fn to_args(&self) -> Vec<OsString> {
        let mut args = vec![
            OsString::from("-C"),
            self.workdir.as_os_str().to_owned(),
            OsString::from(&self.operation),
        ];
        args.extend(self.flags.iter().map(OsString::from));
        args.extend(self.arguments.iter().map(OsString::from));
        args
    }
}

/// Captured result of a finished command. A non-zero exit is not an `Err`;
/// inspect [`CommandOutput::exit_error`] or call [`CommandOutput::into_result`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
    command: String,
}

impl CommandOutput {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    pub fn command(&self) -> &str {
        &self.command
    }

    pub fn exit_error(&self) -> Option<GitError> {
        if self.success() {
            return None;
        }

        let stderr = self.stderr.trim();
        let stdout = self.stdout.trim();
        let detail = if !stderr.is_empty() {
            stderr.to_owned()
        } else if !stdout.is_empty() {
            stdout.to_owned()
        } else {
            match self.exit_code {
                Some(code) => format!("exit status {code}"),
                None => "terminated by signal".to_owned(),
            }
        };

        Some(GitError::CommandFailed {
            command: self.command.clone(),
            exit_code: self.exit_code,
            detail,
        })
    }

    pub fn into_result(self) -> GitResult<Self> {
        match self.exit_error() {
            Some(error) => Err(error),
            None => Ok(self),
        }
    }
}

pub struct GitCommand<R: CommandRunner = ProcessCommandRunner> {
    runner: R,
    binary: PathBuf,
    allow_unsafe_command_paths: bool,
}

impl GitCommand<ProcessCommandRunner> {
    pub fn from_config(config: GitCommandConfig) -> GitResult<Self> {
        Self::new(
            ProcessCommandRunner,
            config.binary,
            config.allow_unsafe_command_paths,
        )
    }
}

impl<R: CommandRunner> GitCommand<R> {
    pub fn new(runner: R, binary: PathBuf, allow_unsafe_command_paths: bool) -> GitResult<Self> {
        if binary.as_os_str().is_empty() {
            return Err(GitError::Configuration(format!(
                "{ENV_GIT_BIN} is set but empty. Provide a valid git binary path or unset it."
            )));
        }

        Ok(Self::with_binary(runner, binary, allow_unsafe_command_paths))
    }

    pub fn with_binary(runner: R, binary: PathBuf, allow_unsafe_command_paths: bool) -> Self {
        Self {
            runner,
            binary,
            allow_unsafe_command_paths,
        }
    }

    pub fn binary(&self) -> &Path {
        &self.binary
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    /// Resolved program name, after the binary path policy has been applied.
    pub fn program(&self) -> GitResult<&str> {
        validate_command_binary_path(&self.binary, self.allow_unsafe_command_paths)?;
        self.binary
            .to_str()
            .ok_or_else(|| GitError::Configuration("Invalid git binary path".to_owned()))
    }

    pub fn execute(&self, request: &CommandRequest) -> GitResult<CommandOutput> {
        let program = self.program()?;
        let args = request.to_args();
        let rendered = render_command(&self.binary, &args);
        tracing::debug!(command = %rendered, "running git command");

        let output = self
            .runner
            .run(program, &args, &PIPE_MODE_ENV)
            .map_err(|error| self.spawn_failed(error))?;

        let output = CommandOutput {
            exit_code: output.status.code(),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            command: rendered,
        };
        if !output.success() {
            tracing::debug!(
                command = %output.command,
                exit_code = ?output.exit_code,
                "git command exited unsuccessfully"
            );
        }
        Ok(output)
    }

    fn spawn_failed(&self, error: io::Error) -> GitError {
        match error.kind() {
            io::ErrorKind::NotFound => GitError::DependencyUnavailable(format!(
                "Git CLI `{}` was not found. Install Git or set {ENV_GIT_BIN} to a valid binary path.",
                self.binary.display()
            )),
            _ => GitError::DependencyUnavailable(format!(
                "Failed to execute Git CLI `{}`: {error}",
                self.binary.display()
            )),
        }
    }
}

impl<R: CommandRunner + 'static> GitCommand<R> {
    /// Runs [`GitCommand::execute`] on the blocking pool so the caller's task is not held.
    pub async fn execute_async(self: &Arc<Self>, request: CommandRequest) -> GitResult<CommandOutput> {
        let command = Arc::clone(self);
        tokio::task::spawn_blocking(move || command.execute(&request))
            .await
            .map_err(|error| GitError::Internal(format!("git command task failed: {error}")))?
    }
}

fn render_command(binary: &Path, args: &[OsString]) -> String {
    let rendered_args = args
        .iter()
        .map(|arg| arg.to_string_lossy().to_string())
        .collect::<Vec<_>>()
        .join(" ");
    format!("{} {rendered_args}", binary.display())
}

fn is_bare_command_name(path: &Path) -> bool {
    let mut components = path.components();
    matches!(components.next(), Some(Component::Normal(_))) && components.next().is_none()
}

fn validate_command_binary_path(binary: &Path, allow_unsafe_command_paths: bool) -> GitResult<()> {
    if allow_unsafe_command_paths || is_bare_command_name(binary) {
        return Ok(());
    }

    Err(GitError::Configuration(format!(
        "{ENV_GIT_BIN} resolves to '{}' which is treated as an unsafe command path by default. Use a bare command name or set {ENV_ALLOW_UNSAFE_COMMAND_PATHS}=true to allow explicit paths.",
        binary.display()
    )))
}
