use std::path::{Path, PathBuf};
use std::sync::Arc;

use gitty_command::{CommandOutput, CommandRequest, CommandRunner, ProcessCommandRunner};
use gitty_parse::{
    parse_branches, parse_commit, parse_log, parse_remotes, parse_status, parse_tags, BranchList,
    CommitSummary, LogEntry, ParseError, Remote, StatusSummary, LOG_FORMAT,
};
use gitty_sync::{start_sync, Credentials, SyncConfig, SyncHandle, SyncOperation, SyncRequest};

use crate::context::GitContext;
use crate::error::{RepositoryError, RepositoryResult};
use crate::path::{is_repository_root, normalize_path, repository_name};

const EMPTY_HISTORY_MARKER: &str = "does not have any commits";

/// Handle to one working directory. Cheap to clone; clones share the
/// [`GitContext`].
///
/// `is_repository` is computed when the handle is created and only changes
/// through [`Repository::refresh_validity`].
pub struct Repository<R: CommandRunner = ProcessCommandRunner> {
    path: PathBuf,
    name: String,
    is_repository: bool,
    context: Arc<GitContext<R>>,
}

impl<R: CommandRunner> Clone for Repository<R> {
    fn clone(&self) -> Self {
        Self {
            path: self.path.clone(),
            name: self.name.clone(),
            is_repository: self.is_repository,
            context: Arc::clone(&self.context),
        }
    }
}

impl<R: CommandRunner> std::fmt::Debug for Repository<R> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Repository")
            .field("path", &self.path)
            .field("name", &self.name)
            .field("is_repository", &self.is_repository)
            .finish()
    }
}

impl Repository<ProcessCommandRunner> {
    /// Opens `path` with the default context: `git` from `PATH`, native PTY,
    /// terminal output logged through `tracing`.
    pub fn open(path: impl AsRef<Path>) -> Self {
        Self::open_with(Arc::new(GitContext::default()), path)
    }
}

/// Clones `url` into `dest` with the default context.
pub async fn clone_repository(url: &str, dest: impl AsRef<Path>) -> RepositoryResult<Repository> {
    clone_repository_with(Arc::new(GitContext::default()), url, dest).await
}

/// Runs `git clone <url> <dest>` from the parent of `dest` and opens the result.
pub async fn clone_repository_with<R: CommandRunner + 'static>(
    context: Arc<GitContext<R>>,
    url: &str,
    dest: impl AsRef<Path>,
) -> RepositoryResult<Repository<R>> {
    let url = require_value("clone url", url)?;
    let dest = normalize_path(dest.as_ref());
    let parent = dest
        .parent()
        .map(Path::to_path_buf)
        .ok_or_else(|| {
            RepositoryError::Configuration(format!(
                "Clone destination '{}' has no parent directory.",
                dest.display()
            ))
        })?;
    ensure_directory(&parent)?;

    let request = CommandRequest::new(&parent, "clone")
        .argument(url)
        .argument(dest.to_string_lossy());
    context.command.execute_async(request).await?.into_result()?;
    tracing::info!(dest = %dest.display(), "repository cloned");

    Ok(Repository::open_with(context, dest))
}

impl<R: CommandRunner + 'static> Repository<R> {
    pub fn open_with(context: Arc<GitContext<R>>, path: impl AsRef<Path>) -> Self {
        let path = normalize_path(path.as_ref());
        let name = repository_name(&path);
        let is_repository = is_repository_root(&path);
        Self {
            path,
            name,
            is_repository,
            context,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_repository(&self) -> bool {
        self.is_repository
    }

    pub fn context(&self) -> &GitContext<R> {
        &self.context
    }

    /// Re-checks the `.git` marker and returns the new flag.
    pub fn refresh_validity(&mut self) -> bool {
        self.is_repository = is_repository_root(&self.path);
        self.is_repository
    }

    /// `git init <flags..>`, creating the directory first if needed.
    /// Does not refresh [`Repository::is_repository`].
    pub async fn init<I, S>(&self, flags: I) -> RepositoryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        ensure_directory(&self.path)?;
        self.run_checked(self.request("init").flags(flags)).await?;
        Ok(())
    }

    /// Commit history of the current branch, newest first. A branch without
    /// commits yields an empty list.
    pub async fn log(&self) -> RepositoryResult<Vec<LogEntry>> {
        let request = self
            .request("log")
            .flag(format!("--pretty=format:{LOG_FORMAT}"));
        let output = self.run(request).await?;
        if !output.success() && output.stderr.contains(EMPTY_HISTORY_MARKER) {
            return Ok(Vec::new());
        }
        let output = output.into_result()?;
        Ok(parse_log(&output.stdout)?)
    }

    pub async fn status(&self) -> RepositoryResult<StatusSummary> {
        let output = self
            .run_checked(self.request("status").flag("--porcelain"))
            .await?;
        Ok(parse_status(&output.stdout)?)
    }

    pub async fn add<I, S>(&self, paths: I) -> RepositoryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths = require_paths(paths)?;
        self.run_checked(self.request("add").argument("--").arguments(paths))
            .await?;
        Ok(())
    }

    /// Removes paths from the index, keeping them on disk.
    pub async fn remove<I, S>(&self, paths: I) -> RepositoryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths = require_paths(paths)?;
        let request = self
            .request("rm")
            .flags(["--cached", "-r"])
            .argument("--")
            .arguments(paths);
        self.run_checked(request).await?;
        Ok(())
    }

    pub async fn unstage<I, S>(&self, paths: I) -> RepositoryResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let paths = require_paths(paths)?;
        let request = self
            .request("reset")
            .argument("HEAD")
            .argument("--")
            .arguments(paths);
        self.run_checked(request).await?;
        Ok(())
    }

    pub async fn commit(&self, message: &str) -> RepositoryResult<CommitSummary> {
        if message.trim().is_empty() {
            return Err(RepositoryError::Configuration(
                "Commit message must be a non-empty string.".to_owned(),
            ));
        }

        let output = self
            .run_checked(self.request("commit").flag("-m").argument(message))
            .await?;
        parse_commit(&output.stdout)
            .ok_or_else(|| ParseError::malformed("commit", output.stdout.trim()).into())
    }

    pub async fn branches(&self) -> RepositoryResult<BranchList> {
        let output = self
            .run_checked(self.request("branch").flag("--list"))
            .await?;
        Ok(parse_branches(&output.stdout))
    }

    pub async fn create_branch(&self, name: &str) -> RepositoryResult<()> {
        let name = require_value("branch name", name)?;
        self.run_checked(self.request("branch").argument(name)).await?;
        Ok(())
    }

    pub async fn checkout(&self, name: &str) -> RepositoryResult<()> {
        let name = require_value("branch name", name)?;
        self.run_checked(self.request("checkout").argument(name)).await?;
        Ok(())
    }

    /// Safe delete (`-d`); git refuses unmerged branches.
    pub async fn delete_branch(&self, name: &str) -> RepositoryResult<()> {
        let name = require_value("branch name", name)?;
        self.run_checked(self.request("branch").flag("-d").argument(name))
            .await?;
        Ok(())
    }

    pub async fn merge(&self, name: &str) -> RepositoryResult<()> {
        let name = require_value("branch name", name)?;
        self.run_checked(self.request("merge").argument(name)).await?;
        Ok(())
    }

    pub async fn tags(&self) -> RepositoryResult<Vec<String>> {
        let output = self.run_checked(self.request("tag").flag("--list")).await?;
        Ok(parse_tags(&output.stdout))
    }

    pub async fn create_tag(&self, name: &str) -> RepositoryResult<()> {
        let name = require_value("tag name", name)?;
        self.run_checked(self.request("tag").argument(name)).await?;
        Ok(())
    }

    pub async fn remotes(&self) -> RepositoryResult<Vec<Remote>> {
        let output = self.run_checked(self.request("remote").flag("-v")).await?;
        Ok(parse_remotes(&output.stdout))
    }

    pub async fn add_remote(&self, name: &str, url: &str) -> RepositoryResult<()> {
        let name = require_value("remote name", name)?;
        let url = require_value("remote url", url)?;
        let request = self.request("remote").arguments(["add", name, url]);
        self.run_checked(request).await?;
        Ok(())
    }

    pub async fn set_remote_url(&self, name: &str, url: &str) -> RepositoryResult<()> {
        let name = require_value("remote name", name)?;
        let url = require_value("remote url", url)?;
        let request = self.request("remote").arguments(["set-url", name, url]);
        self.run_checked(request).await?;
        Ok(())
    }

    pub async fn remove_remote(&self, name: &str) -> RepositoryResult<()> {
        let name = require_value("remote name", name)?;
        let request = self.request("remote").arguments(["remove", name]);
        self.run_checked(request).await?;
        Ok(())
    }

    /// Mixed reset of the current branch to `target`.
    pub async fn reset(&self, target: &str) -> RepositoryResult<()> {
        let target = require_value("reset target", target)?;
        self.run_checked(self.request("reset").flag("-q").argument(target))
            .await?;
        Ok(())
    }

    /// Does not refresh [`Repository::is_repository`].
    pub async fn cherry_pick(&self, commit: &str) -> RepositoryResult<()> {
        let commit = require_value("commit", commit)?;
        self.run_checked(self.request("cherry-pick").argument(commit))
            .await?;
        Ok(())
    }

    /// Starts `git push` on a terminal, answering credential prompts with
    /// `credentials`. A blank `remote` or `branch` is left to git's upstream
    /// configuration.
    pub async fn push(
        &self,
        remote: &str,
        branch: &str,
        flags: Vec<String>,
        credentials: Credentials,
    ) -> RepositoryResult<SyncHandle> {
        self.sync(SyncOperation::Push, remote, branch, flags, credentials)
            .await
    }

    pub async fn pull(
        &self,
        remote: &str,
        branch: &str,
        flags: Vec<String>,
        credentials: Credentials,
    ) -> RepositoryResult<SyncHandle> {
        self.sync(SyncOperation::Pull, remote, branch, flags, credentials)
            .await
    }

    async fn sync(
        &self,
        operation: SyncOperation,
        remote: &str,
        branch: &str,
        flags: Vec<String>,
        credentials: Credentials,
    ) -> RepositoryResult<SyncHandle> {
        let config = SyncConfig {
            git_binary: self.context.command.program()?.to_owned(),
            ..self.context.sync.clone()
        };
        let request = SyncRequest {
            workdir: self.path.clone(),
            operation,
            remote: remote.to_owned(),
            branch: branch.to_owned(),
            flags,
            credentials,
        };

        let handle = start_sync(
            Arc::clone(&self.context.spawner),
            &config,
            request,
            Arc::clone(&self.context.sink),
        )
        .await?;
        Ok(handle)
    }

    fn request(&self, operation: &str) -> CommandRequest {
        CommandRequest::new(&self.path, operation)
    }

    async fn run(&self, request: CommandRequest) -> RepositoryResult<CommandOutput> {
        Ok(self.context.command.execute_async(request).await?)
    }

    async fn run_checked(&self, request: CommandRequest) -> RepositoryResult<CommandOutput> {
        Ok(self.run(request).await?.into_result()?)
    }
}

fn require_value<'a>(kind: &str, value: &'a str) -> RepositoryResult<&'a str> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(RepositoryError::Configuration(format!(
            "The {kind} must be a non-empty string."
        )));
    }
    Ok(trimmed)
}

fn require_paths<I, S>(paths: I) -> RepositoryResult<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let paths = paths.into_iter().map(Into::into).collect::<Vec<String>>();
    if paths.is_empty() {
        return Err(RepositoryError::Configuration(
            "At least one path is required.".to_owned(),
        ));
    }
    if paths.iter().any(|path| path.trim().is_empty()) {
        return Err(RepositoryError::Configuration(
            "Paths must be non-empty strings.".to_owned(),
        ));
    }
    Ok(paths)
}

fn ensure_directory(path: &Path) -> RepositoryResult<()> {
    std::fs::create_dir_all(path).map_err(|error| {
        RepositoryError::Configuration(format!(
            "Failed to create directory '{}': {error}",
            path.display()
        ))
    })
}
