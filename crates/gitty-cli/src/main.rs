use anyhow::Result;
use gitty::{
    Credentials, GitContext, GittyConfig, OutputSink, Repository, RepositoryError, SyncOutcome,
};
use gitty_config::ConfigError;
use serde::Serialize;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

const ENV_USERNAME: &str = "GITTY_USERNAME";
const ENV_PASSWORD: &str = "GITTY_PASSWORD";

#[tokio::main]
async fn main() -> Result<()> {
    let Some((invocation, config)) =
        prepare_invocation(std::env::args().skip(1), gitty_config::load_from_env)?
    else {
        print_cli_help();
        return Ok(());
    };
    init_logging(&config);

    let context = GitContext::from_config(&config)?.with_sink(Arc::new(StderrSink));
    let repository = Repository::open_with(Arc::new(context), &invocation.repo);
    tracing::debug!(
        path = %repository.path().display(),
        is_repository = repository.is_repository(),
        "opened repository"
    );

    match invocation.command {
        CliCommand::Status => print_json(&repository.status().await?)?,
        CliCommand::Log => print_json(&repository.log().await?)?,
        CliCommand::Branches => print_json(&repository.branches().await?)?,
        CliCommand::Tags => print_json(&repository.tags().await?)?,
        CliCommand::Remotes => print_json(&repository.remotes().await?)?,
        CliCommand::Push { remote, branch } => {
            let handle = repository
                .push(&remote, &branch, Vec::new(), credentials_from_env()?)
                .await?;
            finish_sync(handle.wait().await)?;
        }
        CliCommand::Pull { remote, branch } => {
            let handle = repository
                .pull(&remote, &branch, Vec::new(), credentials_from_env()?)
                .await?;
            finish_sync(handle.wait().await)?;
        }
    }

    Ok(())
}

/// Parses the arguments and only then loads config, so a help request never
/// touches the config file. `Ok(None)` means help should be printed.
fn prepare_invocation<I, L>(args: I, load_config: L) -> Result<Option<(CliInvocation, GittyConfig)>>
where
    I: IntoIterator<Item = String>,
    L: FnOnce() -> Result<GittyConfig, ConfigError>,
{
    let Some(invocation) = parse_cli_args(args)? else {
        return Ok(None);
    };
    Ok(Some((invocation, load_config()?)))
}

fn init_logging(config: &GittyConfig) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.filter.as_str().into());
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Terminal output of push/pull goes straight to stderr so stdout stays JSON.
struct StderrSink;

impl OutputSink for StderrSink {
    fn echo(&self, chunk: &str) {
        let mut stderr = std::io::stderr().lock();
        let _ = stderr.write_all(chunk.as_bytes());
        let _ = stderr.flush();
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn finish_sync(outcome: SyncOutcome) -> Result<()> {
    print_json(&outcome)?;
    match outcome.error {
        Some(error) => Err(anyhow::anyhow!("{error}")),
        None => Ok(()),
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CliCommand {
    Status,
    Log,
    Branches,
    Tags,
    Remotes,
    Push { remote: String, branch: String },
    Pull { remote: String, branch: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct CliInvocation {
    repo: PathBuf,
    command: CliCommand,
}

/// `Ok(None)` means help was requested.
fn parse_cli_args<I>(args: I) -> Result<Option<CliInvocation>, RepositoryError>
where
    I: IntoIterator<Item = String>,
{
    let mut repo = PathBuf::from(".");
    let mut positionals = Vec::new();
    let mut args = args.into_iter();

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--repo" | "-C" => {
                let value = args.next().ok_or_else(|| {
                    RepositoryError::Configuration(
                        "Missing value after --repo. Use --repo <path>.".to_owned(),
                    )
                })?;
                repo = PathBuf::from(read_cli_value(&arg, value)?);
            }
            "--help" | "-h" => return Ok(None),
            value if value.starts_with("--") => {
                return Err(RepositoryError::Configuration(format!(
                    "Unknown flag '{value}'. Run with --help for valid flags."
                )));
            }
            _ => positionals.push(arg),
        }
    }

    let mut positionals = positionals.into_iter();
    let Some(name) = positionals.next() else {
        return Ok(None);
    };
    let rest = positionals.collect::<Vec<_>>();

    let command = match (name.as_str(), rest.as_slice()) {
        ("status", []) => CliCommand::Status,
        ("log", []) => CliCommand::Log,
        ("branches", []) => CliCommand::Branches,
        ("tags", []) => CliCommand::Tags,
        ("remotes", []) => CliCommand::Remotes,
        ("push", sync_args) => {
            let (remote, branch) = sync_target(&name, sync_args)?;
            CliCommand::Push { remote, branch }
        }
        ("pull", sync_args) => {
            let (remote, branch) = sync_target(&name, sync_args)?;
            CliCommand::Pull { remote, branch }
        }
        ("status" | "log" | "branches" | "tags" | "remotes", extra) => {
            return Err(RepositoryError::Configuration(format!(
                "'{name}' takes no arguments, got {}.",
                extra.join(" ")
            )));
        }
        (unknown, _) => {
            return Err(RepositoryError::Configuration(format!(
                "Unknown command '{unknown}'. Run with --help for valid commands."
            )));
        }
    };

    Ok(Some(CliInvocation { repo, command }))
}

/// Missing positionals are passed on blank so git uses the upstream.
fn sync_target(command: &str, args: &[String]) -> Result<(String, String), RepositoryError> {
    match args {
        [] => Ok((String::new(), String::new())),
        [remote] => Ok((remote.clone(), String::new())),
        [remote, branch] => Ok((remote.clone(), branch.clone())),
        _ => Err(RepositoryError::Configuration(format!(
            "Usage: gitty {command} [<remote> [<branch>]]"
        ))),
    }
}

fn read_cli_value(flag: &str, value: String) -> Result<String, RepositoryError> {
    let value = value.trim().to_owned();
    if value.is_empty() {
        return Err(RepositoryError::Configuration(format!(
            "Flag '{flag}' requires a non-empty value."
        )));
    }
    Ok(value)
}

fn credentials_from_env() -> Result<Credentials, RepositoryError> {
    Ok(Credentials::new(
        required_env(ENV_USERNAME)?,
        required_env(ENV_PASSWORD)?,
    ))
}

fn required_env(name: &str) -> Result<String, RepositoryError> {
    let value = std::env::var(name).map_err(|_| {
        RepositoryError::Configuration(format!(
            "{name} is not set. Export it before running push or pull."
        ))
    })?;
    if value.is_empty() {
        return Err(RepositoryError::Configuration(format!(
            "{name} is empty. Provide a non-empty value."
        )));
    }
    Ok(value)
}

fn print_cli_help() {
    println!("Usage: gitty [--repo <path>] <command> [args]");
    println!();
    println!("  status                     Working tree status");
    println!("  log                        Commit history of the current branch");
    println!("  branches                   Local branches");
    println!("  tags                       Tags");
    println!("  remotes                    Remotes with fetch and push URLs");
    println!("  push [<remote> [<branch>]] Push, answering prompts from {ENV_USERNAME}/{ENV_PASSWORD}");
    println!("  pull [<remote> [<branch>]] Pull, answering prompts from {ENV_USERNAME}/{ENV_PASSWORD}");
    println!();
    println!("  --repo <path>              Repository directory (default: current directory)");
    println!("  --help                     Show this help message");
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Option<CliInvocation>, RepositoryError> {
        parse_cli_args(args.iter().map(|arg| (*arg).to_owned()))
    }

    #[test]
    fn defaults_to_current_directory() {
        let invocation = parse(&["status"]).expect("parse").expect("invocation");
        assert_eq!(invocation.repo, PathBuf::from("."));
        assert_eq!(invocation.command, CliCommand::Status);
    }

    #[test]
    fn repo_flag_may_follow_the_command() {
        let invocation = parse(&["log", "--repo", " /srv/app "])
            .expect("parse")
            .expect("invocation");
        assert_eq!(invocation.repo, PathBuf::from("/srv/app"));
        assert_eq!(invocation.command, CliCommand::Log);
    }

    #[test]
    fn push_and_pull_take_optional_remote_and_branch() {
        assert_eq!(
            parse(&["push", "origin", "main"])
                .expect("parse")
                .expect("invocation")
                .command,
            CliCommand::Push {
                remote: "origin".to_owned(),
                branch: "main".to_owned(),
            }
        );
        assert_eq!(
            parse(&["pull"]).expect("parse").expect("invocation").command,
            CliCommand::Pull {
                remote: String::new(),
                branch: String::new(),
            }
        );
        assert!(parse(&["push", "a", "b", "c"]).is_err());
    }

    #[test]
    fn help_and_missing_command_request_usage() {
        assert_eq!(parse(&["--help"]).expect("parse"), None);
        assert_eq!(parse(&[]).expect("parse"), None);
    }

    struct TempDir(PathBuf);

    impl TempDir {
        fn new(prefix: &str) -> Self {
            let nanos = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("clock")
                .as_nanos();
            let path = std::env::temp_dir().join(format!(
                "gitty-cli-{prefix}-{}-{nanos}",
                std::process::id()
            ));
            std::fs::create_dir_all(&path).expect("create temp dir");
            Self(path)
        }
    }

    impl Drop for TempDir {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.0);
        }
    }

    fn prepare(
        args: &[&str],
        config_path: &std::path::Path,
    ) -> Result<Option<(CliInvocation, GittyConfig)>> {
        prepare_invocation(args.iter().map(|arg| (*arg).to_owned()), || {
            gitty_config::load_from_path(config_path)
        })
    }

    #[test]
    fn help_does_not_create_config_file() {
        let root = TempDir::new("help");
        let config_path = root.0.join("gitty").join("config.toml");

        assert!(prepare(&["--help"], &config_path).expect("help").is_none());
        assert!(prepare(&[], &config_path).expect("usage").is_none());
        assert!(!config_path.exists());

        let (invocation, _) = prepare(&["status"], &config_path)
            .expect("status")
            .expect("invocation");
        assert_eq!(invocation.command, CliCommand::Status);
        assert!(config_path.exists());
    }

    #[test]
    fn invalid_arguments_fail_before_config_is_loaded() {
        let error = prepare_invocation(vec!["--verbose".to_owned()], || {
            panic!("config must not load for rejected arguments")
        })
        .expect_err("unknown flag");
        assert!(error.to_string().contains("Unknown flag '--verbose'"));
    }

    #[test]
    fn rejects_unknown_input() {
        let error = parse(&["--verbose", "status"]).expect_err("unknown flag");
        assert!(error.to_string().contains("Unknown flag '--verbose'"));

        let error = parse(&["frobnicate"]).expect_err("unknown command");
        assert!(error.to_string().contains("Unknown command 'frobnicate'"));

        let error = parse(&["tags", "extra"]).expect_err("extra argument");
        assert!(error.to_string().contains("takes no arguments"));

        let error = parse(&["status", "--repo"]).expect_err("missing value");
        assert!(error.to_string().contains("Missing value after --repo"));
    }
}
