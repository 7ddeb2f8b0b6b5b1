use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

pub const ENV_GITTY_CONFIG: &str = "GITTY_CONFIG";
pub const ENV_GIT_BIN: &str = "GITTY_GIT_BIN";
pub const ENV_ALLOW_UNSAFE_COMMAND_PATHS: &str = "GITTY_ALLOW_UNSAFE_COMMAND_PATHS";

const DEFAULT_GIT_BINARY: &str = "git";
const DEFAULT_ALLOW_UNSAFE_COMMAND_PATHS: bool = false;
const DEFAULT_TERMINAL_COLS: u16 = 80;
const DEFAULT_TERMINAL_ROWS: u16 = 24;
const DEFAULT_SYNC_DRAIN_GRACE_MS: u64 = 100;
const MAX_SYNC_DRAIN_GRACE_MS: u64 = 10_000;
const DEFAULT_LOG_FILTER: &str = "info";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0}")]
    Message(String),
}

impl ConfigError {
    fn configuration(message: impl Into<String>) -> Self {
        Self::Message(message.into())
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct GittyConfig {
    #[serde(default)]
    pub git: GitConfigToml,
    #[serde(default)]
    pub terminal: TerminalConfigToml,
    #[serde(default)]
    pub sync: SyncConfigToml,
    #[serde(default)]
    pub logging: LoggingConfigToml,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GitConfigToml {
    #[serde(default = "default_git_binary")]
    pub binary: String,
    #[serde(default = "default_allow_unsafe_command_paths")]
    pub allow_unsafe_command_paths: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TerminalConfigToml {
    #[serde(default = "default_terminal_cols")]
    pub cols: u16,
    #[serde(default = "default_terminal_rows")]
    pub rows: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SyncConfigToml {
    /// Milliseconds to keep reading terminal output after the process exits.
    #[serde(default = "default_sync_drain_grace_ms")]
    pub drain_grace_ms: u64,
    /// Extra environment for push/pull subprocesses, e.g. `LC_ALL = "C"`.
    #[serde(default)]
    pub environment: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfigToml {
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GitRuntimeConfig {
    pub binary: String,
    pub allow_unsafe_command_paths: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncRuntimeConfig {
    pub cols: u16,
    pub rows: u16,
    pub drain_grace: Duration,
    pub environment: Vec<(String, String)>,
}

impl GittyConfig {
    pub fn git_runtime(&self) -> GitRuntimeConfig {
        GitRuntimeConfig {
            binary: self.git.binary.clone(),
            allow_unsafe_command_paths: self.git.allow_unsafe_command_paths,
        }
    }

    pub fn sync_runtime(&self) -> SyncRuntimeConfig {
        SyncRuntimeConfig {
            cols: self.terminal.cols,
            rows: self.terminal.rows,
            drain_grace: Duration::from_millis(self.sync.drain_grace_ms),
            environment: self
                .sync
                .environment
                .iter()
                .map(|(key, value)| (key.clone(), value.clone()))
                .collect(),
        }
    }

    /// Applies `GITTY_GIT_BIN` and `GITTY_ALLOW_UNSAFE_COMMAND_PATHS`. Never persisted.
    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        match std::env::var(ENV_GIT_BIN) {
            Ok(raw) => {
                let trimmed = raw.trim();
                if trimmed.is_empty() {
                    return Err(ConfigError::configuration(format!(
                        "{ENV_GIT_BIN} is set but empty. Provide a valid git binary path or unset it."
                    )));
                }
                self.git.binary = trimmed.to_owned();
            }
            Err(std::env::VarError::NotPresent) => {}
            Err(_) => {
                return Err(ConfigError::configuration(format!(
                    "{ENV_GIT_BIN} contained invalid UTF-8"
                )));
            }
        }

        if let Ok(raw) = std::env::var(ENV_ALLOW_UNSAFE_COMMAND_PATHS) {
            self.git.allow_unsafe_command_paths = parse_bool_flag(&raw).ok_or_else(|| {
                ConfigError::configuration(format!(
                    "{ENV_ALLOW_UNSAFE_COMMAND_PATHS} must be true/false/1/0, got '{raw}'"
                ))
            })?;
        }

        Ok(())
    }
}

pub fn load_from_env() -> Result<GittyConfig, ConfigError> {
    let path = config_path_from_env()?;
    let mut config = load_from_path(path)?;
    config.apply_env_overrides()?;
    Ok(config)
}

pub fn load_from_path(path: impl AsRef<Path>) -> Result<GittyConfig, ConfigError> {
    load_or_create_config(path.as_ref())
}

pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    let home = resolve_home_dir().ok_or_else(|| {
        ConfigError::configuration("Unable to resolve home directory from HOME or USERPROFILE")
    })?;

    Ok(home.join(".config").join("gitty").join("config.toml"))
}

fn config_path_from_env() -> Result<PathBuf, ConfigError> {
    match std::env::var(ENV_GITTY_CONFIG) {
        Ok(raw) => {
            if raw.trim().is_empty() {
                default_config_path()
            } else {
                Ok(raw.into())
            }
        }
        Err(std::env::VarError::NotPresent) => default_config_path(),
        Err(_) => Err(ConfigError::configuration(
            "GITTY_CONFIG contained invalid UTF-8",
        )),
    }
}

fn resolve_home_dir() -> Option<PathBuf> {
    std::env::var("HOME")
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
        .or_else(|| {
            std::env::var("USERPROFILE")
                .ok()
                .map(|value| value.trim().to_owned())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
        })
}

fn parse_bool_flag(raw: &str) -> Option<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" | "" => Some(false),
        _ => None,
    }
}

fn default_git_binary() -> String {
    DEFAULT_GIT_BINARY.to_owned()
}

fn default_allow_unsafe_command_paths() -> bool {
    DEFAULT_ALLOW_UNSAFE_COMMAND_PATHS
}

fn default_terminal_cols() -> u16 {
    DEFAULT_TERMINAL_COLS
}

fn default_terminal_rows() -> u16 {
    DEFAULT_TERMINAL_ROWS
}

fn default_sync_drain_grace_ms() -> u64 {
    DEFAULT_SYNC_DRAIN_GRACE_MS
}

fn default_log_filter() -> String {
    DEFAULT_LOG_FILTER.to_owned()
}

impl Default for GitConfigToml {
    fn default() -> Self {
        Self {
            binary: default_git_binary(),
            allow_unsafe_command_paths: default_allow_unsafe_command_paths(),
        }
    }
}

impl Default for TerminalConfigToml {
    fn default() -> Self {
        Self {
            cols: default_terminal_cols(),
            rows: default_terminal_rows(),
        }
    }
}

impl Default for SyncConfigToml {
    fn default() -> Self {
        Self {
            drain_grace_ms: default_sync_drain_grace_ms(),
            environment: BTreeMap::new(),
        }
    }
}

impl Default for LoggingConfigToml {
    fn default() -> Self {
        Self {
            filter: default_log_filter(),
        }
    }
}

fn persist_config(path: &Path, config: &GittyConfig) -> Result<(), ConfigError> {
    let rendered = toml::to_string_pretty(config).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to serialize GITTY_CONFIG for {}: {err}",
            path.display()
        ))
    })?;

    std::fs::write(path, rendered.as_bytes()).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to write GITTY_CONFIG to {}: {err}",
            path.display()
        ))
    })
}

fn load_or_create_config(path: &Path) -> Result<GittyConfig, ConfigError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent).map_err(|err| {
                        ConfigError::configuration(format!(
                            "Failed to create parent directory {} for GITTY_CONFIG: {err}",
                            parent.display()
                        ))
                    })?;
                }
            }

            let default_config = GittyConfig::default();
            persist_config(path, &default_config)?;
            return Ok(default_config);
        }
        Err(err) => {
            return Err(ConfigError::configuration(format!(
                "Failed to read GITTY_CONFIG from {}: {err}",
                path.display()
            )));
        }
    };

    let mut config: GittyConfig = toml::from_str(&raw).map_err(|err| {
        ConfigError::configuration(format!(
            "Failed to parse GITTY_CONFIG from {}: {err}",
            path.display()
        ))
    })?;

    if normalize_config(&mut config) {
        persist_config(path, &config)?;
    }

    Ok(config)
}

fn normalize_config(config: &mut GittyConfig) -> bool {
    let mut changed = false;

    changed |= normalize_non_empty_string(&mut config.git.binary, default_git_binary());
    changed |= normalize_non_empty_string(&mut config.logging.filter, default_log_filter());

    if config.terminal.cols == 0 {
        config.terminal.cols = default_terminal_cols();
        changed = true;
    }
    if config.terminal.rows == 0 {
        config.terminal.rows = default_terminal_rows();
        changed = true;
    }
    if config.sync.drain_grace_ms > MAX_SYNC_DRAIN_GRACE_MS {
        config.sync.drain_grace_ms = MAX_SYNC_DRAIN_GRACE_MS;
        changed = true;
    }

    let before = config.sync.environment.len();
    config.sync.environment.retain(|key, _| !key.trim().is_empty());
    changed |= config.sync.environment.len() != before;

    changed
}

fn normalize_non_empty_string(value: &mut String, default: String) -> bool {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        if *value != default {
            *value = default;
            return true;
        }
        return false;
    }

    if trimmed != value {
        *value = trimmed.to_owned();
        return true;
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Mutex, OnceLock};
    use std::time::{SystemTime, UNIX_EPOCH};

    fn env_lock() -> &'static Mutex<()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        ENV_LOCK.get_or_init(|| Mutex::new(()))
    }

    fn with_env_vars<F>(vars: &[(&str, Option<&str>)], test: F)
    where
        F: FnOnce(),
    {
        let _guard = env_lock().lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let backup = vars
            .iter()
            .map(|(name, _)| ((*name).to_owned(), std::env::var(name).ok()))
            .collect::<Vec<_>>();

        for (name, value) in vars {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }

        test();

        for (name, value) in backup {
            match value {
                Some(value) => std::env::set_var(name, value),
                None => std::env::remove_var(name),
            }
        }
    }

    fn unique_temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "gitty-config-{prefix}-{nanos}-{}",
            std::process::id()
        ));
        std::fs::create_dir_all(&path).expect("create temp dir");
        path
    }

    fn remove_temp_path(path: &Path) {
        let _ = std::fs::remove_dir_all(path);
    }

    fn write_config_file(path: &Path, raw: &str) {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).expect("create fixture config parent");
        }
        std::fs::write(path, raw.as_bytes()).expect("write fixture config");
    }

    #[test]
    fn load_from_env_creates_default_config_when_missing() {
        let home = unique_temp_dir("home-defaults");
        let expected = home.join(".config").join("gitty").join("config.toml");

        with_env_vars(
            &[
                ("HOME", Some(home.to_str().expect("home path"))),
                ("USERPROFILE", None),
                (ENV_GITTY_CONFIG, None),
                (ENV_GIT_BIN, None),
                (ENV_ALLOW_UNSAFE_COMMAND_PATHS, None),
            ],
            || {
                let config = load_from_env().expect("load defaults");
                assert_eq!(config, GittyConfig::default());
                assert_eq!(config.git.binary, "git");
                assert_eq!(config.logging.filter, "info");
                assert!(expected.exists());
            },
        );

        remove_temp_path(&home);
    }

    #[test]
    fn load_from_env_honors_explicit_config_path() {
        let home = unique_temp_dir("home-explicit-path");
        let root = unique_temp_dir("explicit-path");
        let explicit = root.join("nested").join("custom.toml");
        let default = home.join(".config").join("gitty").join("config.toml");

        with_env_vars(
            &[
                ("HOME", Some(home.to_str().expect("home path"))),
                ("USERPROFILE", None),
                (
                    ENV_GITTY_CONFIG,
                    Some(explicit.to_str().expect("config path")),
                ),
                (ENV_GIT_BIN, None),
                (ENV_ALLOW_UNSAFE_COMMAND_PATHS, None),
            ],
            || {
                load_from_env().expect("load explicit path config");
                assert!(explicit.exists());
                assert!(!default.exists());
            },
        );

        remove_temp_path(&home);
        remove_temp_path(&root);
    }

    #[test]
    fn load_from_env_treats_blank_config_path_as_unset() {
        let home = unique_temp_dir("home-blank-path");
        let expected = home.join(".config").join("gitty").join("config.toml");

        with_env_vars(
            &[
                ("HOME", Some(home.to_str().expect("home path"))),
                ("USERPROFILE", None),
                (ENV_GITTY_CONFIG, Some("  ")),
                (ENV_GIT_BIN, None),
                (ENV_ALLOW_UNSAFE_COMMAND_PATHS, None),
            ],
            || {
                load_from_env().expect("load config from default path");
                assert!(expected.exists());
            },
        );

        remove_temp_path(&home);
    }

    #[test]
    fn default_config_path_falls_back_to_userprofile_when_home_is_blank() {
        let userprofile = unique_temp_dir("userprofile-default-path");
        let expected = userprofile.join(".config").join("gitty").join("config.toml");

        with_env_vars(
            &[
                ("HOME", Some("   ")),
                ("USERPROFILE", Some(userprofile.to_str().expect("path"))),
            ],
            || {
                assert_eq!(default_config_path().expect("default path"), expected);
            },
        );

        remove_temp_path(&userprofile);
    }

    #[test]
    fn git_binary_env_override_is_applied_but_not_persisted() {
        let root = unique_temp_dir("git-bin-override");
        let path = root.join("config.toml");

        with_env_vars(
            &[
                (ENV_GITTY_CONFIG, Some(path.to_str().expect("config path"))),
                (ENV_GIT_BIN, Some(" /opt/git/bin/git ")),
                (ENV_ALLOW_UNSAFE_COMMAND_PATHS, Some("true")),
            ],
            || {
                let config = load_from_env().expect("load with overrides");
                assert_eq!(
                    config.git_runtime(),
                    GitRuntimeConfig {
                        binary: "/opt/git/bin/git".to_owned(),
                        allow_unsafe_command_paths: true,
                    }
                );

                let persisted = load_from_path(&path).expect("reload persisted config");
                assert_eq!(persisted.git.binary, "git");
                assert!(!persisted.git.allow_unsafe_command_paths);
            },
        );

        remove_temp_path(&root);
    }

    #[test]
    fn empty_git_binary_override_is_rejected() {
        let root = unique_temp_dir("git-bin-empty");
        let path = root.join("config.toml");

        with_env_vars(
            &[
                (ENV_GITTY_CONFIG, Some(path.to_str().expect("config path"))),
                (ENV_GIT_BIN, Some("  ")),
                (ENV_ALLOW_UNSAFE_COMMAND_PATHS, None),
            ],
            || {
                let error = load_from_env().expect_err("blank override");
                assert!(error.to_string().contains("GITTY_GIT_BIN is set but empty"));
            },
        );

        remove_temp_path(&root);
    }

    #[test]
    fn load_from_path_returns_parse_error_for_invalid_toml() {
        let root = unique_temp_dir("invalid");
        let path = root.join("config.toml");
        write_config_file(&path, "[git]\nbinary = [\n");

        let error = load_from_path(&path).expect_err("expected parse failure");
        assert!(error.to_string().contains("Failed to parse GITTY_CONFIG"));

        remove_temp_path(&root);
    }

    #[test]
    fn partial_file_fills_missing_sections_with_defaults() {
        let root = unique_temp_dir("partial");
        let path = root.join("config.toml");
        write_config_file(
            &path,
            r#"
[sync]
drain_grace_ms = 250

[sync.environment]
LC_ALL = "C"
"#,
        );

        let config = load_from_path(&path).expect("load partial config");
        assert_eq!(config.git, GitConfigToml::default());
        assert_eq!(config.terminal, TerminalConfigToml::default());

        let sync = config.sync_runtime();
        assert_eq!(sync.drain_grace, Duration::from_millis(250));
        assert_eq!(sync.environment, vec![("LC_ALL".to_owned(), "C".to_owned())]);
        assert_eq!((sync.cols, sync.rows), (80, 24));

        remove_temp_path(&root);
    }

    #[test]
    fn load_from_path_normalizes_and_persists_supported_bounds() {
        let root = unique_temp_dir("normalization");
        let path = root.join("config.toml");
        write_config_file(
            &path,
            r#"
[git]
binary = "   "

[terminal]
cols = 0
rows = 0

[sync]
drain_grace_ms = 999999

[sync.environment]
" " = "ignored"
GIT_TRACE = "0"

[logging]
filter = "  gitty=debug  "
"#,
        );

        let config = load_from_path(&path).expect("load and normalize config");

        assert_eq!(config.git.binary, "git");
        assert_eq!(config.terminal.cols, 80);
        assert_eq!(config.terminal.rows, 24);
        assert_eq!(config.sync.drain_grace_ms, 10_000);
        assert_eq!(config.sync.environment.len(), 1);
        assert_eq!(config.logging.filter, "gitty=debug");

        let persisted = std::fs::read_to_string(&path).expect("read persisted config");
        let parsed: GittyConfig =
            toml::from_str(&persisted).expect("parse persisted normalized config");
        assert_eq!(parsed, config);

        remove_temp_path(&root);
    }
}
