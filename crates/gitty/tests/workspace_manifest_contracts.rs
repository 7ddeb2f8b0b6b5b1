use std::fs;
use std::path::PathBuf;

fn repo_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .parent()
        .and_then(|path| path.parent())
        .expect("crates/gitty should have a workspace root parent")
        .to_path_buf()
}

fn crate_dirs() -> Vec<PathBuf> {
    let crates_dir = repo_root().join("crates");
    let mut dirs = fs::read_dir(&crates_dir)
        .expect("read crates directory")
        .map(|entry| entry.expect("read crate entry").path())
        .filter(|path| path.is_dir() && path.join("Cargo.toml").exists())
        .collect::<Vec<_>>();
    dirs.sort();
    dirs
}

#[test]
fn workspace_manifest_lists_every_crate() {
    let workspace_manifest =
        fs::read_to_string(repo_root().join("Cargo.toml")).expect("read workspace Cargo.toml");

    for path in crate_dirs() {
        let crate_name = path
            .file_name()
            .and_then(|name| name.to_str())
            .expect("crate directory name must be valid UTF-8");
        let expected_member = format!("\"crates/{crate_name}\"");
        assert!(
            workspace_manifest.contains(&expected_member),
            "workspace manifest is missing member {expected_member}",
        );
    }
}

#[test]
fn only_the_cli_crate_depends_on_anyhow_or_tracing_subscriber() {
    for path in crate_dirs() {
        let manifest_path = path.join("Cargo.toml");
        let manifest = fs::read_to_string(&manifest_path)
            .unwrap_or_else(|_| panic!("read {}", manifest_path.display()));
        if path.ends_with("gitty-cli") {
            continue;
        }

        for binary_only in ["anyhow", "tracing-subscriber"] {
            assert!(
                !manifest.contains(binary_only),
                "{} must not depend on {binary_only}; library crates return typed errors",
                manifest_path.display(),
            );
        }
    }
}

#[test]
fn parse_crate_stays_free_of_process_dependencies() {
    let manifest_path = repo_root().join("crates/gitty-parse/Cargo.toml");
    let manifest = fs::read_to_string(&manifest_path).expect("read gitty-parse manifest");
    for forbidden in ["tokio", "portable-pty", "gitty-command"] {
        assert!(
            !manifest.contains(forbidden),
            "gitty-parse must stay pure; found {forbidden}",
        );
    }
}

fn rust_sources(dir: &std::path::Path, found: &mut Vec<PathBuf>) {
    for entry in fs::read_dir(dir).expect("read source directory") {
        let path = entry.expect("read source entry").path();
        if path.is_dir() {
            rust_sources(&path, found);
        } else if path.extension().is_some_and(|ext| ext == "rs") {
            found.push(path);
        }
    }
}

#[test]
fn environment_variable_names_are_defined_once() {
    let mut sources = Vec::new();
    for path in crate_dirs() {
        rust_sources(&path.join("src"), &mut sources);
    }

    for name in ["GITTY_GIT_BIN", "GITTY_ALLOW_UNSAFE_COMMAND_PATHS", "GITTY_CONFIG"] {
        let definition = format!("&str = \"{name}\";");
        let defining = sources
            .iter()
            .filter(|path| {
                fs::read_to_string(path)
                    .unwrap_or_else(|_| panic!("read {}", path.display()))
                    .contains(&definition)
            })
            .collect::<Vec<_>>();
        assert_eq!(
            defining.len(),
            1,
            "{name} must be defined in exactly one crate, found {defining:?}",
        );
    }
}
