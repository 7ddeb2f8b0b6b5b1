use std::fs;
use std::path::{Component, Path, PathBuf};

/// Absolute, lexically cleaned form of `path`. Symlinks are not resolved and
/// the path does not have to exist.
pub fn normalize_path(path: &Path) -> PathBuf {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        match std::env::current_dir() {
            Ok(current) => current.join(path),
            Err(_) => path.to_path_buf(),
        }
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !normalized.pop() {
                    normalized.push(component);
                }
            }
            other => normalized.push(other),
        }
    }
    normalized
}

/// Last path component, or the whole path when there is none (e.g. `/`).
pub fn repository_name(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| path.to_string_lossy().to_string())
}

/// True when `path/.git` is a directory, or a file starting with `gitdir:`
/// as linked worktrees and submodules use.
pub fn is_repository_root(path: &Path) -> bool {
    let dot_git = path.join(".git");
    let Ok(metadata) = fs::metadata(&dot_git) else {
        return false;
    };

    if metadata.is_dir() {
        return true;
    }

    if metadata.is_file() {
        let Ok(contents) = fs::read(&dot_git) else {
            return false;
        };
        let first_non_whitespace = contents
            .iter()
            .position(|byte| !byte.is_ascii_whitespace())
            .unwrap_or(contents.len());
        return contents[first_non_whitespace..].starts_with(b"gitdir:");
    }

    false
}
