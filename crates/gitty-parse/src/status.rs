use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileChange {
    Modified,
    Added,
    Deleted,
    Renamed,
    Copied,
    TypeChanged,
    Unmerged,
}

impl FileChange {
    fn from_code(code: char) -> Option<Self> {
        match code {
            'M' => Some(Self::Modified),
            'A' => Some(Self::Added),
            'D' => Some(Self::Deleted),
            'R' => Some(Self::Renamed),
            'C' => Some(Self::Copied),
            'T' => Some(Self::TypeChanged),
            'U' => Some(Self::Unmerged),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEntry {
    pub path: String,
    pub original_path: Option<String>,
    pub change: FileChange,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSummary {
    pub staged: Vec<StatusEntry>,
    pub unstaged: Vec<StatusEntry>,
    pub untracked: Vec<String>,
    pub conflicted: Vec<String>,
}

impl StatusSummary {
    pub fn is_clean(&self) -> bool {
        self.staged.is_empty()
            && self.unstaged.is_empty()
            && self.untracked.is_empty()
            && self.conflicted.is_empty()
    }
}

/// Parses `git status --porcelain` (format v1).
pub fn parse_status(output: &str) -> ParseResult<StatusSummary> {
    let mut summary = StatusSummary::default();

    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            continue;
        }

        let mut chars = line.chars();
        let (Some(index), Some(worktree), Some(' ')) = (chars.next(), chars.next(), chars.next())
        else {
            return Err(ParseError::malformed(
                "status",
                format!("unexpected line {line:?}"),
            ));
        };
        let rest = chars.as_str();

        match (index, worktree) {
            ('?', '?') => {
                summary.untracked.push(unquote_path(rest));
                continue;
            }
            ('!', '!') => continue,
            _ => {}
        }

        let (original_path, path) = match rest.split_once(" -> ") {
            Some((from, to)) => (Some(unquote_path(from)), unquote_path(to)),
            None => (None, unquote_path(rest)),
        };

        if is_unmerged(index, worktree) {
            summary.conflicted.push(path);
            continue;
        }

        if index != ' ' {
            let change = change_for(index, line)?;
            summary.staged.push(StatusEntry {
                path: path.clone(),
                original_path: original_path.clone(),
                change,
            });
        }
        if worktree != ' ' {
            let change = change_for(worktree, line)?;
            summary.unstaged.push(StatusEntry {
                path,
                original_path: None,
                change,
            });
        }
    }

    Ok(summary)
}

fn change_for(code: char, line: &str) -> ParseResult<FileChange> {
    FileChange::from_code(code).ok_or_else(|| {
        ParseError::malformed("status", format!("unknown status code {code:?} in {line:?}"))
    })
}

fn is_unmerged(index: char, worktree: char) -> bool {
    matches!(
        (index, worktree),
        ('D', 'D') | ('A', 'U') | ('U', 'D') | ('U', 'A') | ('D', 'U') | ('A', 'A') | ('U', 'U')
    )
}

/// Paths with unusual characters are emitted C-quoted.
fn unquote_path(raw: &str) -> String {
    let Some(inner) = raw
        .strip_prefix('"')
        .and_then(|value| value.strip_suffix('"'))
    else {
        return raw.to_owned();
    };

    let mut unquoted = String::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            unquoted.push(ch);
            continue;
        }
        match chars.next() {
            Some('n') => unquoted.push('\n'),
            Some('t') => unquoted.push('\t'),
            Some(other) => unquoted.push(other),
            None => unquoted.push('\\'),
        }
    }
    unquoted
}
