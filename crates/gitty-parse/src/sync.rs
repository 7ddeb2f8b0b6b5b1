//! Parsers for single terminal chunks emitted by `git push` / `git pull`.
//!
//! Both are total: a chunk is never rejected, because the sync loop records
//! whatever it is given and chunks are not line-aligned.

use serde::{Deserialize, Serialize};
use thiserror::Error;

const ERROR_PREFIXES: [&str; 2] = ["fatal:", "error:"];

#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[error("{message}")]
pub struct SyncError {
    pub message: String,
    pub raw: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefUpdate {
    /// Leading summary column, e.g. `3f1a2b4..9c8d7e6`, `* [new branch]`.
    pub summary: String,
    pub from: String,
    pub to: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncSuccess {
    pub message: String,
    pub ref_updates: Vec<RefUpdate>,
    pub up_to_date: bool,
}

impl SyncSuccess {
    pub fn is_empty(&self) -> bool {
        self.message.is_empty()
    }
}

pub fn parse_sync_error(chunk: &str) -> SyncError {
    let prefixed = chunk.lines().map(str::trim).find_map(|line| {
        let lowered = line.to_ascii_lowercase();
        ERROR_PREFIXES
            .iter()
            .find(|prefix| lowered.starts_with(**prefix))
            .map(|prefix| line[prefix.len()..].trim().to_owned())
    });

    let message = match prefixed {
        Some(message) if !message.is_empty() => message,
        _ => normalize_lines(chunk),
    };

    SyncError {
        message,
        raw: chunk.to_owned(),
    }
}

pub fn parse_sync_success(chunk: &str) -> SyncSuccess {
    let lowered = chunk.to_ascii_lowercase();
    SyncSuccess {
        message: normalize_lines(chunk),
        ref_updates: chunk.lines().filter_map(parse_ref_update).collect(),
        up_to_date: lowered.contains("up-to-date") || lowered.contains("up to date"),
    }
}

fn normalize_lines(chunk: &str) -> String {
    chunk
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn parse_ref_update(line: &str) -> Option<RefUpdate> {
    let trimmed = line.trim();
    if trimmed.starts_with("To ") || trimmed.starts_with("From ") {
        return None;
    }

    let (left, right) = trimmed.split_once(" -> ")?;
    let to = right
        .split_whitespace()
        .next()
        .filter(|value| !value.starts_with('('))?;
    let (summary, from) = left.trim_end().rsplit_once(char::is_whitespace)?;
    let summary = summary.trim();
    if summary.is_empty() {
        return None;
    }

    Some(RefUpdate {
        summary: summary.to_owned(),
        from: from.to_owned(),
        to: to.to_owned(),
    })
}
