use serde::{Deserialize, Serialize};

use crate::error::{ParseError, ParseResult};

/// Pass as `--pretty=format:<LOG_FORMAT>`. Fields are unit-separated (0x1f)
/// and every record is terminated by a record separator (0x1e), so subjects
/// may contain any printable text.
pub const LOG_FORMAT: &str = "%H%x1f%an%x1f%ae%x1f%aI%x1f%s%x1e";

const FIELD_SEPARATOR: char = '\u{1f}';
const RECORD_SEPARATOR: char = '\u{1e}';
const FIELD_COUNT: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEntry {
    pub commit: String,
    pub author_name: String,
    pub author_email: String,
    pub date: String,
    pub message: String,
}

pub fn parse_log(output: &str) -> ParseResult<Vec<LogEntry>> {
    output
        .split(RECORD_SEPARATOR)
        .map(|record| record.trim_start_matches(['\r', '\n']))
        .filter(|record| !record.trim().is_empty())
        .map(parse_record)
        .collect()
}

fn parse_record(record: &str) -> ParseResult<LogEntry> {
    let fields = record.split(FIELD_SEPARATOR).collect::<Vec<_>>();
    if fields.len() != FIELD_COUNT {
        return Err(ParseError::malformed(
            "log",
            format!(
                "expected {FIELD_COUNT} fields, found {} in record {record:?}",
                fields.len()
            ),
        ));
    }

    let commit = fields[0].trim();
    if commit.is_empty() || !commit.chars().all(|ch| ch.is_ascii_hexdigit()) {
        return Err(ParseError::malformed(
            "log",
            format!("invalid commit hash {commit:?}"),
        ));
    }

    Ok(LogEntry {
        commit: commit.to_owned(),
        author_name: fields[1].to_owned(),
        author_email: fields[2].to_owned(),
        date: fields[3].to_owned(),
        message: fields[4].trim_end_matches(['\r', '\n']).to_owned(),
    })
}
