use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitSummary {
    pub branch: String,
    pub commit: String,
    pub message: String,
    pub root_commit: bool,
    pub files_changed: u32,
    pub insertions: u32,
    pub deletions: u32,
}

/// Parses the stdout of `git commit`, whose first line looks like
/// `[main (root-commit) 3f1a2b4] subject`. Returns `None` for anything else,
/// e.g. "nothing to commit".
pub fn parse_commit(output: &str) -> Option<CommitSummary> {
    let mut lines = output.lines().map(|line| line.trim_end_matches('\r'));
    let header = lines.next()?.trim();
    let rest = header.strip_prefix('[')?;
    let (bracketed, message) = rest.split_once(']')?;

    let mut tokens = bracketed.split_whitespace().collect::<Vec<_>>();
    let commit = tokens.pop()?.to_owned();
    let root_commit = tokens.last() == Some(&"(root-commit)");
    if root_commit {
        tokens.pop();
    }
    if tokens.is_empty() {
        return None;
    }

    let mut summary = CommitSummary {
        branch: tokens.join(" "),
        commit,
        message: message.trim().to_owned(),
        root_commit,
        files_changed: 0,
        insertions: 0,
        deletions: 0,
    };

    if let Some(stats) = lines.find(|line| line.contains("changed")) {
        for part in stats.split(',') {
            let part = part.trim();
            let Some(count) = part
                .split_whitespace()
                .next()
                .and_then(|value| value.parse::<u32>().ok())
            else {
                continue;
            };
            if part.contains("changed") {
                summary.files_changed = count;
            } else if part.contains("insertion") {
                summary.insertions = count;
            } else if part.contains("deletion") {
                summary.deletions = count;
            }
        }
    }

    Some(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_header_and_stats() {
        let output = "[main 9c8d7e6] Add engine notes\n 2 files changed, 10 insertions(+), 3 deletions(-)\n";
        let summary = parse_commit(output).expect("commit summary");

        assert_eq!(summary.branch, "main");
        assert_eq!(summary.commit, "9c8d7e6");
        assert_eq!(summary.message, "Add engine notes");
        assert!(!summary.root_commit);
        assert_eq!(summary.files_changed, 2);
        assert_eq!(summary.insertions, 10);
        assert_eq!(summary.deletions, 3);
    }

    #[test]
    fn recognises_root_commit() {
        let output = "[main (root-commit) 3f1a2b4] Initial commit\n 1 file changed, 1 insertion(+)\n create mode 100644 README.md\n";
        let summary = parse_commit(output).expect("commit summary");

        assert!(summary.root_commit);
        assert_eq!(summary.branch, "main");
        assert_eq!(summary.files_changed, 1);
        assert_eq!(summary.insertions, 1);
        assert_eq!(summary.deletions, 0);
    }

    #[test]
    fn detached_head_branch_keeps_spaces() {
        let summary = parse_commit("[detached HEAD 3f1a2b4] Fixup\n").expect("commit summary");
        assert_eq!(summary.branch, "detached HEAD");
        assert_eq!(summary.files_changed, 0);
    }

    #[test]
    fn nothing_to_commit_is_none() {
        assert_eq!(
            parse_commit("On branch main\nnothing to commit, working tree clean\n"),
            None
        );
        assert_eq!(parse_commit(""), None);
    }
}
