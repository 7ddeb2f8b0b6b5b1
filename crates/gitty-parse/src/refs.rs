use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchList {
    pub current: Option<String>,
    pub detached: bool,
    pub others: Vec<String>,
}

impl BranchList {
    pub fn all(&self) -> impl Iterator<Item = &str> {
        self.current
            .iter()
            .chain(self.others.iter())
            .map(String::as_str)
    }
}

/// Parses `git branch --list`.
pub fn parse_branches(output: &str) -> BranchList {
    let mut branches = BranchList::default();

    for line in output.lines() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }

        let mut chars = line.chars();
        let marker = chars.next();
        chars.next();
        let name = chars.as_str().trim();
        if marker == Some('*') {
            if name.starts_with('(') {
                branches.detached = true;
            } else {
                branches.current = Some(name.to_owned());
            }
        } else {
            branches.others.push(name.to_owned());
        }
    }

    branches
}

/// Parses `git tag --list`.
pub fn parse_tags(output: &str) -> Vec<String> {
    output
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_owned)
        .collect()
}
