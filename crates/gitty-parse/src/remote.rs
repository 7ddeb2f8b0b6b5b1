use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,
    pub fetch_url: Option<String>,
    pub push_url: Option<String>,
}

/// Parses `git remote -v`. Remotes keep the order in which git lists them.
pub fn parse_remotes(output: &str) -> Vec<Remote> {
    let mut remotes: Vec<Remote> = Vec::new();

    for line in output.lines() {
        let mut parts = line.split_whitespace();
        let (Some(name), Some(url)) = (parts.next(), parts.next()) else {
            continue;
        };
        let direction = parts.next().unwrap_or("(fetch)");

        let index = match remotes.iter().position(|remote| remote.name == name) {
            Some(index) => index,
            None => {
                remotes.push(Remote {
                    name: name.to_owned(),
                    fetch_url: None,
                    push_url: None,
                });
                remotes.len() - 1
            }
        };

        let remote = &mut remotes[index];
        match direction {
            "(push)" => remote.push_url = Some(url.to_owned()),
            _ => remote.fetch_url = Some(url.to_owned()),
        }
    }

    remotes
}
