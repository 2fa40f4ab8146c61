//! Pure parsers for git output formats consumed by the facade.

use serde::{Deserialize, Serialize};

/// Two-letter porcelain codes for paths in an unmerged index state.
pub const UNMERGED_CODES: [&str; 7] = ["UU", "AA", "DD", "AU", "UA", "DU", "UD"];

/// Commits on each side of `HEAD...@{upstream}`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AheadBehind {
    pub ahead: u32,
    pub behind: u32,
}

/// One line of the history view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommitEntry {
    pub hash: String,
    pub author: String,
    pub relative_date: String,
    pub subject: String,
}

/// Newest upstream commit not yet present locally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteCommit {
    pub hash: String,
    pub author: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteEntry {
    pub name: String,
    pub url: String,
    /// `fetch` or `push`
    pub direction: String,
}

/// Paths in an unmerged state, in status order.
///
/// Reads `status --porcelain -z`: records are NUL-terminated and paths are
/// never quoted. Rename and copy records are followed by an extra record
/// holding the source path, which is skipped.
pub fn parse_conflicted_files(porcelain: &str) -> Vec<String> {
    let mut records = porcelain.split('\0');
    let mut files = Vec::new();

    while let Some(record) = records.next() {
        let Some(code) = record.get(..2) else {
            continue;
        };
        if code.contains(['R', 'C']) {
            records.next();
            continue;
        }
        if !UNMERGED_CODES.contains(&code) {
            continue;
        }
        if let Some(path) = record.get(3..).filter(|path| !path.is_empty()) {
            files.push(path.to_string());
        }
    }

    files
}

/// Parse `rev-list --left-right --count` output (`"<ahead>\t<behind>"`).
pub fn parse_ahead_behind(output: &str) -> Option<AheadBehind> {
    let mut counts = output.split_whitespace().map(str::parse::<u32>);
    let ahead = counts.next()?.ok()?;
    let behind = counts.next()?.ok()?;
    Some(AheadBehind { ahead, behind })
}

/// Parse `log --pretty=format:%H|%an|%ar|%s`. The subject keeps any `|`.
pub fn parse_log(output: &str) -> Vec<CommitEntry> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .filter_map(|line| {
            let mut fields = line.splitn(4, '|');
            Some(CommitEntry {
                hash: fields.next()?.to_string(),
                author: fields.next()?.to_string(),
                relative_date: fields.next()?.to_string(),
                subject: fields.next().unwrap_or_default().to_string(),
            })
        })
        .collect()
}

/// Parse `log --format=%H|%an|%s -1`.
pub fn parse_remote_commit(output: &str) -> Option<RemoteCommit> {
    let line = output.trim();
    if line.is_empty() {
        return None;
    }
    let mut fields = line.splitn(3, '|');
    Some(RemoteCommit {
        hash: fields.next()?.to_string(),
        author: fields.next().unwrap_or_default().to_string(),
        message: fields.next().unwrap_or_default().to_string(),
    })
}

/// Parse `remote -v` (`origin\thttps://host/repo.git (fetch)`).
pub fn parse_remotes(output: &str) -> Vec<RemoteEntry> {
    output
        .lines()
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let name = parts.next()?;
            let url = parts.next()?;
            let direction = parts
                .next()
                .map(|d| d.trim_matches(|c| c == '(' || c == ')'))
                .unwrap_or_default();
            Some(RemoteEntry {
                name: name.to_string(),
                url: url.to_string(),
                direction: direction.to_string(),
            })
        })
        .collect()
}

/// Whether a failed upstream query means tracking simply isn't configured.
pub fn is_missing_upstream(stderr: &str) -> bool {
    let stderr = stderr.to_ascii_lowercase();
    stderr.contains("no upstream configured")
        || stderr.contains("not stored as a remote-tracking branch")
        || stderr.contains("no upstream branch")
}
