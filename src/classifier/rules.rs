//! The ordered rule table.
//!
//! Declaration order is precedence order. Do not sort or regroup.

use regex::Regex;
use std::sync::LazyLock;

use super::ErrorKind;

/// What the UI may offer once a rule matched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remedy {
    /// A bounded command exists. `$1`, `{branch}`, `{remote}` and `{url}`
    /// are substituted before it is handed to the caller.
    SafeFix(&'static str),
    /// Automation is unsafe; a human has to choose.
    UserDecision,
    /// Nothing to fix, only worth telling the user.
    Informational,
}

#[derive(Debug)]
pub struct Rule {
    pub kind: ErrorKind,
    pub pattern: Regex,
    pub message: &'static str,
    pub remedy: Remedy,
}

fn rule(kind: ErrorKind, pattern: &str, message: &'static str, remedy: Remedy) -> Rule {
    Rule {
        kind,
        // Patterns are literals below; a typo here is a programming error.
        pattern: Regex::new(&format!("(?i){pattern}")).expect("rule pattern must compile"),
        message,
        remedy,
    }
}

pub static RULES: LazyLock<Vec<Rule>> = LazyLock::new(|| {
    vec![
        rule(
            ErrorKind::NotARepo,
            r"not a git repository",
            "This folder is not a Git repository.",
            Remedy::SafeFix("git init"),
        ),
        rule(
            ErrorKind::DubiousOwnership,
            r"dubious ownership in repository at '(.*)'",
            "Git detected dubious ownership for this directory.",
            Remedy::SafeFix(r#"git config --global --add safe.directory "$1""#),
        ),
        rule(
            ErrorKind::RemoteExists,
            r"remote origin already exists",
            "The \"origin\" remote already exists.",
            Remedy::SafeFix("git remote set-url origin {url}"),
        ),
        rule(
            ErrorKind::NoUpstream,
            r"fatal: The current branch (.*) has no upstream branch",
            "The current branch has no upstream branch on the remote.",
            Remedy::SafeFix("git push --set-upstream origin $1"),
        ),
        rule(
            ErrorKind::FailedToPushRefs,
            r"failed to push some refs to",
            "Push failed. The remote contains work that you do not have locally.",
            Remedy::SafeFix("git pull {remote} {branch}"),
        ),
        rule(
            ErrorKind::UnrelatedHistories,
            r"refusing to merge unrelated histories",
            "Refusing to merge unrelated histories.",
            Remedy::UserDecision,
        ),
        rule(
            ErrorKind::AuthFailed,
            r"Authentication failed for|could not read Username for",
            "Authentication failed. Please check your credentials.",
            Remedy::UserDecision,
        ),
        rule(
            ErrorKind::RepoNotFound,
            r"repository '(.*)' not found",
            "Remote repository not found.",
            Remedy::UserDecision,
        ),
        rule(
            ErrorKind::NetworkError,
            r"could not resolve host|Connection refused|network is unreachable",
            "Network error: could not resolve host or reach remote.",
            Remedy::UserDecision,
        ),
        rule(
            ErrorKind::PathspecNotMatch,
            r"pathspec '(.*)' did not match any file",
            "File or path not found.",
            Remedy::Informational,
        ),
        rule(
            ErrorKind::NothingToCommit,
            r"nothing to commit, working tree clean",
            "No changes to commit.",
            Remedy::Informational,
        ),
        rule(
            ErrorKind::DetachedHead,
            r"You are in 'detached HEAD' state",
            "You are in a detached HEAD state.",
            Remedy::UserDecision,
        ),
        rule(
            ErrorKind::MergeConflict,
            r"Automatic merge failed; fix conflicts and then commit the result",
            "Merge conflicts detected. Please resolve them manually.",
            Remedy::UserDecision,
        ),
        rule(
            ErrorKind::LfsNotInstalled,
            r"git-lfs: command not found|not a git-lfs command",
            "Git LFS is not installed on your system.",
            Remedy::UserDecision,
        ),
    ]
});
