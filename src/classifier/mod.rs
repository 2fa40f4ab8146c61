//! Git failure classification
//!
//! Maps raw git output to a [`ClassifiedError`] using an ordered rule table.
//! The first matching rule wins, so more specific failures must be declared
//! before the broader families that would otherwise shadow them.
//!
//! Classification never touches the repository: it only proposes a fix
//! command, the caller decides whether to run it.

pub mod rules;

use serde::{Deserialize, Serialize};
use std::fmt;

use rules::{Remedy, Rule, RULES};

/// Symbolic failure kinds surfaced to the UI layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotARepo,
    DubiousOwnership,
    RemoteExists,
    NoUpstream,
    FailedToPushRefs,
    UnrelatedHistories,
    AuthFailed,
    RepoNotFound,
    NetworkError,
    PathspecNotMatch,
    NothingToCommit,
    DetachedHead,
    MergeConflict,
    LfsNotInstalled,
    /// No working directory has been selected.
    NoPath,
    /// `git clone` failed; the message carries the raw stderr.
    CloneError,
    /// The git binary could not be started.
    SpawnFailed,
    /// Non-zero exit that no rule recognised.
    Unknown,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotARepo => "NOT_A_REPO",
            ErrorKind::DubiousOwnership => "DUBIOUS_OWNERSHIP",
            ErrorKind::RemoteExists => "REMOTE_EXISTS",
            ErrorKind::NoUpstream => "NO_UPSTREAM",
            ErrorKind::FailedToPushRefs => "FAILED_TO_PUSH_REFS",
            ErrorKind::UnrelatedHistories => "UNRELATED_HISTORIES",
            ErrorKind::AuthFailed => "AUTH_FAILED",
            ErrorKind::RepoNotFound => "REPO_NOT_FOUND",
            ErrorKind::NetworkError => "NETWORK_ERROR",
            ErrorKind::PathspecNotMatch => "PATHSPEC_NOT_MATCH",
            ErrorKind::NothingToCommit => "NOTHING_TO_COMMIT",
            ErrorKind::DetachedHead => "DETACHED_HEAD",
            ErrorKind::MergeConflict => "MERGE_CONFLICT",
            ErrorKind::LfsNotInstalled => "LFS_NOT_INSTALLED",
            ErrorKind::NoPath => "NO_PATH",
            ErrorKind::CloneError => "CLONE_ERROR",
            ErrorKind::SpawnFailed => "SPAWN_FAILED",
            ErrorKind::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Caller-supplied values substituted into `{branch}`, `{remote}` and `{url}`
/// placeholders of a fix command.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorContext {
    pub branch: Option<String>,
    pub remote: Option<String>,
    pub url: Option<String>,
}

impl ErrorContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_remote(mut self, remote: impl Into<String>) -> Self {
        self.remote = Some(remote.into());
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = Some(url.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.branch.is_none() && self.remote.is_none() && self.url.is_none()
    }
}

/// Structured diagnosis of a failed git invocation.
///
/// `safe_fix_available` and `requires_user_decision` are never both set;
/// `fix_command` is present exactly when `safe_fix_available` is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClassifiedError {
    #[serde(rename = "type")]
    pub kind: ErrorKind,
    pub detected: bool,
    pub message: String,
    pub safe_fix_available: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fix_command: Option<String>,
    pub requires_user_decision: bool,
}

impl ClassifiedError {
    /// No working directory is configured, nothing was spawned.
    pub fn no_path() -> Self {
        Self {
            kind: ErrorKind::NoPath,
            detected: true,
            message: "No repository path set".to_string(),
            safe_fix_available: false,
            fix_command: None,
            requires_user_decision: false,
        }
    }

    pub fn clone_failed(stderr: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::CloneError,
            detected: true,
            message: stderr.into(),
            safe_fix_available: false,
            fix_command: None,
            requires_user_decision: false,
        }
    }

    pub fn spawn_failed(reason: impl fmt::Display) -> Self {
        Self {
            kind: ErrorKind::SpawnFailed,
            detected: true,
            message: format!("Could not run git: {reason}"),
            safe_fix_available: false,
            fix_command: None,
            requires_user_decision: false,
        }
    }

    /// Failure with no matching rule. The caller should show raw stderr.
    pub fn unclassified(exit_code: Option<i32>) -> Self {
        let message = match exit_code {
            Some(code) => format!("Git exited with status {code}"),
            None => "Git terminated without an exit status".to_string(),
        };
        Self::unrecognised(message)
    }

    pub fn unrecognised(message: impl Into<String>) -> Self {
        Self {
            kind: ErrorKind::Unknown,
            detected: false,
            message: message.into(),
            safe_fix_available: false,
            fix_command: None,
            requires_user_decision: false,
        }
    }

    fn from_rule(rule: &Rule, fix_command: Option<String>) -> Self {
        Self {
            kind: rule.kind,
            detected: true,
            message: rule.message.to_string(),
            safe_fix_available: matches!(rule.remedy, Remedy::SafeFix(_)),
            fix_command,
            requires_user_decision: matches!(rule.remedy, Remedy::UserDecision),
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind, self.message)?;
        if let Some(fix) = &self.fix_command {
            write!(f, " (fix: {fix})")?;
        }
        Ok(())
    }
}

/// Classify git output against the rule table.
///
/// Returns `None` when no rule matches; that is an expected outcome and
/// distinct from success.
pub fn classify(output: &str, context: Option<&ErrorContext>) -> Option<ClassifiedError> {
    RULES.iter().find_map(|rule| {
        let captures = rule.pattern.captures(output)?;
        let fix_command = match rule.remedy {
            Remedy::SafeFix(template) => {
                let captured = captures.get(1).map(|m| m.as_str());
                Some(render_fix_command(template, captured, context))
            }
            Remedy::UserDecision | Remedy::Informational => None,
        };
        Some(ClassifiedError::from_rule(rule, fix_command))
    })
}

/// Substitute `$1` with the first capture group and named placeholders with
/// context values. Placeholders without a value are left as-is for the UI.
pub fn render_fix_command(
    template: &str,
    captured: Option<&str>,
    context: Option<&ErrorContext>,
) -> String {
    let mut command = template.to_string();

    if let Some(value) = captured.filter(|v| !v.is_empty()) {
        command = command.replace("$1", value);
    }

    if let Some(context) = context {
        if let Some(branch) = context.branch.as_deref().filter(|v| !v.is_empty()) {
            command = command.replace("{branch}", branch);
        }
        if let Some(remote) = context.remote.as_deref().filter(|v| !v.is_empty()) {
            command = command.replace("{remote}", remote);
        }
        if let Some(url) = context.url.as_deref().filter(|v| !v.is_empty()) {
            command = command.replace("{url}", url);
        }
    }

    command
}
