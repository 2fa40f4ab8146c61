use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::OwnedMutexGuard;
use tracing::{debug, info};

use super::executor::{ExecOptions, ExecutionResult, GitExecutor};
use super::lock::RepoLocks;
use super::parse::{
    is_missing_upstream, parse_ahead_behind, parse_conflicted_files, parse_log,
    parse_remote_commit, parse_remotes, AheadBehind, CommitEntry, RemoteCommit, RemoteEntry,
};
use super::raw::{parse_raw_command, RawCommandError};
use crate::classifier::{ClassifiedError, ErrorContext};
use crate::config::GitSettings;
use crate::context::RepositoryContext;
use crate::external::CommandExecutor;

/// Result of the current-branch query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum CurrentBranch {
    Named { name: String },
    /// HEAD points at a commit, not a branch.
    Detached,
    /// The query failed (unborn branch, not a repository, ...).
    Unavailable { error: ClassifiedError },
}

impl CurrentBranch {
    /// Label shown when there is no usable branch name.
    pub const NO_BRANCH: &'static str = "No branch";

    pub fn name(&self) -> Option<&str> {
        match self {
            CurrentBranch::Named { name } => Some(name),
            _ => None,
        }
    }

    /// Branch name, or the `"No branch"` label the UI has always shown.
    pub fn display_name(&self) -> &str {
        self.name().unwrap_or(Self::NO_BRANCH)
    }
}

/// Relation of the current branch to its upstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum Divergence {
    Tracking { ahead: u32, behind: u32 },
    NoUpstream,
    Failed { error: ClassifiedError },
}

impl Divergence {
    /// Counts with every non-tracking case collapsed to zero/zero.
    pub fn counts(&self) -> AheadBehind {
        match self {
            Divergence::Tracking { ahead, behind } => AheadBehind {
                ahead: *ahead,
                behind: *behind,
            },
            _ => AheadBehind::default(),
        }
    }
}

/// Which in-progress operation owns the conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictOperation {
    Rebase,
    Merge,
}

impl ConflictOperation {
    fn subcommand(&self) -> &'static str {
        match self {
            ConflictOperation::Rebase => "rebase",
            ConflictOperation::Merge => "merge",
        }
    }
}

/// Side to keep when resolving a conflicted file wholesale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionStrategy {
    Ours,
    Theirs,
}

impl ResolutionStrategy {
    fn checkout_flag(&self) -> &'static str {
        match self {
            ResolutionStrategy::Ours => "--ours",
            ResolutionStrategy::Theirs => "--theirs",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCheck {
    pub divergence: Divergence,
    pub metadata: Option<RemoteCommit>,
    /// Set when the preceding fetch failed; counts then reflect stale refs.
    pub fetch_error: Option<ClassifiedError>,
}

/// Typed git operations over the process executor.
///
/// Stateless apart from the per-repository locks: every call takes the
/// [`RepositoryContext`] it should act on.
pub struct GitService {
    executor: GitExecutor,
    locks: RepoLocks,
    log_limit: u32,
}

impl GitService {
    pub fn new(executor: GitExecutor, settings: &GitSettings) -> Self {
        Self {
            executor,
            locks: RepoLocks::new(),
            log_limit: settings.log_limit,
        }
    }

    /// Service using the configured binary through a real process executor.
    pub fn from_settings(settings: &GitSettings) -> Self {
        let executor = GitExecutor::new(
            Arc::new(crate::external::ProcessCommandExecutor),
            settings.binary.as_str(),
        );
        Self::new(executor, settings)
    }

    pub fn with_command_executor(commands: Arc<dyn CommandExecutor>, settings: &GitSettings) -> Self {
        Self::new(GitExecutor::new(commands, settings.binary.as_str()), settings)
    }

    pub fn executor(&self) -> &GitExecutor {
        &self.executor
    }

    async fn lock(&self, ctx: &RepositoryContext) -> Option<OwnedMutexGuard<()>> {
        match ctx.working_dir() {
            Some(path) => Some(self.locks.acquire(path).await),
            None => None,
        }
    }

    pub(super) async fn mutate(&self, ctx: &RepositoryContext, args: &[&str]) -> ExecutionResult {
        self.mutate_with(ctx, args, ExecOptions::default()).await
    }

    async fn mutate_with(
        &self,
        ctx: &RepositoryContext,
        args: &[&str],
        options: ExecOptions<'_>,
    ) -> ExecutionResult {
        let _guard = self.lock(ctx).await;
        self.executor.execute_with(ctx, args, options).await
    }

    // Status and identity

    pub async fn is_repo(&self, ctx: &RepositoryContext) -> bool {
        self.executor
            .execute(ctx, &["rev-parse", "--is-inside-work-tree"])
            .await
            .success()
    }

    /// Short-format status text, verbatim.
    pub async fn status(&self, ctx: &RepositoryContext) -> String {
        self.executor.execute(ctx, &["status", "--short"]).await.stdout
    }

    pub async fn current_branch(&self, ctx: &RepositoryContext) -> CurrentBranch {
        let result = self
            .executor
            .execute(ctx, &["rev-parse", "--abbrev-ref", "HEAD"])
            .await;
        match result.error {
            None => match result.stdout.trim() {
                "HEAD" => CurrentBranch::Detached,
                name => CurrentBranch::Named {
                    name: name.to_string(),
                },
            },
            Some(error) => CurrentBranch::Unavailable { error },
        }
    }

    // Working tree mutations

    pub async fn init(&self, ctx: &RepositoryContext) -> ExecutionResult {
        self.mutate(ctx, &["init"]).await
    }

    pub async fn add(&self, ctx: &RepositoryContext, files: &str) -> ExecutionResult {
        self.mutate(ctx, &["add", files]).await
    }

    pub async fn commit(&self, ctx: &RepositoryContext, message: &str) -> ExecutionResult {
        self.mutate(ctx, &["commit", "-m", message]).await
    }

    // Remote synchronisation

    pub async fn push(&self, ctx: &RepositoryContext, remote: &str, branch: &str) -> ExecutionResult {
        let hints = ErrorContext::new().with_remote(remote).with_branch(branch);
        self.mutate_with(ctx, &["push", remote, branch], ExecOptions::with_hints(hints))
            .await
    }

    pub async fn pull(&self, ctx: &RepositoryContext, remote: &str, branch: &str) -> ExecutionResult {
        let hints = ErrorContext::new().with_remote(remote).with_branch(branch);
        self.mutate_with(ctx, &["pull", remote, branch], ExecOptions::with_hints(hints))
            .await
    }

    pub async fn fetch(&self, ctx: &RepositoryContext) -> ExecutionResult {
        self.mutate(ctx, &["fetch"]).await
    }

    /// Clone `url` into `target`. Runs without a selected folder; failures
    /// are reported as `CLONE_ERROR` carrying git's stderr.
    pub async fn clone_repository(&self, url: &str, target: &str) -> ExecutionResult {
        let _guard = self.locks.acquire(std::path::Path::new(target)).await;
        info!(url = %url, target = %target, "Cloning repository");

        match self.executor.execute_unscoped(&["clone", url, target], None).await {
            Ok(output) => {
                let error = (!output.success()).then(|| ClassifiedError::clone_failed(output.stderr.clone()));
                ExecutionResult {
                    stdout: output.stdout,
                    stderr: output.stderr,
                    exit_code: output.exit_code,
                    error,
                }
            }
            Err(err) => ExecutionResult {
                stdout: String::new(),
                stderr: err.to_string(),
                exit_code: None,
                error: Some(ClassifiedError::clone_failed(err.to_string())),
            },
        }
    }

    // Remotes

    /// `remote -v` output, verbatim.
    pub async fn remotes(&self, ctx: &RepositoryContext) -> String {
        self.executor.execute(ctx, &["remote", "-v"]).await.stdout
    }

    pub async fn remote_list(&self, ctx: &RepositoryContext) -> Vec<RemoteEntry> {
        parse_remotes(&self.remotes(ctx).await)
    }

    pub async fn add_remote(&self, ctx: &RepositoryContext, name: &str, url: &str) -> ExecutionResult {
        let hints = ErrorContext::new().with_remote(name).with_url(url);
        self.mutate_with(ctx, &["remote", "add", name, url], ExecOptions::with_hints(hints))
            .await
    }

    pub async fn remove_remote(&self, ctx: &RepositoryContext, name: &str) -> ExecutionResult {
        self.mutate(ctx, &["remote", "remove", name]).await
    }

    // History

    /// Recent history as `hash|author|relative date|subject` lines.
    pub async fn log(&self, ctx: &RepositoryContext) -> ExecutionResult {
        let limit = self.log_limit.to_string();
        self.executor
            .execute(ctx, &["log", "--pretty=format:%H|%an|%ar|%s", "-n", &limit])
            .await
    }

    pub async fn commits(&self, ctx: &RepositoryContext) -> Vec<CommitEntry> {
        let result = self.log(ctx).await;
        if result.success() {
            parse_log(&result.stdout)
        } else {
            Vec::new()
        }
    }

    // Global configuration

    pub async fn config_get(&self, ctx: &RepositoryContext, key: &str) -> String {
        self.executor
            .execute(ctx, &["config", "--global", key])
            .await
            .stdout
            .trim()
            .to_string()
    }

    pub async fn config_set(&self, ctx: &RepositoryContext, key: &str, value: &str) -> ExecutionResult {
        self.mutate(ctx, &["config", "--global", key, value]).await
    }

    // Conflicts

    /// Paths in an unmerged state, in status order. Not cached.
    pub async fn conflicted_files(&self, ctx: &RepositoryContext) -> Vec<String> {
        let result = self.executor.execute(ctx, &["status", "--porcelain", "-z"]).await;
        parse_conflicted_files(&result.stdout)
    }

    pub async fn abort(&self, ctx: &RepositoryContext, operation: ConflictOperation) -> ExecutionResult {
        self.mutate(ctx, &[operation.subcommand(), "--abort"]).await
    }

    /// Continue the interrupted operation. `GIT_EDITOR=true` keeps git from
    /// waiting on an editor for the commit message.
    pub async fn continue_operation(
        &self,
        ctx: &RepositoryContext,
        operation: ConflictOperation,
    ) -> ExecutionResult {
        let options = ExecOptions::default().env("GIT_EDITOR", "true");
        self.mutate_with(ctx, &[operation.subcommand(), "--continue"], options)
            .await
    }

    pub async fn abort_rebase(&self, ctx: &RepositoryContext) -> ExecutionResult {
        self.abort(ctx, ConflictOperation::Rebase).await
    }

    pub async fn continue_rebase(&self, ctx: &RepositoryContext) -> ExecutionResult {
        self.continue_operation(ctx, ConflictOperation::Rebase).await
    }

    /// Take one side of a conflicted file and stage it. Nothing is
    /// committed; the surrounding merge or rebase still has to be continued.
    pub async fn resolve_conflict(
        &self,
        ctx: &RepositoryContext,
        file: &str,
        strategy: ResolutionStrategy,
    ) -> ExecutionResult {
        let _guard = self.lock(ctx).await;

        let checkout = self
            .executor
            .execute(ctx, &["checkout", strategy.checkout_flag(), "--", file])
            .await;
        if !checkout.success() {
            return checkout;
        }
        self.executor.execute(ctx, &["add", "--", file]).await
    }

    /// Stage a file whose conflict markers the user already edited away.
    pub async fn resolve_with_markers(&self, ctx: &RepositoryContext, file: &str) -> ExecutionResult {
        self.mutate(ctx, &["add", "--", file]).await
    }

    // Upstream tracking

    pub async fn divergence(&self, ctx: &RepositoryContext) -> Divergence {
        let result = self
            .executor
            .execute(ctx, &["rev-list", "--left-right", "--count", "HEAD...@{upstream}"])
            .await;

        match result.error {
            None => match parse_ahead_behind(&result.stdout) {
                Some(AheadBehind { ahead, behind }) => Divergence::Tracking { ahead, behind },
                None => Divergence::Failed {
                    error: ClassifiedError::unrecognised(format!(
                        "Unexpected rev-list output: {}",
                        result.stdout.trim()
                    )),
                },
            },
            Some(_) if is_missing_upstream(&result.stderr) => Divergence::NoUpstream,
            Some(error) => Divergence::Failed { error },
        }
    }

    /// Ahead/behind with "no upstream" and failures reported as zero/zero.
    pub async fn ahead_behind(&self, ctx: &RepositoryContext) -> AheadBehind {
        self.divergence(ctx).await.counts()
    }

    pub async fn remote_metadata(&self, ctx: &RepositoryContext) -> Option<RemoteCommit> {
        let result = self
            .executor
            .execute(ctx, &["log", "HEAD..@{upstream}", "--format=%H|%an|%s", "-1"])
            .await;
        if !result.success() {
            return None;
        }
        parse_remote_commit(&result.stdout)
    }

    /// Fetch, then report divergence and, when behind, the newest upstream commit.
    pub async fn check_updates(&self, ctx: &RepositoryContext) -> UpdateCheck {
        let fetch = self.fetch(ctx).await;
        let divergence = self.divergence(ctx).await;

        let metadata = match &divergence {
            Divergence::Tracking { behind, .. } if *behind > 0 => self.remote_metadata(ctx).await,
            _ => None,
        };
        debug!(divergence = ?divergence, has_metadata = metadata.is_some(), "Update check finished");

        UpdateCheck {
            divergence,
            metadata,
            fetch_error: fetch.error,
        }
    }

    // Release helpers

    pub async fn latest_tag(&self, ctx: &RepositoryContext) -> Option<String> {
        let fetch = self.mutate(ctx, &["fetch", "--tags"]).await;
        if let Some(error) = &fetch.error {
            debug!(error = %error, "Tag fetch failed; using local tags");
        }

        let result = self
            .executor
            .execute(ctx, &["describe", "--tags", "--abbrev=0"])
            .await;
        let tag = result.stdout.trim();
        (result.success() && !tag.is_empty()).then(|| tag.to_string())
    }

    /// Commits on HEAD since `tag`; zero when the range can't be counted.
    pub async fn commit_delta(&self, ctx: &RepositoryContext, tag: &str) -> u32 {
        let range = format!("{tag}..HEAD");
        let result = self
            .executor
            .execute(ctx, &["rev-list", &range, "--count"])
            .await;
        if !result.success() {
            return 0;
        }
        result.stdout.trim().parse().unwrap_or(0)
    }

    // Raw command escape hatch

    /// Run a user-typed `git ...` line after allow-list validation.
    pub async fn run_raw(
        &self,
        ctx: &RepositoryContext,
        line: &str,
    ) -> Result<ExecutionResult, RawCommandError> {
        let args = parse_raw_command(line)?;
        let args: Vec<&str> = args.iter().map(String::as_str).collect();
        Ok(self.mutate(ctx, &args).await)
    }
}
