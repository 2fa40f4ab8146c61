//! Git process executor
//!
//! Runs the git binary against the selected working directory and returns an
//! [`ExecutionResult`]. Every expected failure, including a missing folder
//! or a binary that cannot start, is reported through `ExecutionResult::error`
//! rather than as a Rust error.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn, Instrument};

use crate::classifier::{classify, ClassifiedError, ErrorContext};
use crate::context::RepositoryContext;
use crate::external::{
    CommandError, CommandExecutor, CommandOutput, Invocation, OutputObserver,
    ProcessCommandExecutor,
};
use crate::telemetry::{create_git_span, generate_correlation_id};

/// Outcome of one git invocation.
///
/// `error` is present exactly when `exit_code` is not `Some(0)`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    pub exit_code: Option<i32>,
    pub error: Option<ClassifiedError>,
}

impl ExecutionResult {
    /// Synthetic failure used when no working directory is selected.
    pub fn no_path() -> Self {
        Self {
            stdout: String::new(),
            stderr: "No repository path set".to_string(),
            exit_code: Some(1),
            error: Some(ClassifiedError::no_path()),
        }
    }

    /// Wrap raw process output, classifying it when the exit was not clean.
    pub fn from_output(output: CommandOutput, hints: Option<&ErrorContext>) -> Self {
        let error = if output.success() {
            None
        } else {
            // stderr is preferred, stdout is the fallback ("nothing to commit" lands there)
            let text = if output.stderr.is_empty() {
                &output.stdout
            } else {
                &output.stderr
            };
            Some(
                classify(text, hints)
                    .unwrap_or_else(|| ClassifiedError::unclassified(output.exit_code)),
            )
        };

        Self {
            stdout: output.stdout,
            stderr: output.stderr,
            exit_code: output.exit_code,
            error,
        }
    }

    pub fn spawn_failed(err: &CommandError) -> Self {
        Self {
            stdout: String::new(),
            stderr: err.to_string(),
            exit_code: None,
            error: Some(ClassifiedError::spawn_failed(err)),
        }
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Per-call options for [`GitExecutor::execute_with`].
#[derive(Default)]
pub struct ExecOptions<'a> {
    /// Values for `{branch}`/`{remote}`/`{url}` in proposed fix commands.
    pub hints: Option<ErrorContext>,
    pub observer: Option<&'a dyn OutputObserver>,
    pub env: Vec<(String, String)>,
}

impl<'a> ExecOptions<'a> {
    pub fn with_hints(hints: ErrorContext) -> Self {
        Self {
            hints: Some(hints),
            ..Default::default()
        }
    }

    pub fn observed_by(mut self, observer: &'a dyn OutputObserver) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.push((key.into(), value.into()));
        self
    }
}

/// Spawns git, one process per call.
#[derive(Clone)]
pub struct GitExecutor {
    commands: Arc<dyn CommandExecutor>,
    binary: String,
}

impl GitExecutor {
    pub fn new(commands: Arc<dyn CommandExecutor>, binary: impl Into<String>) -> Self {
        Self {
            commands,
            binary: binary.into(),
        }
    }

    /// Executor backed by the `git` found on `PATH`.
    pub fn system() -> Self {
        Self::new(Arc::new(ProcessCommandExecutor), "git")
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    pub async fn execute(&self, ctx: &RepositoryContext, args: &[&str]) -> ExecutionResult {
        self.execute_with(ctx, args, ExecOptions::default()).await
    }

    /// Run git in the selected working directory.
    ///
    /// Without a selected folder nothing is spawned and a `NO_PATH` result
    /// with exit code 1 comes back.
    pub async fn execute_with(
        &self,
        ctx: &RepositoryContext,
        args: &[&str],
        options: ExecOptions<'_>,
    ) -> ExecutionResult {
        let Some(cwd) = ctx.working_dir() else {
            warn!(args = ?args, "No repository path set; git not spawned");
            return ExecutionResult::no_path();
        };

        let mut invocation = Invocation::new(self.binary.as_str(), args.iter().copied()).in_dir(cwd);
        invocation.env = options.env;

        match self.spawn(&invocation, options.observer).await {
            Ok(output) => ExecutionResult::from_output(output, options.hints.as_ref()),
            Err(err) => ExecutionResult::spawn_failed(&err),
        }
    }

    /// Run git without a working-directory precondition (clone).
    pub async fn execute_unscoped(
        &self,
        args: &[&str],
        observer: Option<&dyn OutputObserver>,
    ) -> Result<CommandOutput, CommandError> {
        let invocation = Invocation::new(self.binary.as_str(), args.iter().copied());
        self.spawn(&invocation, observer).await
    }

    async fn spawn(
        &self,
        invocation: &Invocation,
        observer: Option<&dyn OutputObserver>,
    ) -> Result<CommandOutput, CommandError> {
        let subcommand = invocation.args.first().map(String::as_str).unwrap_or("");
        let span = create_git_span(subcommand, &generate_correlation_id());

        async {
            debug!(
                args = ?invocation.args,
                cwd = ?invocation.cwd,
                "Spawning git"
            );
            let result = self.commands.execute(invocation, observer).await;
            match &result {
                Ok(output) if output.success() => debug!("git exited cleanly"),
                Ok(output) => warn!(
                    exit_code = ?output.exit_code,
                    stderr = %output.stderr.trim(),
                    "git exited with failure"
                ),
                Err(err) => warn!(error = %err, "git could not be started"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
