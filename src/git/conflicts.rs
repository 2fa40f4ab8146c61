//! Conflict resolution state for one repository.
//!
//! A repository is `Clean` until a conflict enumeration comes back non-empty.
//! Resolving files only shrinks the pending list; the machine returns to
//! `Clean` once the interrupted merge or rebase is continued or aborted.

use serde::{Deserialize, Serialize};
use statig::prelude::*;
use thiserror::Error;
use tracing::{debug, info};

use super::executor::ExecutionResult;
use super::operations::{ConflictOperation, GitService, ResolutionStrategy};
use crate::context::RepositoryContext;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConflictEvent {
    /// Result of re-querying the unmerged paths.
    Observed { files: Vec<String> },
    /// One path was staged as resolved.
    Resolved { path: String },
    /// The operation was continued or aborted successfully.
    Concluded,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictPhase {
    #[default]
    Clean,
    Conflicted,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConflictError {
    #[error("Repository has no conflicts to resolve")]
    NotConflicted,
    #[error("{} file(s) still conflicted: {}", .files.len(), .files.join(", "))]
    UnresolvedConflicts { files: Vec<String> },
}

#[derive(Debug, Default)]
pub struct ConflictMachine {
    phase: ConflictPhase,
    pending: Vec<String>,
}

impl ConflictMachine {
    pub fn phase(&self) -> ConflictPhase {
        self.phase
    }

    pub fn pending(&self) -> &[String] {
        &self.pending
    }
}

#[state_machine(initial = "State::clean()")]
impl ConflictMachine {
    #[state]
    fn clean(&mut self, event: &ConflictEvent) -> Outcome<State> {
        match event {
            ConflictEvent::Observed { files } if !files.is_empty() => {
                self.pending = files.clone();
                self.phase = ConflictPhase::Conflicted;
                info!(count = files.len(), "Conflicts detected");
                Transition(State::conflicted())
            }
            _ => Handled,
        }
    }

    #[state]
    fn conflicted(&mut self, event: &ConflictEvent) -> Outcome<State> {
        match event {
            ConflictEvent::Observed { files } => {
                self.pending = files.clone();
                Handled
            }
            ConflictEvent::Resolved { path } => {
                self.pending.retain(|pending| pending != path);
                debug!(path = %path, remaining = self.pending.len(), "Conflict resolved");
                Handled
            }
            ConflictEvent::Concluded => {
                self.pending.clear();
                self.phase = ConflictPhase::Clean;
                info!("Conflicted operation concluded");
                Transition(State::clean())
            }
        }
    }
}

/// Drives resolution of an interrupted merge or rebase through [`GitService`].
pub struct ConflictTracker {
    operation: ConflictOperation,
    machine: StateMachine<ConflictMachine>,
}

impl ConflictTracker {
    pub fn new(operation: ConflictOperation) -> Self {
        Self {
            operation,
            machine: ConflictMachine::default().state_machine(),
        }
    }

    pub fn operation(&self) -> ConflictOperation {
        self.operation
    }

    pub fn phase(&self) -> ConflictPhase {
        self.machine.inner().phase()
    }

    /// Paths still waiting for a resolution, in status order.
    pub fn pending(&self) -> &[String] {
        self.machine.inner().pending()
    }

    /// Re-enumerate conflicts. This is the only way into `Conflicted`.
    pub async fn refresh(&mut self, git: &GitService, ctx: &RepositoryContext) -> ConflictPhase {
        let files = git.conflicted_files(ctx).await;
        self.machine.handle(&ConflictEvent::Observed { files });
        self.phase()
    }

    pub async fn resolve(
        &mut self,
        git: &GitService,
        ctx: &RepositoryContext,
        file: &str,
        strategy: ResolutionStrategy,
    ) -> Result<ExecutionResult, ConflictError> {
        self.ensure_conflicted()?;
        let result = git.resolve_conflict(ctx, file, strategy).await;
        self.record_resolution(file, &result);
        Ok(result)
    }

    pub async fn resolve_with_markers(
        &mut self,
        git: &GitService,
        ctx: &RepositoryContext,
        file: &str,
    ) -> Result<ExecutionResult, ConflictError> {
        self.ensure_conflicted()?;
        let result = git.resolve_with_markers(ctx, file).await;
        self.record_resolution(file, &result);
        Ok(result)
    }

    /// Continue the operation once nothing is left unmerged.
    ///
    /// A failed continue (a rebase stopping on the next commit, say) leaves
    /// the tracker re-synced from status rather than assumed clean.
    pub async fn continue_operation(
        &mut self,
        git: &GitService,
        ctx: &RepositoryContext,
    ) -> Result<ExecutionResult, ConflictError> {
        self.refresh(git, ctx).await;
        if !self.pending().is_empty() {
            return Err(ConflictError::UnresolvedConflicts {
                files: self.pending().to_vec(),
            });
        }

        let result = git.continue_operation(ctx, self.operation).await;
        if result.success() {
            self.machine.handle(&ConflictEvent::Concluded);
        } else {
            self.refresh(git, ctx).await;
        }
        Ok(result)
    }

    /// Abort the operation, returning the repository to its prior state.
    pub async fn abort(&mut self, git: &GitService, ctx: &RepositoryContext) -> ExecutionResult {
        let result = git.abort(ctx, self.operation).await;
        if result.success() {
            self.machine.handle(&ConflictEvent::Concluded);
        }
        result
    }

    fn ensure_conflicted(&self) -> Result<(), ConflictError> {
        match self.phase() {
            ConflictPhase::Conflicted => Ok(()),
            ConflictPhase::Clean => Err(ConflictError::NotConflicted),
        }
    }

    fn record_resolution(&mut self, file: &str, result: &ExecutionResult) {
        if result.success() {
            self.machine.handle(&ConflictEvent::Resolved {
                path: file.to_string(),
            });
        }
    }
}
