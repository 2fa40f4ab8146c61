//! Git LFS helpers
//!
//! `git lfs` is an optional extension, so availability is probed rather
//! than assumed.

use super::executor::ExecutionResult;
use super::operations::GitService;
use crate::context::RepositoryContext;

impl GitService {
    /// Whether `git lfs` is installed and runnable.
    pub async fn lfs_installed(&self, ctx: &RepositoryContext) -> bool {
        self.executor()
            .execute(ctx, &["lfs", "version"])
            .await
            .success()
    }

    pub async fn lfs_install(&self, ctx: &RepositoryContext) -> ExecutionResult {
        self.mutate(ctx, &["lfs", "install"]).await
    }

    /// Track files matching `pattern`; updates `.gitattributes`.
    pub async fn lfs_track(&self, ctx: &RepositoryContext, pattern: &str) -> ExecutionResult {
        self.mutate(ctx, &["lfs", "track", pattern]).await
    }

    /// Tracked patterns as listed by `git lfs track`.
    pub async fn lfs_tracked(&self, ctx: &RepositoryContext) -> String {
        self.executor().execute(ctx, &["lfs", "track"]).await.stdout
    }
}
