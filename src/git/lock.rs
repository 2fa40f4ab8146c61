//! Per-repository mutual exclusion.
//!
//! Mutating git operations against one working directory are serialised;
//! different repositories proceed independently.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct RepoLocks {
    locks: Mutex<HashMap<PathBuf, Arc<AsyncMutex<()>>>>,
}

impl RepoLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `path`. Released when the guard drops.
    ///
    /// Spellings of the same directory share one lock. Entries nobody holds
    /// or waits on are dropped on the next acquire.
    pub async fn acquire(&self, path: &Path) -> OwnedMutexGuard<()> {
        let key = lock_key(path);
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(key).or_default())
        };
        lock.lock_owned().await
    }

    /// Number of repositories currently locked or awaited.
    pub fn tracked(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Canonical path when the directory exists, otherwise the absolute path.
fn lock_key(path: &Path) -> PathBuf {
    std::fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_path_is_exclusive() {
        let locks = Arc::new(RepoLocks::new());
        let guard = locks.acquire(Path::new("/repo")).await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(Path::new("/repo")).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_paths_do_not_block() {
        let locks = RepoLocks::new();
        let _a = locks.acquire(Path::new("/a")).await;
        let b = tokio::time::timeout(Duration::from_millis(200), locks.acquire(Path::new("/b"))).await;

        assert!(b.is_ok());
        assert_eq!(locks.tracked(), 2);
    }

    #[tokio::test]
    async fn test_spellings_of_one_directory_share_a_lock() {
        let dir = tempfile::tempdir().unwrap();
        let locks = Arc::new(RepoLocks::new());
        let guard = locks.acquire(dir.path()).await;

        let contender = {
            let locks = Arc::clone(&locks);
            let dotted = dir.path().join(".");
            tokio::spawn(async move {
                let _guard = locks.acquire(&dotted).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());
        assert_eq!(locks.tracked(), 1);

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[test]
    fn test_relative_and_absolute_paths_share_a_key() {
        let cwd = std::env::current_dir().unwrap();
        assert_eq!(lock_key(Path::new("not-yet-cloned")), cwd.join("not-yet-cloned"));
        assert_eq!(lock_key(Path::new("/gitpush/missing/")), Path::new("/gitpush/missing"));
    }

    #[tokio::test]
    async fn test_released_entries_are_evicted() {
        let locks = RepoLocks::new();
        drop(locks.acquire(Path::new("/one")).await);
        drop(locks.acquire(Path::new("/two")).await);

        let _three = locks.acquire(Path::new("/three")).await;
        assert_eq!(locks.tracked(), 1);
    }
}
