//! Git operations module
//!
//! Every operation shells out to the git binary through [`GitExecutor`];
//! [`GitService`] layers typed operations on top of it.

pub mod conflicts;
pub mod executor;
pub mod lfs;
pub mod lock;
pub mod operations;
pub mod parse;
pub mod raw;

pub use conflicts::{ConflictError, ConflictPhase, ConflictTracker};
pub use executor::{ExecOptions, ExecutionResult, GitExecutor};
pub use lock::RepoLocks;
pub use operations::{
    ConflictOperation, CurrentBranch, Divergence, GitService, ResolutionStrategy, UpdateCheck,
};
pub use parse::{AheadBehind, CommitEntry, RemoteCommit, RemoteEntry};
pub use raw::{parse_raw_command, RawCommandError};
