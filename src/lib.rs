// gitpush library - git process execution, error classification and typed repository operations
// This exposes the core components for the CLI and for integration tests

pub mod classifier;
pub mod config;
pub mod context;
pub mod external;
pub mod git;
pub mod telemetry;

// Re-export key types for easy access
pub use classifier::{classify, ClassifiedError, ErrorContext, ErrorKind};
pub use config::{config, init_config, GitPushConfig, GitSettings, LoggingConfig};
pub use context::RepositoryContext;
pub use external::{CommandError, CommandExecutor, CommandOutput, Invocation, OutputObserver, ProcessCommandExecutor};
pub use git::{
    ConflictError, ConflictOperation, ConflictPhase, ConflictTracker, CurrentBranch, Divergence,
    ExecOptions, ExecutionResult, GitExecutor, GitService, RawCommandError, ResolutionStrategy,
};
pub use telemetry::{create_git_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
