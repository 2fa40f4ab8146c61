//! External tool abstractions
//!
//! Trait-based abstraction over process spawning, so the git layer can be
//! exercised with scripted outputs instead of a real binary.

pub mod command;

#[cfg(any(test, feature = "testing"))]
pub mod mocks;

pub use command::{
    CommandError, CommandExecutor, CommandOutput, Invocation, OutputObserver,
    ProcessCommandExecutor,
};
