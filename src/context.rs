//! The selected working directory.
//!
//! Passed by reference into every executor and facade call. An unselected
//! context is valid and means no repository operation may run.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RepositoryContext {
    working_dir: Option<PathBuf>,
}

impl RepositoryContext {
    /// Context with no folder selected.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self {
            working_dir: Some(path.into()),
        }
    }

    /// Bind the context to a newly selected folder.
    pub fn select_folder(&mut self, path: impl Into<PathBuf>) {
        let path = path.into();
        tracing::info!(path = %path.display(), "Repository folder selected");
        self.working_dir = Some(path);
    }

    pub fn clear(&mut self) {
        self.working_dir = None;
    }

    pub fn working_dir(&self) -> Option<&Path> {
        self.working_dir.as_deref()
    }

    pub fn is_selected(&self) -> bool {
        self.working_dir.is_some()
    }
}
