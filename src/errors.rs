// src/errors.rs

//! Crate-wide error types.
//!
//! - [`SitedagError`] covers configuration and pre-execution validation. Any of
//!   these is fatal and reported before a single task starts.
//! - [`StageError`] covers per-file failures inside a file stage. They are
//!   collected and attached to the owning task's failure via [`StageFailed`].

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::engine::TaskName;

#[derive(Error, Debug)]
pub enum SitedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Task not found: {0}")]
    TaskNotFound(TaskName),

    #[error("Task '{0}' is already registered")]
    DuplicateTask(TaskName),

    #[error("Task '{task}' depends on unknown task '{dependency}'")]
    UnknownDependency {
        task: TaskName,
        dependency: TaskName,
    },

    #[error("Cyclic dependency: {}", .cycle.join(" -> "))]
    CyclicDependency {
        /// Task names along the cycle; the first name is repeated at the end.
        cycle: Vec<TaskName>,
    },

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl SitedagError {
    /// Whether this error was raised while validating the task graph, i.e.
    /// before anything was executed.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            SitedagError::TaskNotFound(_)
                | SitedagError::DuplicateTask(_)
                | SitedagError::UnknownDependency { .. }
                | SitedagError::CyclicDependency { .. }
                | SitedagError::ConfigError(_)
                | SitedagError::TomlError(_)
        )
    }
}

/// Failure of a single file inside a file stage.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("failed to read source {}: {error:#}", .path.display())]
    SourceRead { path: PathBuf, error: anyhow::Error },

    #[error("failed to transform {}: {error:#}", .path.display())]
    Transform { path: PathBuf, error: anyhow::Error },

    #[error("failed to write {}: {error:#}", .path.display())]
    DestinationWrite { path: PathBuf, error: anyhow::Error },
}

impl StageError {
    /// Path the failure refers to (source path for read/transform errors,
    /// destination path for write errors).
    pub fn path(&self) -> &PathBuf {
        match self {
            StageError::SourceRead { path, .. }
            | StageError::Transform { path, .. }
            | StageError::DestinationWrite { path, .. } => path,
        }
    }
}

/// Task-level error produced by a stage in which at least one file failed.
#[derive(Debug)]
pub struct StageFailed {
    pub stage: String,
    pub failures: Vec<StageError>,
}

impl fmt::Display for StageFailed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "stage '{}' failed for {} file(s)",
            self.stage,
            self.failures.len()
        )?;
        for failure in &self.failures {
            write!(f, "\n  - {failure}")?;
        }
        Ok(())
    }
}

impl std::error::Error for StageFailed {}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, SitedagError>;
