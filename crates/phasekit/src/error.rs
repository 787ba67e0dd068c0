//! Error types for plan loading, dependency resolution, snapshots and execution.
//!
//! Every error maps to an [`ErrorCategory`] so callers can render a short
//! diagnostic and a piece of advice without matching on each variant.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias for phasekit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Broad failure classes used for caller-facing diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// The plan source is missing, unparsable or structurally incomplete.
    PlanLoad,
    /// The phase graph references unknown phases or contains a cycle.
    Dependency,
    /// A filesystem operation failed (permissions, disk, OS errors).
    FileSystem,
    /// A snapshot could not be found or read.
    Snapshot,
    /// A task handler reported failure.
    Task,
}

impl ErrorCategory {
    /// Short description of the category.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::PlanLoad => "Plan could not be loaded",
            Self::Dependency => "Invalid phase dependencies",
            Self::FileSystem => "Filesystem operation failed",
            Self::Snapshot => "Snapshot unavailable",
            Self::Task => "Task failed",
        }
    }

    /// Actionable advice for resolving errors in this category.
    #[must_use]
    pub fn advice(&self) -> &'static str {
        match self {
            Self::PlanLoad => {
                "Check the plan path and that it declares project, target_state, resources and phases"
            }
            Self::Dependency => "Fix the phase dependency lists so every name exists and no cycle remains",
            Self::FileSystem => "Check directory permissions and available disk space",
            Self::Snapshot => "Run `devplan snapshot list` to see available snapshot ids",
            Self::Task => "Inspect the task output above and re-run once the cause is fixed",
        }
    }
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.description())
    }
}

/// Errors that can occur while loading, resolving or executing a plan.
#[derive(Debug, Error)]
pub enum Error {
    /// The plan source does not exist.
    #[error("plan file not found: {}", .0.display())]
    PlanNotFound(PathBuf),

    /// The plan source is not valid YAML.
    #[error("failed to parse plan {}: {source}", .path.display())]
    PlanParse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// The plan is structurally invalid.
    #[error("invalid plan: {0}")]
    InvalidPlan(String),

    /// A required top-level section is absent.
    #[error("missing required section: {0}")]
    MissingSection(String),

    /// A phase depends on a phase that is not declared.
    #[error("phase '{phase}' depends on unknown phase '{dependency}'")]
    UnknownDependency { phase: String, dependency: String },

    /// The phase graph contains a cycle.
    #[error("circular dependency detected in phases: {}", .phases.join(" -> "))]
    CircularDependency { phases: Vec<String> },

    /// Ordering emitted fewer phases than were declared.
    #[error("dependency ordering incomplete: emitted {emitted} of {total} phases")]
    OrderingViolation { emitted: usize, total: usize },

    /// Permission denied on a filesystem path.
    #[error("permission denied: {}: {source}", .path.display())]
    PermissionDenied {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Any other IO failure on a filesystem path.
    #[error("IO error at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// No snapshot exists with the given id.
    #[error("snapshot {0} not found")]
    SnapshotNotFound(String),

    /// The snapshot id contains characters that cannot name a directory.
    #[error("invalid snapshot id: {0}")]
    InvalidSnapshotId(String),

    /// The snapshot directory exists but its metadata is missing or unreadable.
    #[error("snapshot {id} is corrupt: {reason}")]
    SnapshotCorrupt { id: String, reason: String },

    /// Snapshot metadata or index could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A task handler failed.
    #[error("task '{task}' failed: {message}")]
    Task { task: String, message: String },
}

impl Error {
    /// Wrap an IO error for `path`, splitting out permission failures.
    pub fn io(path: impl AsRef<Path>, source: io::Error) -> Self {
        let path = path.as_ref().to_path_buf();
        if source.kind() == io::ErrorKind::PermissionDenied {
            Self::PermissionDenied { path, source }
        } else {
            Self::Io { path, source }
        }
    }

    /// Build a task failure.
    pub fn task(task: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Task {
            task: task.into(),
            message: message.into(),
        }
    }

    /// The category this error belongs to.
    #[must_use]
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::PlanNotFound(_)
            | Self::PlanParse { .. }
            | Self::InvalidPlan(_)
            | Self::MissingSection(_) => ErrorCategory::PlanLoad,
            Self::UnknownDependency { .. }
            | Self::CircularDependency { .. }
            | Self::OrderingViolation { .. } => ErrorCategory::Dependency,
            Self::PermissionDenied { .. } | Self::Io { .. } => ErrorCategory::FileSystem,
            Self::SnapshotNotFound(_)
            | Self::InvalidSnapshotId(_)
            | Self::SnapshotCorrupt { .. }
            | Self::Serialization(_) => ErrorCategory::Snapshot,
            Self::Task { .. } => ErrorCategory::Task,
        }
    }
}
