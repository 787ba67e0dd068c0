//! # Phasekit
//!
//! Execution engine for phased development plans.
//!
//! A plan declares named phases with priorities, dependencies and tasks,
//! plus file resources to materialize. Phasekit turns the phases into one
//! valid order, snapshots the project, runs the phases and restores the
//! snapshot if anything fails.
//!
//! ## Core Concepts
//!
//! - **PlanDocument**: the parsed plan, with its required sections checked
//! - **DependencyResolver**: validates the phase graph and orders it
//! - **SnapshotManager**: full-tree captures under `.devstate/`
//! - **PlanExecutor**: orchestration, task dispatch and rollback
//!
//! ## Example
//!
//! ```ignore
//! use phasekit::{ExecutionStatus, PlanExecutor};
//! use std::path::Path;
//!
//! let executor = PlanExecutor::new("/path/to/project");
//! let result = executor.execute_plan(Path::new("project.devplan"), false);
//!
//! if result.status == ExecutionStatus::Failed {
//!     eprintln!("failed in {:?}: {:?}", result.failed_phase, result.error_message);
//! }
//! ```
//!
//! ## Provider Traits
//!
//! - [`ContentProvider`]: produces file bodies for `(path, type, template)`
//! - [`TaskHandler`]: runs a task identifier
//! - [`ProgressCallback`]: receives progress updates

pub mod context;
pub mod error;
pub mod executor;
pub mod plan;
pub mod resolver;
pub mod snapshot;
pub mod tasks;
pub mod templates;
pub mod types;

// Re-export main types at crate root
pub use context::{ContentProvider, NoProgress, ProgressCallback};
pub use error::{Error, ErrorCategory, Result};
pub use executor::PlanExecutor;
pub use plan::{FileResource, PlanDocument, REQUIRED_SECTIONS};
pub use resolver::{DEFAULT_PRIORITY, DependencyResolver, ExecutionPlan, Phase};
pub use snapshot::{
    DEFAULT_EXCLUDES, RESTORE_BACKUP_DESCRIPTION, RestoreReport, STATE_DIR, SnapshotInfo,
    SnapshotManager, SnapshotRecord,
};
pub use tasks::{BUILTIN_TASKS, TaskContext, TaskHandler, TaskRegistry};
pub use templates::{BuiltinTemplates, TEMPLATE_IDS};
pub use types::{ExecuteOptions, ExecutionResult, ExecutionStatus};
