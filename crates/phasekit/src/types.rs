//! Core types shared by the executor and its callers

use crate::error::{Error, ErrorCategory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Lifecycle of a single plan execution
///
/// `Pending` and `Running` only exist while an execution is in flight;
/// results handed back to callers are always terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Pending,
    Running,
    Completed,
    Failed,
    RolledBack,
}

impl ExecutionStatus {
    /// Whether no further transition can happen from this state
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::RolledBack)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::RolledBack => "rolled_back",
        };
        f.write_str(s)
    }
}

/// Outcome of `execute_plan` or `rollback_to_snapshot`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub success: bool,
    pub status: ExecutionStatus,
    /// Phases that finished, in execution order
    pub executed_phases: Vec<String>,
    /// Phase in progress when the failure happened
    pub failed_phase: Option<String>,
    pub error_message: Option<String>,
    pub error_category: Option<ErrorCategory>,
    /// Pre-execution snapshot, or the rollback target
    pub snapshot_id: Option<String>,
    pub execution_time_secs: f64,
    pub changes_made: Vec<String>,
    /// Set when the automatic rollback after a failure did not succeed
    pub rollback_error: Option<String>,
}

impl ExecutionResult {
    /// A successful result with the given terminal status
    pub fn completed(status: ExecutionStatus, elapsed: Duration) -> Self {
        Self {
            success: true,
            status,
            executed_phases: Vec::new(),
            failed_phase: None,
            error_message: None,
            error_category: None,
            snapshot_id: None,
            execution_time_secs: elapsed.as_secs_f64(),
            changes_made: Vec::new(),
            rollback_error: None,
        }
    }

    /// A failed result describing `error`
    pub fn failed(error: &Error, elapsed: Duration) -> Self {
        Self {
            success: false,
            status: ExecutionStatus::Failed,
            executed_phases: Vec::new(),
            failed_phase: None,
            error_message: Some(error.to_string()),
            error_category: Some(error.category()),
            snapshot_id: None,
            execution_time_secs: elapsed.as_secs_f64(),
            changes_made: Vec::new(),
            rollback_error: None,
        }
    }
}

/// Options for a plan execution
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Report what would change without touching the filesystem
    pub dry_run: bool,
    /// Description for the pre-execution snapshot; generated when `None`
    pub snapshot_description: Option<String>,
}

impl ExecuteOptions {
    pub fn dry_run() -> Self {
        Self {
            dry_run: true,
            ..Self::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_terminal() {
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::RolledBack.is_terminal());
    }

    #[test]
    fn test_status_serializes_snake_case() {
        let json = serde_json::to_string(&ExecutionStatus::RolledBack).unwrap();
        assert_eq!(json, "\"rolled_back\"");
        assert_eq!(ExecutionStatus::RolledBack.to_string(), "rolled_back");
    }

    #[test]
    fn test_failed_result_carries_category() {
        let err = Error::MissingSection("phases".into());
        let result = ExecutionResult::failed(&err, Duration::from_millis(5));
        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.error_category, Some(ErrorCategory::PlanLoad));
        assert_eq!(
            result.error_message.as_deref(),
            Some("missing required section: phases")
        );
    }
}
