//! Provider traits for content generation and progress reporting
//!
//! These traits let the executor run without depending on a particular
//! template library or UI.

use crate::types::ExecutionStatus;

/// Produces the literal body of a declared file
///
/// Unknown template identifiers should fall back to a generic placeholder
/// body rather than fail.
pub trait ContentProvider: Send + Sync {
    /// Generate content for a `(path, type, template)` triple
    fn generate_content(&self, path: &str, file_type: &str, template: &str) -> String;
}

/// Progress callback for plan execution
pub trait ProgressCallback {
    /// Called when the execution moves to a new lifecycle state
    fn on_status(&mut self, _status: ExecutionStatus) {}

    /// Called before a phase starts (`index` is zero-based)
    fn on_phase_start(&mut self, name: &str, index: usize, total: usize);

    /// Called for every change a phase reports
    fn on_change(&mut self, change: &str);

    /// Called after a phase completes without error
    fn on_phase_complete(&mut self, name: &str);

    /// Called when the executor starts rolling back to `snapshot_id`
    fn on_rollback(&mut self, _snapshot_id: &str) {}
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_phase_start(&mut self, _name: &str, _index: usize, _total: usize) {}
    fn on_change(&mut self, _change: &str) {}
    fn on_phase_complete(&mut self, _name: &str) {}
}

impl<F> ContentProvider for F
where
    F: Fn(&str, &str, &str) -> String + Send + Sync,
{
    fn generate_content(&self, path: &str, file_type: &str, template: &str) -> String {
        self(path, file_type, template)
    }
}
