//! Plan executor - load, resolve, snapshot, run phases, roll back on failure
//!
//! Every public operation returns an [`ExecutionResult`]; errors are
//! converted at this boundary so callers inspect one result type.

use crate::context::{ContentProvider, NoProgress, ProgressCallback};
use crate::error::{Error, Result};
use crate::plan::{FileResource, PlanDocument};
use crate::resolver::{DependencyResolver, ExecutionPlan, Phase};
use crate::snapshot::{SnapshotManager, SnapshotRecord};
use crate::tasks::{TaskContext, TaskHandler, TaskRegistry};
use crate::templates::BuiltinTemplates;
use crate::types::{ExecuteOptions, ExecutionResult, ExecutionStatus};
use chrono::Local;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;

/// Runs plans against one project directory
pub struct PlanExecutor {
    project_dir: PathBuf,
    snapshots: SnapshotManager,
    resolver: DependencyResolver,
    tasks: TaskRegistry,
    content: Box<dyn ContentProvider>,
}

/// Where a real run stopped
struct PhaseFailure {
    phase: String,
    error: Error,
}

impl PlanExecutor {
    /// Executor with the built-in task table and templates
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        let project_dir = project_dir.into();
        Self {
            snapshots: SnapshotManager::new(project_dir.clone()),
            project_dir,
            resolver: DependencyResolver::new(),
            tasks: TaskRegistry::builtin(),
            content: Box::new(BuiltinTemplates),
        }
    }

    /// Replace the source of generated file bodies
    pub fn with_content_provider(mut self, provider: impl ContentProvider + 'static) -> Self {
        self.content = Box::new(provider);
        self
    }

    /// Register or replace a task handler
    pub fn with_task(mut self, name: impl Into<String>, handler: impl TaskHandler + 'static) -> Self {
        self.tasks.register(name, handler);
        self
    }

    /// Extra snapshot exclusions
    pub fn with_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.snapshots = self.snapshots.with_excludes(patterns);
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn snapshots(&self) -> &SnapshotManager {
        &self.snapshots
    }

    pub fn tasks(&self) -> &TaskRegistry {
        &self.tasks
    }

    /// Resolve a plan file without running it
    pub fn resolve(&self, source: &Path) -> Result<ExecutionPlan> {
        let document = PlanDocument::load(source)?;
        self.resolver.create_execution_plan(document)
    }

    /// Execute the plan at `source`
    pub fn execute_plan(&self, source: &Path, dry_run: bool) -> ExecutionResult {
        let options = if dry_run {
            ExecuteOptions::dry_run()
        } else {
            ExecuteOptions::default()
        };
        self.execute_plan_with(source, &options, &mut NoProgress)
    }

    /// Execute the plan at `source`, reporting progress
    pub fn execute_plan_with<P>(
        &self,
        source: &Path,
        options: &ExecuteOptions,
        progress: &mut P,
    ) -> ExecutionResult
    where
        P: ProgressCallback + ?Sized,
    {
        let started = Instant::now();
        log::info!("Executing plan {}", source.display());
        let result = self.execute(PlanDocument::load(source), options, progress, started);
        progress.on_status(result.status);
        result
    }

    /// Execute an already parsed plan
    pub fn execute_document<P>(
        &self,
        document: PlanDocument,
        options: &ExecuteOptions,
        progress: &mut P,
    ) -> ExecutionResult
    where
        P: ProgressCallback + ?Sized,
    {
        let started = Instant::now();
        let result = self.execute(Ok(document), options, progress, started);
        progress.on_status(result.status);
        result
    }

    /// Restore the project to snapshot `id`
    pub fn rollback_to_snapshot(&self, id: &str) -> ExecutionResult {
        let started = Instant::now();

        match self.snapshots.restore_snapshot(id) {
            Ok(report) => {
                let mut result =
                    ExecutionResult::completed(ExecutionStatus::RolledBack, started.elapsed());
                result.snapshot_id = Some(report.snapshot_id);
                result.changes_made = vec![
                    format!("Restored {} entries", report.restored_entries),
                    format!("Backup created: {}", report.backup_id),
                ];
                result
            }
            Err(e) => {
                let mut result = ExecutionResult::failed(&e, started.elapsed());
                result.snapshot_id = Some(id.to_string());
                result
            }
        }
    }

    /// Snapshots of this project, newest first
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        self.snapshots.list_snapshots()
    }

    fn execute<P>(
        &self,
        document: Result<PlanDocument>,
        options: &ExecuteOptions,
        progress: &mut P,
        started: Instant,
    ) -> ExecutionResult
    where
        P: ProgressCallback + ?Sized,
    {
        progress.on_status(ExecutionStatus::Pending);

        let plan = match document.and_then(|doc| self.resolver.create_execution_plan(doc)) {
            Ok(plan) => {
                if let Some(source) = plan.document.source() {
                    log::debug!("Resolved {} phases from {}", plan.phases.len(), source.display());
                }
                plan
            }
            Err(e) => {
                log::error!("Plan rejected: {}", e);
                return ExecutionResult::failed(&e, started.elapsed());
            }
        };

        if options.dry_run {
            return self.dry_run(&plan, progress, started);
        }

        let description = options.snapshot_description.clone().unwrap_or_else(|| {
            format!("pre-execution-{}", Local::now().format("%Y%m%d-%H%M%S"))
        });
        let snapshot_id = match self.snapshots.create_snapshot(&description) {
            Ok(id) => id,
            Err(e) => {
                log::error!("Could not snapshot project before execution: {}", e);
                return ExecutionResult::failed(&e, started.elapsed());
            }
        };

        progress.on_status(ExecutionStatus::Running);
        log::debug!("Execution state: pending -> running");

        let mut executed_phases = Vec::new();
        let mut changes = Vec::new();
        let outcome = self.run_phases(&plan, progress, &mut executed_phases, &mut changes);

        let mut result = match outcome {
            Ok(()) => {
                log::info!("Plan completed ({} phases)", executed_phases.len());
                ExecutionResult::completed(ExecutionStatus::Completed, started.elapsed())
            }
            Err(failure) => {
                log::error!("Phase {} failed: {}", failure.phase, failure.error);
                let mut result = ExecutionResult::failed(&failure.error, started.elapsed());
                result.failed_phase = Some(failure.phase);

                progress.on_rollback(&snapshot_id);
                if let Err(e) = self.snapshots.restore_snapshot(&snapshot_id) {
                    log::error!("Rollback to {} failed: {}", snapshot_id, e);
                    result.rollback_error = Some(e.to_string());
                } else {
                    log::info!("Rolled back to {}", snapshot_id);
                }
                result.execution_time_secs = started.elapsed().as_secs_f64();
                result
            }
        };

        result.executed_phases = executed_phases;
        result.changes_made = changes;
        result.snapshot_id = Some(snapshot_id);
        result
    }

    fn run_phases<P>(
        &self,
        plan: &ExecutionPlan,
        progress: &mut P,
        executed_phases: &mut Vec<String>,
        changes: &mut Vec<String>,
    ) -> std::result::Result<(), PhaseFailure>
    where
        P: ProgressCallback + ?Sized,
    {
        let files = plan.document.file_resources();
        let total = plan.phases.len();

        for (index, phase) in plan.phases.iter().enumerate() {
            log::info!("Executing phase: {}", phase.name);
            progress.on_phase_start(&phase.name, index, total);

            let phase_changes = self
                .run_phase(phase, &plan.document, &files)
                .map_err(|error| PhaseFailure {
                    phase: phase.name.clone(),
                    error,
                })?;

            for change in phase_changes {
                progress.on_change(&change);
                changes.push(change);
            }

            executed_phases.push(phase.name.clone());
            progress.on_phase_complete(&phase.name);
            log::info!("Completed phase: {}", phase.name);
        }

        Ok(())
    }

    /// Tasks in declaration order, then the file resources for this pass
    fn run_phase(
        &self,
        phase: &Phase,
        document: &PlanDocument,
        files: &[FileResource],
    ) -> Result<Vec<String>> {
        let ctx = TaskContext {
            project_dir: &self.project_dir,
            document,
            phase: &phase.name,
            content: self.content.as_ref(),
        };

        let mut changes = Vec::new();
        for task in &phase.tasks {
            changes.extend(self.tasks.run(task, &ctx)?);
        }

        for file in files.iter().filter(|f| f.applies_to(&phase.name)) {
            changes.push(self.materialize(file)?);
        }

        Ok(changes)
    }

    /// Project-relative target of a file resource
    ///
    /// Paths under excluded names (the state directory, VCS metadata,
    /// dependency caches) are never captured, so a rollback could not undo
    /// a write there.
    fn target_path(&self, file: &FileResource) -> Result<PathBuf> {
        let relative = file.relative_path()?;
        if self.snapshots.is_excluded(&relative) {
            return Err(Error::InvalidPlan(format!(
                "file resource path is excluded from snapshots: '{}'",
                file.path
            )));
        }
        Ok(relative)
    }

    /// Write one declared file, replacing existing content
    fn materialize(&self, file: &FileResource) -> Result<String> {
        let target = self.project_dir.join(self.target_path(file)?);

        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }

        let body = self
            .content
            .generate_content(&file.path, &file.file_type, &file.template);
        fs::write(&target, body).map_err(|e| Error::io(&target, e))?;

        log::debug!("Wrote {}", target.display());
        Ok(format!("Created: {}", file.path))
    }

    /// Describe what a real run would do without touching the filesystem
    fn dry_run<P>(&self, plan: &ExecutionPlan, progress: &mut P, started: Instant) -> ExecutionResult
    where
        P: ProgressCallback + ?Sized,
    {
        let files = plan.document.file_resources();
        let total = plan.phases.len();
        let mut changes = Vec::new();

        for (index, phase) in plan.phases.iter().enumerate() {
            progress.on_phase_start(&phase.name, index, total);

            let mut lines = vec![format!("Phase: {}", phase.name)];
            lines.extend(phase.tasks.iter().map(|task| format!("Would run task: {task}")));
            for file in files.iter().filter(|f| f.applies_to(&phase.name)) {
                lines.push(match self.target_path(file) {
                    Ok(_) => format!("Would create: {}", file.path),
                    Err(e) => format!("Would fail: {e}"),
                });
            }

            for line in lines {
                progress.on_change(&line);
                changes.push(line);
            }
            progress.on_phase_complete(&phase.name);
        }

        let mut result = ExecutionResult::completed(ExecutionStatus::Completed, started.elapsed());
        result.executed_phases = plan.phases.iter().map(|p| p.name.clone()).collect();
        result.changes_made = changes;
        result
    }
}

impl std::fmt::Debug for PlanExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlanExecutor")
            .field("project_dir", &self.project_dir)
            .field("tasks", &self.tasks)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCategory;
    use crate::snapshot::STATE_DIR;
    use tempfile::TempDir;

    const TWO_PHASES: &str = r#"
project:
  name: demo
target_state: {}
resources:
  files:
    - path: src/app.py
      type: entrypoint
      template: fastapi_main
      phase: setup
phases:
  setup:
    priority: 1
    tasks: [setup_project_structure]
  build:
    priority: 2
    dependencies: [setup]
    tasks: [explode]
"#;

    fn explode(_: &TaskContext<'_>) -> Result<Vec<String>> {
        Err(Error::task("explode", "simulated failure"))
    }

    /// Drops every stored snapshot, then fails
    fn wipe_snapshots(ctx: &TaskContext<'_>) -> Result<Vec<String>> {
        let snapshots = ctx.project_dir.join(STATE_DIR).join("snapshots");
        fs::remove_dir_all(&snapshots).map_err(|e| Error::io(&snapshots, e))?;
        Err(Error::task("wipe_snapshots", "simulated failure"))
    }

    fn write_plan(dir: &Path, content: &str) -> PathBuf {
        let path = dir.join("plan.devplan");
        fs::write(&path, content).unwrap();
        path
    }

    struct Recorder {
        events: Vec<String>,
    }

    impl ProgressCallback for Recorder {
        fn on_status(&mut self, status: ExecutionStatus) {
            self.events.push(format!("status:{status}"));
        }
        fn on_phase_start(&mut self, name: &str, index: usize, total: usize) {
            self.events.push(format!("start:{name}:{index}/{total}"));
        }
        fn on_change(&mut self, _change: &str) {}
        fn on_phase_complete(&mut self, name: &str) {
            self.events.push(format!("done:{name}"));
        }
        fn on_rollback(&mut self, _snapshot_id: &str) {
            self.events.push("rollback".to_string());
        }
    }

    #[test]
    fn test_failure_in_second_phase_rolls_back() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        fs::write(project.path().join("existing.txt"), "keep me").unwrap();
        let plan = write_plan(plans.path(), TWO_PHASES);

        let executor = PlanExecutor::new(project.path()).with_task("explode", explode);
        let result = executor.execute_plan(&plan, false);

        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.executed_phases, vec!["setup"]);
        assert_eq!(result.failed_phase.as_deref(), Some("build"));
        assert_eq!(result.error_category, Some(ErrorCategory::Task));
        assert!(result.error_message.unwrap().contains("simulated failure"));
        assert!(result.rollback_error.is_none());

        // Tree matches its pre-run state
        assert!(!project.path().join("src").exists());
        assert!(!project.path().join("docs").exists());
        assert_eq!(
            fs::read_to_string(project.path().join("existing.txt")).unwrap(),
            "keep me"
        );

        let pre = result.snapshot_id.unwrap();
        let info = executor.snapshots().get_snapshot_info(&pre).unwrap().unwrap();
        assert!(info.record.description.starts_with("pre-execution-"));
        assert!(info.record.backup_created.is_some());
    }

    #[test]
    fn test_successful_run_keeps_snapshot_anchor() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(plans.path(), &TWO_PHASES.replace("[explode]", "[implement_jwt]"));

        let executor = PlanExecutor::new(project.path());
        let result = executor.execute_plan(&plan, false);

        assert!(result.success, "{:?}", result.error_message);
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert_eq!(result.executed_phases, vec!["setup", "build"]);
        assert!(result.snapshot_id.is_some());
        assert!(result.changes_made.contains(&"Created: src/app.py".to_string()));
        assert!(result.changes_made.contains(&"Created: src/auth/jwt.py".to_string()));
        assert!(
            fs::read_to_string(project.path().join("src/app.py"))
                .unwrap()
                .contains("FastAPI")
        );
        assert_eq!(executor.list_snapshots().unwrap().len(), 1);
    }

    #[test]
    fn test_dry_run_writes_nothing() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(
            plans.path(),
            "project: demo\ntarget_state: {}\nresources:\n  files:\n    - path: README.md\nphases:\n  setup:\n    priority: 1\n",
        );

        let result = PlanExecutor::new(project.path()).execute_plan(&plan, true);

        assert!(result.success);
        assert_eq!(result.status, ExecutionStatus::Completed);
        assert!(result.snapshot_id.is_none());
        assert_eq!(
            result.changes_made,
            vec!["Phase: setup", "Would create: README.md"]
        );
        assert!(!project.path().join("README.md").exists());
        assert!(!project.path().join(".devstate").exists());
    }

    #[test]
    fn test_unattributed_files_written_every_pass() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(
            plans.path(),
            "project: demo\ntarget_state: {}\nresources:\n  files:\n    - path: notes/todo.md\n      type: doc\nphases:\n  a: {priority: 1}\n  b: {priority: 2}\n",
        );

        let result = PlanExecutor::new(project.path()).execute_plan(&plan, false);

        assert!(result.success);
        assert_eq!(
            result.changes_made,
            vec!["Created: notes/todo.md", "Created: notes/todo.md"]
        );
        let body = fs::read_to_string(project.path().join("notes/todo.md")).unwrap();
        assert!(body.starts_with("# todo.md"));
    }

    #[test]
    fn test_custom_content_provider() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(
            plans.path(),
            "project: demo\ntarget_state: {}\nresources:\n  files:\n    - path: a.txt\n      template: custom\nphases:\n  only: {}\n",
        );

        let executor = PlanExecutor::new(project.path())
            .with_content_provider(|path: &str, _: &str, template: &str| format!("{path}:{template}"));
        let result = executor.execute_plan(&plan, false);

        assert!(result.success);
        assert_eq!(
            fs::read_to_string(project.path().join("a.txt")).unwrap(),
            "a.txt:custom"
        );
    }

    #[test]
    fn test_missing_plan_fails_before_snapshot() {
        let project = TempDir::new().unwrap();
        let result =
            PlanExecutor::new(project.path()).execute_plan(&project.path().join("none.devplan"), false);

        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.error_category, Some(ErrorCategory::PlanLoad));
        assert!(result.snapshot_id.is_none());
        assert!(!project.path().join(".devstate").exists());
    }

    #[test]
    fn test_missing_section_fails_before_snapshot() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(plans.path(), "project: demo\nresources: {}\nphases: {}\n");

        let result = PlanExecutor::new(project.path()).execute_plan(&plan, false);

        assert!(!result.success);
        assert!(result.error_message.unwrap().contains("target_state"));
        assert!(!project.path().join(".devstate").exists());
    }

    #[test]
    fn test_cycle_fails_without_mutation() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(
            plans.path(),
            "project: demo\ntarget_state: {}\nresources: {}\nphases:\n  A: {dependencies: [B]}\n  B: {dependencies: [A]}\n",
        );

        let result = PlanExecutor::new(project.path()).execute_plan(&plan, false);

        assert!(!result.success);
        assert_eq!(result.error_category, Some(ErrorCategory::Dependency));
        assert!(result.error_message.unwrap().contains("circular dependency"));
        assert!(result.executed_phases.is_empty());
        assert!(!project.path().join(".devstate").exists());
    }

    #[test]
    fn test_escaping_file_path_triggers_rollback() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(
            plans.path(),
            "project: demo\ntarget_state: {}\nresources:\n  files:\n    - path: ../outside.txt\nphases:\n  setup:\n    tasks: [setup_project_structure]\n",
        );

        let result = PlanExecutor::new(project.path()).execute_plan(&plan, false);

        assert!(!result.success);
        assert_eq!(result.failed_phase.as_deref(), Some("setup"));
        assert_eq!(result.error_category, Some(ErrorCategory::PlanLoad));
        assert!(!project.path().join("src").exists());
        assert!(!plans.path().join("outside.txt").exists());
    }

    #[test]
    fn test_excluded_file_paths_trigger_rollback() {
        for target in [".devstate/snapshots.json", "web/node_modules/x.js", ".git/config"] {
            let project = TempDir::new().unwrap();
            let plans = TempDir::new().unwrap();
            let plan = write_plan(
                plans.path(),
                &format!(
                    "project: demo\ntarget_state: {{}}\nresources:\n  files:\n    - path: added.txt\n      phase: a\n    - path: {target}\n      phase: a\nphases:\n  a: {{priority: 1}}\n  b: {{priority: 2}}\n"
                ),
            );

            let executor = PlanExecutor::new(project.path());
            let result = executor.execute_plan(&plan, false);

            assert!(!result.success, "{target}");
            assert_eq!(result.failed_phase.as_deref(), Some("a"));
            assert_eq!(result.error_category, Some(ErrorCategory::PlanLoad));
            assert!(result.error_message.unwrap().contains(target));
            assert!(result.rollback_error.is_none(), "{:?}", result.rollback_error);
            assert!(!project.path().join("added.txt").exists());
            assert!(!project.path().join(target).exists());
            assert_eq!(executor.list_snapshots().unwrap().len(), 2);
        }
    }

    #[test]
    fn test_dry_run_reports_excluded_path() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(
            plans.path(),
            "project: demo\ntarget_state: {}\nresources:\n  files:\n    - path: .devstate/index.json\nphases:\n  a: {}\n",
        );

        let result = PlanExecutor::new(project.path()).execute_plan(&plan, true);
        assert!(result.success);
        assert!(result.changes_made[1].starts_with("Would fail:"));
    }

    #[cfg(unix)]
    #[test]
    fn test_permission_denied_write_rolls_back() {
        use std::os::unix::fs::PermissionsExt;

        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let locked = project.path().join("locked");
        fs::create_dir(&locked).unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o555)).unwrap();

        // Permission bits are not enforced for privileged users
        if fs::write(locked.join("check"), "").is_ok() {
            return;
        }

        let plan = write_plan(
            plans.path(),
            "project: demo\ntarget_state: {}\nresources:\n  files:\n    - path: locked/out.txt\n      phase: write\nphases:\n  setup:\n    priority: 1\n    tasks: [setup_project_structure]\n  write:\n    priority: 2\n    dependencies: [setup]\n",
        );

        let result = PlanExecutor::new(project.path()).execute_plan(&plan, false);

        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.failed_phase.as_deref(), Some("write"));
        assert_eq!(result.error_category, Some(ErrorCategory::FileSystem));
        assert!(
            result.error_message.unwrap().starts_with("permission denied"),
            "expected a permission error"
        );
        assert!(result.rollback_error.is_none(), "{:?}", result.rollback_error);
        assert!(!project.path().join("src").exists());
        assert!(locked.is_dir());
        assert!(!locked.join("out.txt").exists());
    }

    #[test]
    fn test_failed_rollback_keeps_original_cause() {
        let project = TempDir::new().unwrap();
        let plans = TempDir::new().unwrap();
        let plan = write_plan(
            plans.path(),
            "project: demo\ntarget_state: {}\nresources: {}\nphases:\n  setup:\n    priority: 1\n    tasks: [setup_project_structure]\n  break:\n    priority: 2\n    tasks: [wipe_snapshots]\n",
        );

        let executor = PlanExecutor::new(project.path()).with_task("wipe_snapshots", wipe_snapshots);
        let result = executor.execute_plan(&plan, false);

        assert!(!result.success);
        assert_eq!(result.failed_phase.as_deref(), Some("break"));
        assert_eq!(result.error_category, Some(ErrorCategory::Task));
        assert!(result.error_message.unwrap().contains("simulated failure"));
        let rollback_error = result.rollback_error.unwrap();
        assert!(rollback_error.contains("not found"), "{rollback_error}");
        // Nothing was restored
        assert!(project.path().join("src").is_dir());
    }

    #[test]
    fn test_unknown_tasks_are_recorded() {
        let project = TempDir::new().unwrap();
        let document = PlanDocument::from_yaml(
            "project: demo\ntarget_state: {}\nresources: {}\nphases:\n  deploy:\n    tasks: [ship_it, 42]\n",
        )
        .unwrap();

        let result = PlanExecutor::new(project.path()).execute_document(
            document,
            &ExecuteOptions::default(),
            &mut NoProgress,
        );

        assert!(result.success);
        assert_eq!(result.changes_made, vec!["Executed task: ship_it"]);
    }

    #[test]
    fn test_progress_events_on_failure() {
        let project = TempDir::new().unwrap();
        let document = PlanDocument::from_yaml(TWO_PHASES).unwrap();
        let executor = PlanExecutor::new(project.path()).with_task("explode", explode);

        let mut recorder = Recorder { events: Vec::new() };
        let options = ExecuteOptions {
            dry_run: false,
            snapshot_description: Some("before test".into()),
        };
        let result = executor.execute_document(document, &options, &mut recorder);

        assert_eq!(
            recorder.events,
            vec![
                "status:pending",
                "status:running",
                "start:setup:0/2",
                "done:setup",
                "start:build:1/2",
                "rollback",
                "status:failed",
            ]
        );
        let pre = result.snapshot_id.unwrap();
        let info = executor.snapshots().get_snapshot_info(&pre).unwrap().unwrap();
        assert_eq!(info.record.description, "before test");
    }

    #[test]
    fn test_rollback_to_snapshot() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("a.txt"), "v1").unwrap();

        let executor = PlanExecutor::new(project.path());
        let id = executor.snapshots().create_snapshot("manual").unwrap();
        fs::write(project.path().join("a.txt"), "v2").unwrap();

        let result = executor.rollback_to_snapshot(&id);
        assert!(result.success);
        assert_eq!(result.status, ExecutionStatus::RolledBack);
        assert_eq!(result.snapshot_id.as_deref(), Some(id.as_str()));
        assert_eq!(fs::read_to_string(project.path().join("a.txt")).unwrap(), "v1");
    }

    #[test]
    fn test_rollback_to_unknown_snapshot() {
        let project = TempDir::new().unwrap();
        fs::write(project.path().join("a.txt"), "v1").unwrap();

        let result = PlanExecutor::new(project.path()).rollback_to_snapshot("snapshot-unknown");
        assert!(!result.success);
        assert_eq!(result.status, ExecutionStatus::Failed);
        assert_eq!(result.error_category, Some(ErrorCategory::Snapshot));
        assert!(project.path().join("a.txt").exists());
    }
}
