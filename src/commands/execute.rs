//! `devplan execute` - run a plan with snapshot and rollback

use anyhow::Result;
use phasekit::{ExecuteOptions, ExecutionResult};

use crate::Context;
use crate::cli::ExecuteArgs;
use crate::commands::Project;
use crate::progress::PhaseProgress;
use crate::ui;

pub fn run(ctx: &Context, args: ExecuteArgs) -> Result<()> {
    let project = Project::open(ctx)?;
    let plan = project.plan_path(args.plan.as_deref());
    let executor = project.executor();
    let options = ExecuteOptions {
        dry_run: args.dry_run,
        snapshot_description: args.description,
    };

    let show_header = !args.json && !ctx.quiet;
    if show_header {
        ui::header(if args.dry_run {
            "Execute (Dry Run)"
        } else {
            "Execute"
        });
        ui::kv("Plan", &plan.display().to_string());
        ui::kv("Project", &project.dir.display().to_string());
        println!();
    }

    let mut progress = PhaseProgress::new(ctx.quiet || args.json, ctx.verbose > 0);
    let result = executor.execute_plan_with(&plan, &options, &mut progress);
    progress.finish();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result, args.dry_run, show_header);
    }

    if !result.success {
        anyhow::bail!("plan execution failed");
    }
    Ok(())
}

fn print_result(result: &ExecutionResult, dry_run: bool, show_changes: bool) {
    if show_changes && !result.changes_made.is_empty() {
        ui::section(if dry_run { "Planned changes" } else { "Changes" });
        for change in &result.changes_made {
            println!("  {}", ui::change_line(change));
        }
    }

    ui::section("Summary");
    ui::kv("Status", &result.status.to_string());
    let phases = if result.executed_phases.is_empty() {
        "none".to_string()
    } else {
        result.executed_phases.join(" -> ")
    };
    ui::kv("Phases", &phases);
    if let Some(id) = &result.snapshot_id {
        ui::kv("Snapshot", id);
    }
    ui::kv("Time", &ui::format_duration(result.execution_time_secs));
    println!();

    if result.success {
        if dry_run {
            ui::success("Dry run complete, nothing was changed");
        } else {
            ui::success(&format!("Plan executed ({} changes)", result.changes_made.len()));
        }
        return;
    }

    if let Some(phase) = &result.failed_phase {
        ui::error(&format!("Phase '{}' failed", phase));
    }
    if let Some(message) = &result.error_message {
        ui::error(message);
    }
    if let Some(category) = result.error_category {
        ui::dim(category.advice());
    }

    match (&result.snapshot_id, &result.rollback_error) {
        (Some(id), Some(err)) => {
            ui::warn(&format!("Rollback to {} failed: {}", id, err));
            ui::dim("Run `devplan snapshot list` to find the automatic backup");
        }
        (Some(id), None) if result.failed_phase.is_some() => {
            ui::info(&format!("Project restored to snapshot {}", id));
        }
        _ => {}
    }
}
