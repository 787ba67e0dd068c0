//! `devplan snapshot` - create, list, show and delete snapshots

use anyhow::Result;
use chrono::{DateTime, Local, Utc};
use colored::Colorize;
use phasekit::{SnapshotManager, SnapshotRecord};

use crate::Context;
use crate::cli::SnapshotCommand;
use crate::commands::Project;
use crate::progress;
use crate::ui;

pub fn run(ctx: &Context, cmd: SnapshotCommand) -> Result<()> {
    let project = Project::open(ctx)?;
    let manager = project.snapshots();

    match cmd {
        SnapshotCommand::Create { description } => create(ctx, &manager, description.as_deref()),
        SnapshotCommand::List { json } => list(&manager, json),
        SnapshotCommand::Show { id, json } => show(&manager, &id, json),
        SnapshotCommand::Delete { id, yes } => delete(&project, &manager, &id, yes),
    }
}

fn create(ctx: &Context, manager: &SnapshotManager, description: Option<&str>) -> Result<()> {
    let description = description
        .map(String::from)
        .unwrap_or_else(|| format!("manual-{}", Local::now().format("%Y%m%d-%H%M%S")));

    let pb = if ctx.quiet {
        indicatif::ProgressBar::hidden()
    } else {
        progress::spinner("Capturing project state")
    };
    let id = manager.create_snapshot(&description);
    pb.finish_and_clear();
    let id = id?;

    if let Some(info) = manager.get_snapshot_info(&id)? {
        ui::success(&format!("Created snapshot {}", id.bold()));
        ui::kv("Files", &info.record.file_count.to_string());
        ui::kv("Size", &ui::format_size(info.record.total_size));
    } else {
        ui::success(&format!("Created snapshot {}", id.bold()));
    }
    Ok(())
}

fn list(manager: &SnapshotManager, json: bool) -> Result<()> {
    let snapshots = manager.list_snapshots()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&snapshots)?);
        return Ok(());
    }

    ui::header("Snapshots");
    if snapshots.is_empty() {
        ui::info("No snapshots yet. Create one with `devplan snapshot create`.");
        return Ok(());
    }

    for record in &snapshots {
        print_summary(record);
    }
    println!();
    ui::dim(&format!("{} snapshot(s)", snapshots.len()));
    Ok(())
}

fn print_summary(record: &SnapshotRecord) {
    println!(
        "  {}  {}  {}",
        record.id.cyan(),
        format_time(record.created_at).dimmed(),
        record.description
    );
    let mut detail = format!(
        "{} files, {}",
        record.file_count,
        ui::format_size(record.total_size)
    );
    if let Some(restored) = record.restored_at {
        detail.push_str(&format!(", restored {}", format_time(restored)));
    }
    ui::dim(&detail);
}

fn show(manager: &SnapshotManager, id: &str, json: bool) -> Result<()> {
    let Some(info) = manager.get_snapshot_info(id)? else {
        anyhow::bail!("Snapshot {} not found", id);
    };

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
        return Ok(());
    }

    let record = &info.record;
    ui::header(&format!("Snapshot {}", id));
    ui::kv("Description", &record.description);
    ui::kv("Created", &format_time(record.created_at));
    ui::kv("Files", &record.file_count.to_string());
    ui::kv("Size", &ui::format_size(record.total_size));
    ui::kv("Location", &info.directory.display().to_string());
    if let Some(restored) = record.restored_at {
        ui::kv("Restored", &format_time(restored));
    }
    if let Some(backup) = &record.backup_created {
        ui::kv("Backup", backup);
    }

    if !record.project_files.is_empty() {
        ui::section("Entries");
        for entry in &record.project_files {
            ui::dim(entry);
        }
    }
    Ok(())
}

fn delete(project: &Project, manager: &SnapshotManager, id: &str, yes: bool) -> Result<()> {
    if !project.confirm(&format!("Delete snapshot {}?", id), yes)? {
        ui::info("Cancelled");
        return Ok(());
    }

    if manager.delete_snapshot(id)? {
        ui::success(&format!("Deleted snapshot {}", id));
    } else {
        ui::warn(&format!("Snapshot {} does not exist", id));
    }
    Ok(())
}

fn format_time(time: DateTime<Utc>) -> String {
    time.with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}
