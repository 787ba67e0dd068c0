//! `devplan rollback` - restore the project to a snapshot

use anyhow::Result;

use crate::Context;
use crate::commands::Project;
use crate::progress;
use crate::ui;

pub fn run(ctx: &Context, id: &str, yes: bool) -> Result<()> {
    let project = Project::open(ctx)?;
    let executor = project.executor();

    let prompt = format!(
        "Replace the contents of {} with snapshot {}?",
        project.dir.display(),
        id
    );
    if !project.confirm(&prompt, yes)? {
        ui::info("Cancelled");
        return Ok(());
    }

    let pb = if ctx.quiet {
        indicatif::ProgressBar::hidden()
    } else {
        progress::spinner(&format!("Restoring {}", id))
    };
    let result = executor.rollback_to_snapshot(id);
    pb.finish_and_clear();

    if result.success {
        ui::success(&format!("Restored snapshot {}", id));
        for change in &result.changes_made {
            ui::dim(change);
        }
        return Ok(());
    }

    if let Some(message) = &result.error_message {
        ui::error(message);
    }
    if let Some(category) = result.error_category {
        ui::dim(category.advice());
    }
    anyhow::bail!("rollback to {} failed", id)
}
