//! Command implementations

pub mod execute;
pub mod order;
pub mod rollback;
pub mod snapshot;

use anyhow::Result;
use phasekit::{PlanExecutor, SnapshotManager};
use std::path::{Path, PathBuf};

use crate::Context;
use crate::config::Config;

/// The project a command operates on, with its merged configuration
pub struct Project {
    pub dir: PathBuf,
    pub config: Config,
}

impl Project {
    pub fn open(ctx: &Context) -> Result<Self> {
        let dir = crate::paths::project_dir(ctx.project.as_deref())?;
        let config = Config::load(&dir)?;
        Ok(Self { dir, config })
    }

    pub fn executor(&self) -> PlanExecutor {
        PlanExecutor::new(self.dir.clone()).with_excludes(&self.config.snapshots.exclude)
    }

    pub fn snapshots(&self) -> SnapshotManager {
        SnapshotManager::new(self.dir.clone()).with_excludes(&self.config.snapshots.exclude)
    }

    pub fn plan_path(&self, explicit: Option<&Path>) -> PathBuf {
        self.config.plan_path(&self.dir, explicit)
    }

    /// Ask before a destructive action unless prompts are disabled
    pub fn confirm(&self, prompt: &str, assume_yes: bool) -> Result<bool> {
        if assume_yes || !self.config.confirm() {
            return Ok(true);
        }

        let confirmed = dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()?;
        Ok(confirmed)
    }
}
