//! Progress indicators for devplan CLI.

use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use phasekit::{ExecutionStatus, ProgressCallback};
use std::time::Duration;

use crate::ui;

/// Spinner with a message, ticking in the background
pub fn spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

/// Renders phase progress for `execute`
pub struct PhaseProgress {
    bar: ProgressBar,
    show_changes: bool,
}

impl PhaseProgress {
    /// `hidden` suppresses all drawing (quiet or JSON output)
    pub fn new(hidden: bool, show_changes: bool) -> Self {
        let bar = if hidden {
            ProgressBar::hidden()
        } else {
            spinner("Loading plan")
        };
        Self { bar, show_changes }
    }

    pub fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

impl ProgressCallback for PhaseProgress {
    fn on_status(&mut self, status: ExecutionStatus) {
        log::debug!("Execution status: {}", status);
        if status == ExecutionStatus::Running {
            self.bar.set_message("Running phases");
        } else if status.is_terminal() {
            self.bar.set_message(format!("Execution {}", status));
        }
    }

    fn on_phase_start(&mut self, name: &str, index: usize, total: usize) {
        self.bar
            .set_message(format!("{} {}", format!("[{}/{}]", index + 1, total).blue(), name));
    }

    fn on_change(&mut self, change: &str) {
        if self.show_changes {
            self.bar.println(format!("    {}", ui::change_line(change)));
        }
    }

    fn on_phase_complete(&mut self, name: &str) {
        self.bar.println(format!("{} {}", "✓".green(), name));
    }

    fn on_rollback(&mut self, snapshot_id: &str) {
        self.bar
            .set_message(format!("{} {}", "Rolling back to".yellow(), snapshot_id));
    }
}
