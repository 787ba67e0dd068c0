//! Path resolution for devplan
//!
//! # Environment Variables
//!
//! - `DEVPLAN_PROJECT_DIR` - Project directory when `-C` is not given
//! - `DEVPLAN_CONFIG_DIR` - Override the user config directory
//!
//! # Path Resolution Priority
//!
//! For config_dir():
//! 1. `DEVPLAN_CONFIG_DIR` environment variable
//! 2. `XDG_CONFIG_HOME/devplan` (if set)
//! 3. Platform default:
//!    - Windows: `%APPDATA%\devplan`
//!    - macOS/Linux: `~/.config/devplan`

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Environment variable for the project directory
pub const ENV_PROJECT_DIR: &str = "DEVPLAN_PROJECT_DIR";

/// Environment variable for config directory override
pub const ENV_CONFIG_DIR: &str = "DEVPLAN_CONFIG_DIR";

/// Get the devplan config directory path
pub fn config_dir() -> Result<PathBuf> {
    if let Ok(dir) = std::env::var(ENV_CONFIG_DIR) {
        let path = expand(&dir);
        log::debug!(
            "Using config dir from {}: {}",
            ENV_CONFIG_DIR,
            path.display()
        );
        return Ok(path);
    }

    if let Ok(xdg_config) = std::env::var("XDG_CONFIG_HOME") {
        let path = PathBuf::from(xdg_config).join("devplan");
        log::debug!("Using XDG_CONFIG_HOME: {}", path.display());
        return Ok(path);
    }

    #[cfg(windows)]
    {
        if let Some(app_data) = dirs::config_dir() {
            let path = app_data.join("devplan");
            log::debug!("Using Windows config dir: {}", path.display());
            return Ok(path);
        }
    }

    let home = dirs::home_dir().context("Could not determine home directory")?;
    let path = home.join(".config").join("devplan");
    log::debug!("Using default config dir: {}", path.display());
    Ok(path)
}

/// Resolve the project directory from the CLI (or its env fallback)
///
/// The result is absolute so snapshot paths stay stable in output.
pub fn project_dir(requested: Option<&Path>) -> Result<PathBuf> {
    let cwd = std::env::current_dir().context("Could not determine current directory")?;
    let dir = match requested {
        Some(path) => {
            let expanded = expand(&path.to_string_lossy());
            if expanded.is_absolute() {
                expanded
            } else {
                cwd.join(expanded)
            }
        }
        None => cwd,
    };

    if !dir.is_dir() {
        anyhow::bail!("Project directory does not exist: {}", dir.display());
    }
    log::debug!("Using project dir: {}", dir.display());
    Ok(dir)
}

/// Expand ~ and environment variables in a path string.
pub fn expand(path: &str) -> PathBuf {
    let expanded = shellexpand::full(path).unwrap_or(std::borrow::Cow::Borrowed(path));
    PathBuf::from(expanded.as_ref())
}

// ============================================================================
// Tests
// ============================================================================
