//! User and project configuration
//!
//! Settings are read from `<config_dir>/config.toml` and then from the
//! project's `.devplan.toml`; project values win. Example:
//!
//! ```toml
//! plan = "plans/api.devplan"
//! confirm = false
//!
//! [snapshots]
//! exclude = ["target", "dist", "*.log"]
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::paths;

/// Project-local config file name
pub const PROJECT_CONFIG_FILE: &str = ".devplan.toml";

/// Config file name inside the user config directory
pub const USER_CONFIG_FILE: &str = "config.toml";

/// Plan file used when neither the CLI nor the config names one
pub const DEFAULT_PLAN_FILE: &str = "project.devplan";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Default plan file, relative to the project directory
    pub plan: Option<String>,
    /// Whether destructive commands ask before proceeding
    pub confirm: Option<bool>,
    pub snapshots: SnapshotSettings,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SnapshotSettings {
    /// Extra names (or `*.ext` patterns) left out of snapshots
    pub exclude: Vec<String>,
}

impl Config {
    /// Load the user config, then overlay the project config
    pub fn load(project_dir: &Path) -> Result<Self> {
        let user = paths::config_dir()?.join(USER_CONFIG_FILE);
        Self::load_from(Some(&user), project_dir)
    }

    fn load_from(user_file: Option<&Path>, project_dir: &Path) -> Result<Self> {
        let mut config = Self::default();
        if let Some(user) = user_file.map(Self::from_file).transpose()?.flatten() {
            config = config.merge(user);
        }
        if let Some(project) = Self::from_file(&project_dir.join(PROJECT_CONFIG_FILE))? {
            config = config.merge(project);
        }
        Ok(config)
    }

    /// Parse a config file; a missing file is `None`
    pub fn from_file(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("Could not read {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("Invalid config format in {}", path.display()))?;

        log::debug!("Loaded config from {}", path.display());
        Ok(Some(config))
    }

    /// Overlay `other` on top of `self`; exclusions accumulate
    pub fn merge(mut self, other: Self) -> Self {
        if other.plan.is_some() {
            self.plan = other.plan;
        }
        if other.confirm.is_some() {
            self.confirm = other.confirm;
        }
        for name in other.snapshots.exclude {
            if !self.snapshots.exclude.contains(&name) {
                self.snapshots.exclude.push(name);
            }
        }
        self
    }

    /// Resolve the plan file for `project_dir`, preferring an explicit path
    pub fn plan_path(&self, project_dir: &Path, explicit: Option<&Path>) -> PathBuf {
        let path = match explicit {
            Some(path) => paths::expand(&path.to_string_lossy()),
            None => paths::expand(self.plan.as_deref().unwrap_or(DEFAULT_PLAN_FILE)),
        };

        if path.is_absolute() {
            path
        } else if explicit.is_some() {
            // Explicit paths are relative to where the user typed them
            std::env::current_dir()
                .map(|cwd| cwd.join(&path))
                .unwrap_or(path)
        } else {
            project_dir.join(path)
        }
    }

    pub fn confirm(&self) -> bool {
        self.confirm.unwrap_or(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_full() {
        let config: Config = toml::from_str(
            r#"
plan = "plans/api.devplan"
confirm = false

[snapshots]
exclude = ["target", "*.log"]
"#,
        )
        .unwrap();

        assert_eq!(config.plan.as_deref(), Some("plans/api.devplan"));
        assert!(!config.confirm());
        assert_eq!(config.snapshots.exclude, vec!["target", "*.log"]);
    }

    #[test]
    fn test_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.confirm());
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert!(toml::from_str::<Config>("plans = 'x'").is_err());
    }

    #[test]
    fn test_merge_project_wins() {
        let user = Config {
            plan: Some("user.devplan".into()),
            confirm: Some(false),
            snapshots: SnapshotSettings {
                exclude: vec!["target".into()],
            },
        };
        let project = Config {
            plan: Some("project-local.devplan".into()),
            confirm: None,
            snapshots: SnapshotSettings {
                exclude: vec!["target".into(), "dist".into()],
            },
        };

        let merged = user.merge(project);
        assert_eq!(merged.plan.as_deref(), Some("project-local.devplan"));
        assert_eq!(merged.confirm, Some(false));
        assert_eq!(merged.snapshots.exclude, vec!["target", "dist"]);
    }

    #[test]
    fn test_load_from_files() {
        let tmp = TempDir::new().unwrap();
        let user_file = tmp.path().join("config.toml");
        fs::write(&user_file, "confirm = false\n").unwrap();

        let project = tmp.path().join("project");
        fs::create_dir_all(&project).unwrap();
        fs::write(project.join(PROJECT_CONFIG_FILE), "plan = 'plan.yaml'\n").unwrap();

        let config = Config::load_from(Some(&user_file), &project).unwrap();
        assert_eq!(config.plan.as_deref(), Some("plan.yaml"));
        assert_eq!(config.confirm, Some(false));
    }

    #[test]
    fn test_load_missing_files() {
        let tmp = TempDir::new().unwrap();
        let config = Config::load_from(Some(&tmp.path().join("none.toml")), tmp.path()).unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_load_invalid_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(PROJECT_CONFIG_FILE), "confirm = 'maybe'").unwrap();
        assert!(Config::load_from(None, tmp.path()).is_err());
    }

    #[test]
    fn test_plan_path_resolution() {
        let project = Path::new("/work/api");
        let config = Config::default();
        assert_eq!(
            config.plan_path(project, None),
            PathBuf::from("/work/api/project.devplan")
        );

        let config = Config {
            plan: Some("plans/next.devplan".into()),
            ..Config::default()
        };
        assert_eq!(
            config.plan_path(project, None),
            PathBuf::from("/work/api/plans/next.devplan")
        );
        assert_eq!(
            config.plan_path(project, Some(Path::new("/abs/p.devplan"))),
            PathBuf::from("/abs/p.devplan")
        );
    }
}
