//! Plan document loading
//!
//! A plan is a YAML document with four required top-level sections:
//! `project`, `target_state`, `resources` and `phases`. The document is kept
//! loosely typed so the resolver can apply its lenient coercions (skipping
//! malformed phases, defaulting priorities) instead of rejecting the plan.

use crate::error::{Error, Result};
use serde::Serialize;
use serde_json::{Map, Value};
use std::fs;
use std::path::{Component, Path, PathBuf};

/// Top-level sections every plan must declare
pub const REQUIRED_SECTIONS: [&str; 4] = ["project", "target_state", "resources", "phases"];

/// Default `type` for file resources that omit it
pub const DEFAULT_FILE_TYPE: &str = "file";

/// Default `template` for file resources that omit it
pub const DEFAULT_TEMPLATE: &str = "basic";

/// A parsed plan document
#[derive(Debug, Clone)]
pub struct PlanDocument {
    root: Map<String, Value>,
    source: Option<PathBuf>,
}

impl PlanDocument {
    /// Load and structurally validate a plan file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::PlanNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        let mut doc = Self::parse(&content, path)?;
        doc.source = Some(path.to_path_buf());

        log::debug!("Loaded plan from {}", path.display());
        Ok(doc)
    }

    /// Parse a plan from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        Self::parse(content, Path::new("<inline>"))
    }

    /// Build a plan from an already parsed value
    pub fn from_value(value: Value) -> Result<Self> {
        let Value::Object(root) = value else {
            return Err(Error::InvalidPlan(
                "plan root must be a mapping of sections".to_string(),
            ));
        };

        for section in REQUIRED_SECTIONS {
            if !root.contains_key(section) {
                return Err(Error::MissingSection(section.to_string()));
            }
        }

        Ok(Self { root, source: None })
    }

    fn parse(content: &str, path: &Path) -> Result<Self> {
        let value: Value = serde_yaml::from_str(content).map_err(|source| Error::PlanParse {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(value)
    }

    /// Path the plan was loaded from, if any
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Raw access to a top-level section
    pub fn section(&self, name: &str) -> Option<&Value> {
        self.root.get(name)
    }

    /// Project name, from `project: name` or `project: { name: ... }`
    pub fn project_name(&self) -> Option<&str> {
        match self.root.get("project")? {
            Value::String(name) => Some(name),
            Value::Object(project) => project.get("name").and_then(Value::as_str),
            _ => None,
        }
    }

    /// The `phases` mapping; anything else is treated as no phases
    pub fn phases(&self) -> Option<&Map<String, Value>> {
        self.root.get("phases").and_then(Value::as_object)
    }

    /// Declared file resources from `resources.files`
    ///
    /// Entries that are not mappings or lack a string `path` are ignored.
    pub fn file_resources(&self) -> Vec<FileResource> {
        let Some(files) = self
            .root
            .get("resources")
            .and_then(|r| r.get("files"))
            .and_then(Value::as_array)
        else {
            return Vec::new();
        };

        files.iter().filter_map(FileResource::from_value).collect()
    }
}

/// A `(path, type, template)` file declaration
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileResource {
    pub path: String,
    pub file_type: String,
    pub template: String,
    /// Restricts materialization to one phase; `None` means every phase pass
    pub phase: Option<String>,
}

impl FileResource {
    pub fn new(path: impl Into<String>, file_type: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            file_type: file_type.into(),
            template: template.into(),
            phase: None,
        }
    }

    fn from_value(value: &Value) -> Option<Self> {
        let entry = value.as_object()?;
        let path = entry.get("path")?.as_str()?;
        let text = |key: &str, default: &str| {
            entry
                .get(key)
                .and_then(Value::as_str)
                .unwrap_or(default)
                .to_string()
        };

        Some(Self {
            path: path.to_string(),
            file_type: text("type", DEFAULT_FILE_TYPE),
            template: text("template", DEFAULT_TEMPLATE),
            phase: entry.get("phase").and_then(Value::as_str).map(String::from),
        })
    }

    /// Whether this file is materialized during `phase`'s pass
    pub fn applies_to(&self, phase: &str) -> bool {
        self.phase.as_deref().is_none_or(|p| p == phase)
    }

    /// The path relative to the project root, rejecting anything that escapes it
    pub fn relative_path(&self) -> Result<PathBuf> {
        let path = Path::new(&self.path);
        let escapes = path.components().any(|c| {
            matches!(
                c,
                Component::ParentDir | Component::RootDir | Component::Prefix(_)
            )
        });

        if self.path.trim().is_empty() || escapes {
            return Err(Error::InvalidPlan(format!(
                "file resource path must stay inside the project: '{}'",
                self.path
            )));
        }

        Ok(path.to_path_buf())
    }
}
