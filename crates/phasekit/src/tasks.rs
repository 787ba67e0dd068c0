//! Task handlers
//!
//! A phase lists task identifiers. Each identifier is looked up in a
//! [`TaskRegistry`]; identifiers with no handler are accepted and only
//! produce an `Executed task: <id>` record.

use crate::context::ContentProvider;
use crate::error::{Error, Result};
use crate::plan::PlanDocument;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

/// Everything a task handler may consult while running
pub struct TaskContext<'a> {
    pub project_dir: &'a Path,
    pub document: &'a PlanDocument,
    pub phase: &'a str,
    pub content: &'a dyn ContentProvider,
}

impl TaskContext<'_> {
    /// Ensure a directory exists under the project root
    ///
    /// The change is reported whether or not the directory was already there.
    pub fn create_dir(&self, relative: &str) -> Result<String> {
        let path = self.project_dir.join(relative);
        fs::create_dir_all(&path).map_err(|e| Error::io(&path, e))?;
        Ok(format!("Created directory: {relative}"))
    }

    /// Write a generated file unless it already exists
    pub fn create_file(
        &self,
        relative: &str,
        file_type: &str,
        template: &str,
    ) -> Result<Option<String>> {
        let path = self.project_dir.join(relative);
        if path.exists() {
            log::debug!("Keeping existing {}", relative);
            return Ok(None);
        }

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let body = self.content.generate_content(relative, file_type, template);
        fs::write(&path, body).map_err(|e| Error::io(&path, e))?;
        Ok(Some(format!("Created: {relative}")))
    }
}

/// A unit of work invoked by task identifier
pub trait TaskHandler: Send + Sync {
    /// Run the task and return the changes it made
    fn run(&self, ctx: &TaskContext<'_>) -> Result<Vec<String>>;
}

impl<F> TaskHandler for F
where
    F: Fn(&TaskContext<'_>) -> Result<Vec<String>> + Send + Sync,
{
    fn run(&self, ctx: &TaskContext<'_>) -> Result<Vec<String>> {
        self(ctx)
    }
}

/// A built-in scaffolding task: directories to ensure, then files to create
#[derive(Debug, Clone, Copy)]
pub struct Scaffold {
    dirs: &'static [&'static str],
    /// `(path, type, template)`
    files: &'static [(&'static str, &'static str, &'static str)],
}

impl TaskHandler for Scaffold {
    fn run(&self, ctx: &TaskContext<'_>) -> Result<Vec<String>> {
        let mut changes = Vec::new();
        for dir in self.dirs {
            changes.push(ctx.create_dir(dir)?);
        }
        for (path, file_type, template) in self.files {
            changes.extend(ctx.create_file(path, file_type, template)?);
        }
        Ok(changes)
    }
}

/// Built-in task table
pub const BUILTIN_TASKS: &[(&str, Scaffold)] = &[
    (
        "setup_project_structure",
        Scaffold {
            dirs: &["src", "tests", "docs"],
            files: &[],
        },
    ),
    (
        "install_dependencies",
        Scaffold {
            dirs: &[],
            files: &[("requirements.txt", "dependencies", "requirements")],
        },
    ),
    (
        "create_models",
        Scaffold {
            dirs: &[],
            files: &[("src/models/models.py", "models", "fastapi_model")],
        },
    ),
    (
        "create_endpoints",
        Scaffold {
            dirs: &[],
            files: &[("src/routes/main.py", "router", "fastapi_router")],
        },
    ),
    (
        "implement_jwt",
        Scaffold {
            dirs: &[],
            files: &[("src/auth/jwt.py", "auth", "jwt_auth")],
        },
    ),
    (
        "add_auth_middleware",
        Scaffold {
            dirs: &[],
            files: &[("src/middleware/auth.py", "middleware", "auth_middleware")],
        },
    ),
    (
        "setup_testing",
        Scaffold {
            dirs: &[],
            files: &[
                ("tests/test_main.py", "test", "pytest_main"),
                ("tests/conftest.py", "test", "pytest_conftest"),
            ],
        },
    ),
];

/// Maps task identifiers to handlers
pub struct TaskRegistry {
    handlers: HashMap<String, Box<dyn TaskHandler>>,
}

impl TaskRegistry {
    /// A registry with no handlers; every task is a placeholder
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// A registry preloaded with [`BUILTIN_TASKS`]
    pub fn builtin() -> Self {
        let mut registry = Self::empty();
        for (name, scaffold) in BUILTIN_TASKS {
            registry.register(*name, *scaffold);
        }
        registry
    }

    /// Register or replace the handler for `name`
    pub fn register(&mut self, name: impl Into<String>, handler: impl TaskHandler + 'static) {
        self.handlers.insert(name.into(), Box::new(handler));
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered task identifiers, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run `task`, falling back to a placeholder record for unknown ids
    pub fn run(&self, task: &str, ctx: &TaskContext<'_>) -> Result<Vec<String>> {
        match self.handlers.get(task) {
            Some(handler) => {
                log::debug!("Running task {} in phase {}", task, ctx.phase);
                handler.run(ctx)
            }
            None => {
                log::debug!("No handler for task {}, recording placeholder", task);
                Ok(vec![format!("Executed task: {task}")])
            }
        }
    }
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for TaskRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskRegistry")
            .field("handlers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::templates::BuiltinTemplates;
    use tempfile::TempDir;

    const PLAN: &str = "project: demo\ntarget_state: {}\nresources: {}\nphases: {}\n";

    fn run_task(registry: &TaskRegistry, root: &Path, task: &str) -> Result<Vec<String>> {
        let document = PlanDocument::from_yaml(PLAN).unwrap();
        let ctx = TaskContext {
            project_dir: root,
            document: &document,
            phase: "setup",
            content: &BuiltinTemplates,
        };
        registry.run(task, &ctx)
    }

    #[test]
    fn test_unknown_task_is_placeholder() {
        let tmp = TempDir::new().unwrap();
        let changes = run_task(&TaskRegistry::builtin(), tmp.path(), "deploy_to_mars").unwrap();
        assert_eq!(changes, vec!["Executed task: deploy_to_mars"]);
        assert_eq!(std::fs::read_dir(tmp.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_setup_project_structure() {
        let tmp = TempDir::new().unwrap();
        let registry = TaskRegistry::builtin();

        let changes = run_task(&registry, tmp.path(), "setup_project_structure").unwrap();
        assert_eq!(
            changes,
            vec![
                "Created directory: src",
                "Created directory: tests",
                "Created directory: docs"
            ]
        );
        assert!(tmp.path().join("docs").is_dir());

        std::fs::write(tmp.path().join("src/keep.py"), "x").unwrap();
        let again = run_task(&registry, tmp.path(), "setup_project_structure").unwrap();
        assert_eq!(again, changes);
        assert!(tmp.path().join("src/keep.py").exists());
    }

    #[test]
    fn test_builtin_file_task_does_not_overwrite() {
        let tmp = TempDir::new().unwrap();
        let registry = TaskRegistry::builtin();

        let changes = run_task(&registry, tmp.path(), "implement_jwt").unwrap();
        assert_eq!(changes, vec!["Created: src/auth/jwt.py"]);
        let jwt = tmp.path().join("src/auth/jwt.py");
        assert!(std::fs::read_to_string(&jwt).unwrap().contains("create_access_token"));

        std::fs::write(&jwt, "custom").unwrap();
        let changes = run_task(&registry, tmp.path(), "implement_jwt").unwrap();
        assert!(changes.is_empty());
        assert_eq!(std::fs::read_to_string(&jwt).unwrap(), "custom");
    }

    #[test]
    fn test_setup_testing_creates_both_files() {
        let tmp = TempDir::new().unwrap();
        let changes = run_task(&TaskRegistry::builtin(), tmp.path(), "setup_testing").unwrap();
        assert_eq!(
            changes,
            vec!["Created: tests/test_main.py", "Created: tests/conftest.py"]
        );
    }

    fn custom_models(ctx: &TaskContext<'_>) -> Result<Vec<String>> {
        Ok(vec![format!("custom models in {}", ctx.phase)])
    }

    fn explode(_: &TaskContext<'_>) -> Result<Vec<String>> {
        Err(Error::task("explode", "boom"))
    }

    #[test]
    fn test_custom_handler_overrides() {
        let tmp = TempDir::new().unwrap();
        let mut registry = TaskRegistry::builtin();
        registry.register("create_models", custom_models);
        registry.register("explode", explode);

        let changes = run_task(&registry, tmp.path(), "create_models").unwrap();
        assert_eq!(changes, vec!["custom models in setup"]);

        let err = run_task(&registry, tmp.path(), "explode").unwrap_err();
        assert!(matches!(err, Error::Task { .. }));
    }

    #[test]
    fn test_builtin_names() {
        let registry = TaskRegistry::builtin();
        assert_eq!(registry.names().len(), BUILTIN_TASKS.len());
        assert!(registry.contains("install_dependencies"));
        assert!(!TaskRegistry::empty().contains("install_dependencies"));
    }
}
