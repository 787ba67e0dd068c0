//! Snapshot manager - full-tree captures of a project for rollback
//!
//! Layout under the project root:
//!
//! ```text
//! .devstate/
//! ├── snapshots.json            index: id -> record
//! └── snapshots/
//!     └── snapshot-<stamp>-<hash>/
//!         ├── metadata.json     the same record
//!         └── tree/             filtered copy of the project tree
//! ```
//!
//! Every capture is a full copy; there is no deduplication. Restoring first
//! takes an automatic backup of the current tree so the restore itself can
//! be undone.

use crate::error::{Error, Result};
use chrono::{DateTime, Local, Utc};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use walkdir::WalkDir;

/// Directory under the project root holding all snapshot state
pub const STATE_DIR: &str = ".devstate";

const SNAPSHOTS_DIR: &str = "snapshots";
const INDEX_FILE: &str = "snapshots.json";
const METADATA_FILE: &str = "metadata.json";
const TREE_DIR: &str = "tree";

/// Description given to the backup taken before every restore
pub const RESTORE_BACKUP_DESCRIPTION: &str = "Auto-backup before restoration";

/// Names never captured: VCS metadata, dependency and cache directories
pub const DEFAULT_EXCLUDES: &[&str] = &[
    STATE_DIR,
    ".git",
    "__pycache__",
    ".pytest_cache",
    ".venv",
    "node_modules",
    ".DS_Store",
    "*.pyc",
];

static ID_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Metadata for one snapshot, stored in the index and next to the copy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotRecord {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub file_count: u64,
    pub total_size: u64,
    pub created_at: DateTime<Utc>,
    /// Relative paths (files and directories) captured, in walk order
    #[serde(default)]
    pub project_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restored_at: Option<DateTime<Utc>>,
    /// Id of the backup taken when this snapshot was last restored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backup_created: Option<String>,
}

/// A snapshot record together with where it lives on disk
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotInfo {
    #[serde(flatten)]
    pub record: SnapshotRecord,
    pub directory: PathBuf,
}

/// Outcome of a successful restore
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RestoreReport {
    pub snapshot_id: String,
    /// Snapshot of the tree as it was right before the restore
    pub backup_id: String,
    pub restored_entries: usize,
}

type SnapshotIndex = BTreeMap<String, SnapshotRecord>;

/// Name and extension based exclusion rules
#[derive(Debug, Clone)]
struct ExcludeSet {
    names: Vec<String>,
    extensions: Vec<String>,
}

impl ExcludeSet {
    fn new<I, S>(patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut set = Self {
            names: Vec::new(),
            extensions: Vec::new(),
        };
        set.extend(patterns);
        set
    }

    fn extend<I, S>(&mut self, patterns: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for pattern in patterns {
            let pattern = pattern.as_ref().trim();
            if pattern.is_empty() {
                continue;
            }
            match pattern.strip_prefix("*.") {
                Some(ext) => self.extensions.push(ext.to_string()),
                None => self.names.push(pattern.to_string()),
            }
        }
    }

    fn matches(&self, name: &OsStr) -> bool {
        let Some(name) = name.to_str() else {
            return false;
        };
        if self.names.iter().any(|n| n == name) {
            return true;
        }
        Path::new(name)
            .extension()
            .and_then(OsStr::to_str)
            .is_some_and(|ext| self.extensions.iter().any(|e| e == ext))
    }
}

enum EntryKind {
    Dir,
    File { size: u64 },
}

struct TreeEntry {
    source: PathBuf,
    relative: String,
    kind: EntryKind,
}

/// Captures and restores the state of one project directory
#[derive(Debug, Clone)]
pub struct SnapshotManager {
    project_dir: PathBuf,
    excludes: ExcludeSet,
}

impl SnapshotManager {
    /// Create a manager for `project_dir`; nothing is written until the first capture
    pub fn new(project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_dir: project_dir.into(),
            excludes: ExcludeSet::new(DEFAULT_EXCLUDES),
        }
    }

    /// Add names (or `*.ext` patterns) to the exclusion set
    pub fn with_excludes<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.excludes.extend(patterns);
        self
    }

    pub fn project_dir(&self) -> &Path {
        &self.project_dir
    }

    pub fn state_dir(&self) -> PathBuf {
        self.project_dir.join(STATE_DIR)
    }

    pub fn snapshots_dir(&self) -> PathBuf {
        self.state_dir().join(SNAPSHOTS_DIR)
    }

    pub fn index_path(&self) -> PathBuf {
        self.state_dir().join(INDEX_FILE)
    }

    /// Whether any component of the project-relative `path` is excluded
    /// from capture
    pub fn is_excluded(&self, path: &Path) -> bool {
        path.components()
            .any(|c| matches!(c, Component::Normal(name) if self.excludes.matches(name)))
    }

    fn snapshot_dir(&self, id: &str) -> PathBuf {
        self.snapshots_dir().join(id)
    }

    // ========================================================================
    // Public operations
    // ========================================================================

    /// Capture the current project tree and return the new snapshot id
    pub fn create_snapshot(&self, description: &str) -> Result<String> {
        self.ensure_layout()?;

        let id = self.generate_id();
        let dir = self.snapshot_dir(&id);
        fs::create_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;

        match self.write_snapshot(&id, &dir, description) {
            Ok(record) => {
                log::info!(
                    "Created snapshot {} ({} files, {} bytes)",
                    id,
                    record.file_count,
                    record.total_size
                );
                Ok(id)
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_dir_all(&dir) {
                    log::warn!("Failed to remove partial snapshot {}: {}", id, cleanup);
                }
                Err(e)
            }
        }
    }

    /// Replace the project tree with the contents of snapshot `id`
    ///
    /// A backup of the current tree is taken first. A failure after the
    /// backup can leave the tree partially restored; the backup id is logged
    /// so the previous state can be recovered by hand.
    pub fn restore_snapshot(&self, id: &str) -> Result<RestoreReport> {
        validate_id(id)?;

        let dir = self.snapshot_dir(id);
        if !dir.is_dir() {
            return Err(Error::SnapshotNotFound(id.to_string()));
        }

        self.restore_from(id, &dir)
            .inspect_err(|e| log::error!("Failed to restore snapshot {}: {}", id, e))
    }

    /// All snapshots in the index, newest first
    pub fn list_snapshots(&self) -> Result<Vec<SnapshotRecord>> {
        let mut snapshots: Vec<SnapshotRecord> = self.load_index()?.into_values().collect();
        snapshots.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(snapshots)
    }

    /// Delete snapshot `id`; returns `false` when it does not exist
    pub fn delete_snapshot(&self, id: &str) -> Result<bool> {
        validate_id(id)?;

        let dir = self.snapshot_dir(id);
        if !dir.exists() {
            return Ok(false);
        }

        fs::remove_dir_all(&dir).map_err(|e| Error::io(&dir, e))?;
        self.update_index(|index| {
            index.remove(id);
        })?;

        log::info!("Deleted snapshot {}", id);
        Ok(true)
    }

    /// Record and location of snapshot `id`, read from its own metadata file
    pub fn get_snapshot_info(&self, id: &str) -> Result<Option<SnapshotInfo>> {
        validate_id(id)?;

        let dir = self.snapshot_dir(id);
        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.is_file() {
            return Ok(None);
        }

        let mut record: SnapshotRecord = read_json(&metadata_path)?;
        record.id = id.to_string();
        Ok(Some(SnapshotInfo {
            record,
            directory: dir,
        }))
    }

    // ========================================================================
    // Capture
    // ========================================================================

    fn write_snapshot(&self, id: &str, dir: &Path, description: &str) -> Result<SnapshotRecord> {
        let entries = self.collect_entries()?;
        let tree = dir.join(TREE_DIR);
        fs::create_dir_all(&tree).map_err(|e| Error::io(&tree, e))?;
        copy_entries(&entries, &tree)?;

        let (file_count, total_size) = entries.iter().fold((0u64, 0u64), |(n, size), e| {
            match e.kind {
                EntryKind::File { size: s } => (n + 1, size + s),
                EntryKind::Dir => (n, size),
            }
        });

        let record = SnapshotRecord {
            id: id.to_string(),
            description: description.to_string(),
            file_count,
            total_size,
            created_at: Utc::now(),
            project_files: entries.into_iter().map(|e| e.relative).collect(),
            restored_at: None,
            backup_created: None,
        };

        write_json(&dir.join(METADATA_FILE), &record)?;
        self.update_index(|index| {
            index.insert(id.to_string(), record.clone());
        })?;

        Ok(record)
    }

    /// Walk the project in sorted order, pruning excluded entries
    fn collect_entries(&self) -> Result<Vec<TreeEntry>> {
        let mut entries = Vec::new();

        let walker = WalkDir::new(&self.project_dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !self.excludes.matches(e.file_name()));

        for entry in walker {
            let entry = entry.map_err(walk_error)?;
            let path = entry.path();
            let relative = relative_key(path.strip_prefix(&self.project_dir).unwrap_or(path));

            let kind = if entry.file_type().is_dir() {
                EntryKind::Dir
            } else {
                // Symlinks are captured as the content they point to
                match fs::metadata(path) {
                    Ok(meta) if meta.is_file() => EntryKind::File { size: meta.len() },
                    Ok(_) => {
                        log::warn!("Skipping {}: not a regular file", relative);
                        continue;
                    }
                    Err(e) if entry.path_is_symlink() => {
                        log::warn!("Skipping dangling symlink {}: {}", relative, e);
                        continue;
                    }
                    Err(e) => return Err(Error::io(path, e)),
                }
            };

            entries.push(TreeEntry {
                source: path.to_path_buf(),
                relative,
                kind,
            });
        }

        Ok(entries)
    }

    // ========================================================================
    // Restore
    // ========================================================================

    fn restore_from(&self, id: &str, dir: &Path) -> Result<RestoreReport> {
        let metadata_path = dir.join(METADATA_FILE);
        if !metadata_path.is_file() {
            return Err(Error::SnapshotCorrupt {
                id: id.to_string(),
                reason: format!("{} is missing", METADATA_FILE),
            });
        }
        let record: SnapshotRecord =
            read_json(&metadata_path).map_err(|e| Error::SnapshotCorrupt {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        let backup_id = self.create_snapshot(RESTORE_BACKUP_DESCRIPTION)?;
        log::info!("Backed up current state as {} before restoring {}", backup_id, id);

        self.clear_project()?;
        let restored_entries = self.materialize(&dir.join(TREE_DIR), &record.project_files)?;

        let restored_at = Utc::now();
        self.update_index(|index| {
            if let Some(entry) = index.get_mut(id) {
                entry.restored_at = Some(restored_at);
                entry.backup_created = Some(backup_id.clone());
            }
        })?;

        let mut record = record;
        record.restored_at = Some(restored_at);
        record.backup_created = Some(backup_id.clone());
        write_json(&metadata_path, &record)?;

        log::info!("Restored snapshot {} ({} entries)", id, restored_entries);
        Ok(RestoreReport {
            snapshot_id: id.to_string(),
            backup_id,
            restored_entries,
        })
    }

    /// Remove every captured entry from the project, at any depth
    ///
    /// Excluded entries (the state directory, VCS metadata, caches) were never
    /// captured, so they are left in place together with the directories
    /// that contain them.
    fn clear_project(&self) -> Result<()> {
        let walker = WalkDir::new(&self.project_dir)
            .min_depth(1)
            .follow_links(false)
            .into_iter()
            .filter_entry(|e| !self.excludes.matches(e.file_name()));

        let mut entries = Vec::new();
        for entry in walker {
            entries.push(entry.map_err(walk_error)?);
        }

        // Pre-order reversed: children are handled before their parent
        for entry in entries.iter().rev() {
            let path = entry.path();
            if entry.file_type().is_dir() {
                if is_empty_dir(path)? {
                    fs::remove_dir(path).map_err(|e| Error::io(path, e))?;
                } else {
                    log::debug!("Keeping {}: holds excluded entries", path.display());
                }
            } else {
                fs::remove_file(path).map_err(|e| Error::io(path, e))?;
            }
        }

        Ok(())
    }

    /// Recreate the recorded entries: directories first, then files
    fn materialize(&self, snapshot_dir: &Path, project_files: &[String]) -> Result<usize> {
        let (dirs, files): (Vec<&String>, Vec<&String>) = project_files
            .iter()
            .partition(|rel| snapshot_dir.join(rel.as_str()).is_dir());

        let mut restored = 0;

        for rel in dirs {
            let target = self.project_dir.join(rel.as_str());
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
            restored += 1;
        }

        for rel in files {
            let source = snapshot_dir.join(rel.as_str());
            if !source.exists() {
                log::warn!("Snapshot entry {} is missing, skipping", rel);
                continue;
            }

            let target = self.project_dir.join(rel.as_str());
            if let Some(parent) = target.parent() {
                fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
            }
            fs::copy(&source, &target).map_err(|e| Error::io(&target, e))?;
            restored += 1;
        }

        Ok(restored)
    }

    // ========================================================================
    // Index
    // ========================================================================

    fn ensure_layout(&self) -> Result<()> {
        let snapshots_dir = self.snapshots_dir();
        fs::create_dir_all(&snapshots_dir).map_err(|e| Error::io(&snapshots_dir, e))?;

        let index = self.index_path();
        if !index.exists() {
            write_json(&index, &SnapshotIndex::new())?;
        }
        Ok(())
    }

    fn load_index(&self) -> Result<SnapshotIndex> {
        let path = self.index_path();
        if !path.exists() {
            return Ok(SnapshotIndex::new());
        }

        let mut index: SnapshotIndex = read_json(&path)?;
        for (id, record) in &mut index {
            record.id.clone_from(id);
        }
        Ok(index)
    }

    fn update_index<F>(&self, update: F) -> Result<()>
    where
        F: FnOnce(&mut SnapshotIndex),
    {
        let mut index = self.load_index()?;
        update(&mut index);
        write_json(&self.index_path(), &index)
    }

    /// `snapshot-<YYYYmmdd-HHMMSS>-<8 hex>`; the hash input includes a
    /// nanosecond timestamp, the pid and a counter so rapid calls differ
    fn generate_id(&self) -> String {
        loop {
            let now = Local::now();
            let seed = format!(
                "{}-{}-{}",
                now.timestamp_nanos_opt().unwrap_or_default(),
                std::process::id(),
                ID_COUNTER.fetch_add(1, Ordering::Relaxed)
            );
            let hash = blake3::hash(seed.as_bytes()).to_hex();
            let id = format!(
                "snapshot-{}-{}",
                now.format("%Y%m%d-%H%M%S"),
                &hash.as_str()[..8]
            );

            if !self.snapshot_dir(&id).exists() {
                return id;
            }
        }
    }
}

/// Reject ids that could address anything outside the snapshots directory
fn validate_id(id: &str) -> Result<()> {
    if id.is_empty() || id == "." || id == ".." || id.contains(['/', '\\']) {
        return Err(Error::InvalidSnapshotId(id.to_string()));
    }
    Ok(())
}

/// Relative path with `/` separators, independent of platform
fn relative_key(rel: &Path) -> String {
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Create the directory skeleton, then copy files in parallel
fn copy_entries(entries: &[TreeEntry], dest: &Path) -> Result<()> {
    for entry in entries {
        if matches!(entry.kind, EntryKind::Dir) {
            let target = dest.join(&entry.relative);
            fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;
        }
    }

    entries
        .par_iter()
        .filter(|e| matches!(e.kind, EntryKind::File { .. }))
        .try_for_each(|entry| {
            let target = dest.join(&entry.relative);
            log::debug!("Copying {}", entry.relative);
            fs::copy(&entry.source, &target)
                .map(|_| ())
                .map_err(|e| Error::io(&entry.source, e))
        })
}

fn is_empty_dir(path: &Path) -> Result<bool> {
    let mut read = fs::read_dir(path).map_err(|e| Error::io(path, e))?;
    Ok(read.next().is_none())
}

fn walk_error(err: walkdir::Error) -> Error {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    let source = err
        .into_io_error()
        .unwrap_or_else(|| io::Error::other("filesystem loop detected"));
    Error::io(path, source)
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    Ok(serde_json::from_str(&content)?)
}

/// Write through a sibling temp file so readers never see a partial file
fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value)?;
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(|e| Error::io(&tmp, e))?;
    fs::rename(&tmp, path).map_err(|e| Error::io(path, e))
}
