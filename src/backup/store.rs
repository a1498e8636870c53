// ABOUTME: Filesystem backup store: directory allocation, manifests, pointer, listing and retention.
// ABOUTME: Backup directories are named `{environment}-{YYYYmmdd_HHMMSS}` under the backup root.

use super::BackupError;
use super::record::{BackupRecord, LastBackup, MANIFEST_FILE, POINTER_FILE};
use crate::types::Environment;
use chrono::{DateTime, Utc};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// One listed backup.
#[derive(Debug, Clone)]
pub struct BackupEntry {
    pub record: BackupRecord,
    /// Total size of the backup directory in bytes.
    pub size: u64,
    /// Whether the last-backup pointer references this backup.
    pub is_last: bool,
}

/// How many backups of an environment survive pruning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Retention {
    /// Newest backups kept.
    pub keep: usize,
    /// Backups older than this are removed even within `keep`.
    pub max_age: Option<Duration>,
}

#[derive(Debug, Clone)]
pub struct BackupStore {
    root: PathBuf,
}

impl BackupStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn pointer_path(&self) -> PathBuf {
        self.root.join(POINTER_FILE)
    }

    /// Directory name for a backup taken at `at`.
    pub fn dir_name(environment: Environment, at: DateTime<Utc>) -> String {
        format!("{}-{}", environment, at.format("%Y%m%d_%H%M%S"))
    }

    /// Create a fresh, empty backup directory.
    ///
    /// A second backup within the same second gets a numeric suffix.
    pub fn allocate(
        &self,
        environment: Environment,
        at: DateTime<Utc>,
    ) -> Result<PathBuf, BackupError> {
        std::fs::create_dir_all(&self.root).map_err(|e| BackupError::io(&self.root, e))?;

        let base = Self::dir_name(environment, at);
        for attempt in 0..100 {
            let name = if attempt == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, attempt)
            };
            let path = self.root.join(name);
            match std::fs::create_dir(&path) {
                Ok(()) => return Ok(path),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => continue,
                Err(e) => return Err(BackupError::io(&path, e)),
            }
        }
        Err(BackupError::io(
            self.root.join(base),
            std::io::Error::new(ErrorKind::AlreadyExists, "too many backups in one second"),
        ))
    }

    pub fn write_manifest(&self, record: &BackupRecord) -> Result<(), BackupError> {
        write_json(&record.path.join(MANIFEST_FILE), record)
    }

    pub fn read_manifest(&self, dir: &Path) -> Result<BackupRecord, BackupError> {
        let path = dir.join(MANIFEST_FILE);
        let content = std::fs::read_to_string(&path).map_err(|e| BackupError::io(&path, e))?;
        let mut record: BackupRecord =
            serde_json::from_str(&content).map_err(|e| BackupError::metadata(&path, e))?;
        // The directory may have been moved along with the whole backup root.
        record.path = dir.to_path_buf();
        Ok(record)
    }

    /// Point the last-backup record at `record`.
    pub fn record_last(&self, record: &BackupRecord) -> Result<(), BackupError> {
        write_json(&self.pointer_path(), &record.pointer())
    }

    /// The pointer, validated to reference an existing backup directory.
    pub fn last(&self) -> Result<LastBackup, BackupError> {
        let path = self.pointer_path();
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(BackupError::NoPointer(path));
            }
            Err(e) => return Err(BackupError::UnreadablePointer(path, e.to_string())),
        };

        let pointer: LastBackup = serde_json::from_str(&content)
            .map_err(|e| BackupError::UnreadablePointer(path, e.to_string()))?;

        if !pointer.path.is_dir() {
            return Err(BackupError::Missing(pointer.path));
        }
        Ok(pointer)
    }

    /// The record the pointer references.
    pub fn last_record(&self) -> Result<BackupRecord, BackupError> {
        let pointer = self.last()?;
        self.read_manifest(&pointer.path).map_err(|e| match e {
            BackupError::Io { .. } | BackupError::Metadata { .. } => {
                BackupError::UnreadablePointer(pointer.path.clone(), e.to_string())
            }
            other => other,
        })
    }

    /// Backups in the store, newest first, optionally for one environment.
    ///
    /// Directories without a readable manifest are skipped.
    pub fn list(&self, environment: Option<Environment>) -> Result<Vec<BackupEntry>, BackupError> {
        let dir = match std::fs::read_dir(&self.root) {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io(&self.root, e)),
        };
        let last = self.last().ok().map(|p| p.path);

        let mut entries = Vec::new();
        for entry in dir {
            let entry = entry.map_err(|e| BackupError::io(&self.root, e))?;
            let path = entry.path();
            if !path.is_dir() {
                continue;
            }

            let record = match self.read_manifest(&path) {
                Ok(record) => record,
                Err(e) => {
                    tracing::debug!("Skipping {}: {}", path.display(), e);
                    continue;
                }
            };
            if environment.is_some_and(|env| env != record.environment) {
                continue;
            }

            entries.push(BackupEntry {
                size: dir_size(&path),
                is_last: last.as_deref() == Some(path.as_path()),
                record,
            });
        }

        entries.sort_by(|a, b| b.record.created_at.cmp(&a.record.created_at));
        Ok(entries)
    }

    /// Delete backups of `environment` beyond the newest `retention.keep`,
    /// and any older than `retention.max_age` at `now`.
    ///
    /// The backup the pointer references is never deleted. Returns the
    /// removed directories.
    pub fn prune(
        &self,
        environment: Environment,
        retention: &Retention,
        now: DateTime<Utc>,
    ) -> Result<Vec<PathBuf>, BackupError> {
        let mut removed = Vec::new();
        for (index, entry) in self.list(Some(environment))?.into_iter().enumerate() {
            let expired = retention.max_age.is_some_and(|max_age| {
                (now - entry.record.created_at)
                    .to_std()
                    .is_ok_and(|age| age > max_age)
            });
            if entry.is_last || (index < retention.keep && !expired) {
                continue;
            }
            let path = entry.record.path;
            std::fs::remove_dir_all(&path).map_err(|e| BackupError::io(&path, e))?;
            tracing::debug!("Removed old backup {}", path.display());
            removed.push(path);
        }
        Ok(removed)
    }
}

/// Write JSON via a temporary file and rename so readers never see a partial file.
fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<(), BackupError> {
    let json = serde_json::to_string_pretty(value).map_err(|e| BackupError::metadata(path, e))?;
    let tmp = path.with_extension("json.tmp");
    std::fs::write(&tmp, json).map_err(|e| BackupError::io(&tmp, e))?;
    std::fs::rename(&tmp, path).map_err(|e| BackupError::io(path, e))
}

fn dir_size(path: &Path) -> u64 {
    let Ok(entries) = std::fs::read_dir(path) else {
        return 0;
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| match e.metadata() {
            Ok(meta) if meta.is_dir() => dir_size(&e.path()),
            Ok(meta) => meta.len(),
            Err(_) => 0,
        })
        .sum()
}
