// ABOUTME: Persisted backup metadata: per-backup manifest and the last-backup pointer.
// ABOUTME: Both are JSON; paths of captured files are kept relative to the project directory.

use crate::config::DatabaseConfig;
use crate::types::Environment;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Manifest file written inside every backup directory.
pub const MANIFEST_FILE: &str = "manifest.json";

/// Pointer file at the backup root naming the most recent backup.
pub const POINTER_FILE: &str = "last_backup.json";

pub(crate) const DATABASE_DUMP_FILE: &str = "database.sql";
pub(crate) const DATA_ARCHIVE_FILE: &str = "data.tar.gz";

/// The most recent successful backup. Overwritten, never versioned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LastBackup {
    pub path: PathBuf,
    pub environment: Environment,
    pub created_at: DateTime<Utc>,
}

/// A configuration file copied into a backup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedFile {
    /// File name inside the backup directory.
    pub name: String,
    /// Where it came from, relative to the project directory when possible.
    pub original: PathBuf,
}

/// SQL dump of the application database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseDump {
    pub file: String,
    pub database: DatabaseConfig,
}

/// Gzip tar archive of the application data directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataArchive {
    pub file: String,
    /// Archived directory, relative to the project directory.
    pub source: PathBuf,
}

/// Point-in-time copy taken before a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupRecord {
    pub path: PathBuf,
    pub environment: Environment,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub files: Vec<SavedFile>,
    #[serde(default)]
    pub database: Option<DatabaseDump>,
    #[serde(default)]
    pub data: Option<DataArchive>,
}

impl BackupRecord {
    pub fn new(path: PathBuf, environment: Environment, created_at: DateTime<Utc>) -> Self {
        Self {
            path,
            environment,
            created_at,
            files: Vec::new(),
            database: None,
            data: None,
        }
    }

    /// Pointer referencing this backup.
    pub fn pointer(&self) -> LastBackup {
        LastBackup {
            path: self.path.clone(),
            environment: self.environment,
            created_at: self.created_at,
        }
    }

    /// Names of everything captured, in capture order.
    pub fn artifacts(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.files.iter().map(|f| f.name.as_str()).collect();
        if let Some(db) = &self.database {
            names.push(&db.file);
        }
        if let Some(data) = &self.data {
            names.push(&data.file);
        }
        names
    }

    /// Absolute path of a captured artifact.
    pub fn artifact_path(&self, name: &str) -> PathBuf {
        self.path.join(name)
    }

    /// Directory name of this backup.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }
}

/// Path relative to `base` when it lies underneath, else unchanged.
pub(crate) fn relative_to(path: &Path, base: &Path) -> PathBuf {
    path.strip_prefix(base)
        .map(Path::to_path_buf)
        .unwrap_or_else(|_| path.to_path_buf())
}
