// ABOUTME: Pre-deployment backups: capture, restore, listing and retention.
// ABOUTME: Production backups add a database dump and a data-directory archive.

mod archive;
mod record;
mod store;

pub use record::{
    BackupRecord, DataArchive, DatabaseDump, LastBackup, MANIFEST_FILE, POINTER_FILE, SavedFile,
};
pub use store::{BackupEntry, BackupStore, Retention};

use crate::config::{Config, DatabaseConfig, EnvironmentSettings};
use crate::runtime::{EngineError, ServiceManager, Topology};
use crate::types::Environment;
use chrono::Utc;
use record::{DATA_ARCHIVE_FILE, DATABASE_DUMP_FILE, relative_to};
use std::path::{Path, PathBuf};

/// Errors from backup capture, restore and bookkeeping.
#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("invalid backup metadata in {path}: {source}")]
    Metadata {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("no backup recorded ({0} does not exist)")]
    NoPointer(PathBuf),

    #[error("backup record {0} is unreadable: {1}")]
    UnreadablePointer(PathBuf, String),

    #[error("recorded backup {0} no longer exists")]
    Missing(PathBuf),

    #[error("database {action} failed: {source}")]
    Database {
        action: &'static str,
        source: EngineError,
    },
}

impl BackupError {
    pub(crate) fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        BackupError::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn metadata(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        BackupError::Metadata {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// True when there is no usable last backup to roll back to.
    pub fn is_missing_backup(&self) -> bool {
        matches!(
            self,
            BackupError::NoPointer(_) | BackupError::UnreadablePointer(..) | BackupError::Missing(_)
        )
    }
}

/// What a backup of one environment captures.
#[derive(Debug, Clone)]
pub struct BackupPlan {
    pub environment: Environment,
    pub project_dir: PathBuf,
    /// Configuration files to copy; absent optional files are skipped.
    pub files: Vec<PathBuf>,
    pub database: Option<DatabaseConfig>,
    /// Data directory, relative to the project directory.
    pub data_dir: Option<PathBuf>,
}

impl BackupPlan {
    /// Settings file, compose file and orchestrator config; production adds
    /// the database and data directory.
    pub fn for_environment(config: &Config, settings: &EnvironmentSettings) -> Self {
        let mut files = vec![settings.settings_file.clone(), settings.compose_file.clone()];
        if let Some(path) = Config::find(&settings.project_dir) {
            files.push(path);
        }

        let production = settings.environment.is_production();
        Self {
            environment: settings.environment,
            project_dir: settings.project_dir.clone(),
            files,
            database: config.backup.database.clone().filter(|_| production),
            data_dir: config.backup.data_dir.clone().filter(|_| production),
        }
    }
}

/// Take a backup according to `plan` and record it as the last backup.
///
/// A failed capture removes the partial directory and leaves the pointer untouched.
pub async fn capture(
    store: &BackupStore,
    plan: &BackupPlan,
    services: &dyn ServiceManager,
    topology: &Topology,
) -> Result<BackupRecord, BackupError> {
    let now = Utc::now();
    let dir = store.allocate(plan.environment, now)?;
    let mut record = BackupRecord::new(dir.clone(), plan.environment, now);

    match fill(store, plan, services, topology, &mut record).await {
        Ok(()) => {
            store.record_last(&record)?;
            tracing::debug!("Backup recorded at {}", dir.display());
            Ok(record)
        }
        Err(e) => {
            if let Err(cleanup) = std::fs::remove_dir_all(&dir) {
                tracing::warn!("Failed to remove partial backup {}: {}", dir.display(), cleanup);
            }
            Err(e)
        }
    }
}

async fn fill(
    store: &BackupStore,
    plan: &BackupPlan,
    services: &dyn ServiceManager,
    topology: &Topology,
    record: &mut BackupRecord,
) -> Result<(), BackupError> {
    for source in &plan.files {
        if !source.is_file() {
            tracing::debug!("Not backing up {} (absent)", source.display());
            continue;
        }
        let name = unique_name(record, source);
        let dest = record.path.join(&name);
        std::fs::copy(source, &dest).map_err(|e| BackupError::io(source, e))?;
        record.files.push(SavedFile {
            name,
            original: relative_to(source, &plan.project_dir),
        });
    }

    if let Some(database) = &plan.database {
        let dest = record.path.join(DATABASE_DUMP_FILE);
        services
            .dump_database(topology, database, &dest)
            .await
            .map_err(|source| BackupError::Database {
                action: "dump",
                source,
            })?;
        record.database = Some(DatabaseDump {
            file: DATABASE_DUMP_FILE.to_string(),
            database: database.clone(),
        });
    }

    if let Some(data_dir) = &plan.data_dir {
        let source = plan.project_dir.join(data_dir);
        if source.is_dir() {
            let dest = record.path.join(DATA_ARCHIVE_FILE);
            let name = relative_to(data_dir, &plan.project_dir);
            archive::pack(&source, &name, &dest).map_err(|e| BackupError::io(&source, e))?;
            record.data = Some(DataArchive {
                file: DATA_ARCHIVE_FILE.to_string(),
                source: name,
            });
        } else {
            tracing::debug!("Data directory {} absent, not archived", source.display());
        }
    }

    store.write_manifest(record)
}

fn unique_name(record: &BackupRecord, source: &Path) -> String {
    let base = source
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "file".to_string());
    let mut name = base.clone();
    let mut n = 1;
    while record.files.iter().any(|f| f.name == name) {
        name = format!("{}.{}", base, n);
        n += 1;
    }
    name
}

/// Copy captured configuration files back and unpack the data archive.
pub fn restore_files(record: &BackupRecord, project_dir: &Path) -> Result<(), BackupError> {
    for file in &record.files {
        let source = record.artifact_path(&file.name);
        let dest = project_dir.join(&file.original);
        std::fs::copy(&source, &dest).map_err(|e| BackupError::io(&source, e))?;
        tracing::debug!("Restored {}", dest.display());
    }

    if let Some(data) = &record.data {
        let source = record.artifact_path(&data.file);
        archive::unpack(&source, project_dir).map_err(|e| BackupError::io(&source, e))?;
        tracing::debug!("Restored data directory {}", data.source.display());
    }
    Ok(())
}

/// Load the captured database dump back, when the backup has one.
pub async fn restore_database(
    record: &BackupRecord,
    services: &dyn ServiceManager,
    topology: &Topology,
) -> Result<(), BackupError> {
    let Some(dump) = &record.database else {
        return Ok(());
    };
    services
        .restore_database(topology, &dump.database, &record.artifact_path(&dump.file))
        .await
        .map_err(|source| BackupError::Database {
            action: "restore",
            source,
        })
}
