// ABOUTME: Backup configuration: location, retention, failure policy and production captures.
// ABOUTME: Database and data-directory captures only apply to production deployments.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::backup::Retention;

/// What the pipeline does when the backup step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackupFailurePolicy {
    /// Stop the deployment with a backup error.
    #[default]
    Abort,
    /// Record a warning and continue without a fresh backup.
    Warn,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackupConfig {
    #[serde(default = "default_dir")]
    pub dir: PathBuf,

    /// Backups kept per environment; older ones are pruned after each backup.
    #[serde(default = "default_keep")]
    pub keep: usize,

    /// Backups older than this are pruned too, e.g. `7d`. Unlimited when unset.
    #[serde(default, with = "humantime_serde")]
    pub max_age: Option<Duration>,

    #[serde(default)]
    pub on_failure: BackupFailurePolicy,

    /// Application data directory archived for production backups.
    #[serde(default = "default_data_dir")]
    pub data_dir: Option<PathBuf>,

    #[serde(default = "default_database")]
    pub database: Option<DatabaseConfig>,
}

/// Database dumped through the compose service for production backups.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_service")]
    pub service: String,

    #[serde(default = "default_db_user")]
    pub user: String,

    #[serde(default = "default_db_name")]
    pub name: String,
}

fn default_dir() -> PathBuf {
    PathBuf::from("backups")
}

fn default_keep() -> usize {
    10
}

fn default_data_dir() -> Option<PathBuf> {
    Some(PathBuf::from("data"))
}

fn default_database() -> Option<DatabaseConfig> {
    Some(DatabaseConfig::default())
}

fn default_db_service() -> String {
    "postgres".to_string()
}

fn default_db_user() -> String {
    "postgres".to_string()
}

fn default_db_name() -> String {
    "heckx".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            service: default_db_service(),
            user: default_db_user(),
            name: default_db_name(),
        }
    }
}

impl BackupConfig {
    pub fn retention(&self) -> Retention {
        Retention {
            keep: self.keep,
            max_age: self.max_age,
        }
    }
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            dir: default_dir(),
            keep: default_keep(),
            max_age: None,
            on_failure: BackupFailurePolicy::default(),
            data_dir: default_data_dir(),
            database: default_database(),
        }
    }
}
