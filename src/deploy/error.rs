// ABOUTME: Error types for deployment operations.
// ABOUTME: Covers every pipeline step, rollback and the deploy lock.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::backup::BackupError;
use crate::runtime::EngineError;
use crate::types::Environment;

/// Information about who holds a deploy lock.
#[derive(Debug, Clone)]
pub struct LockHolderInfo {
    pub holder: String,
    pub pid: u32,
    pub started_at: DateTime<Utc>,
    pub environment: Environment,
}

/// Errors that can occur during a deployment or rollback.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Settings file, tool or runtime missing, or configuration invalid.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The test suite failed.
    #[error("tests failed: {0}")]
    TestFailure(String),

    /// The pre-deployment backup failed.
    #[error("backup failed: {0}")]
    Backup(String),

    /// Image build, tag, push or compose rewrite failed.
    #[error("build failed: {0}")]
    Build(String),

    /// Compose pull or up failed.
    #[error("rollout failed: {0}")]
    Rollout(String),

    /// The health endpoint did not report healthy before the deadline.
    #[error("health check did not pass within {}s ({attempts} attempts)", timeout.as_secs())]
    HealthCheckTimeout { timeout: Duration, attempts: u32 },

    /// Rollback requested without a usable backup.
    #[error("no backup found to roll back to: {0}")]
    NoBackupFound(String),

    /// A rollback step failed.
    #[error("rollback failed: {0}")]
    Rollback(String),

    /// A deployment failed and the automatic rollback that followed failed too.
    #[error("{original}; automatic rollback also failed: {rollback}")]
    AutoRollbackFailed {
        original: Box<DeployError>,
        rollback: Box<DeployError>,
    },

    /// Another run holds the deploy lock.
    #[error(
        "deploy lock for {} held by {} (pid {}) since {}",
        .0.environment, .0.holder, .0.pid, .0.started_at
    )]
    LockHeld(Box<LockHolderInfo>),

    /// Lock file could not be created, read or removed.
    #[error("lock error: {0}")]
    Lock(String),
}

/// Error kind for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Configuration,
    TestFailure,
    Backup,
    Build,
    Rollout,
    HealthCheckTimeout,
    NoBackupFound,
    Rollback,
    LockHeld,
    Lock,
}

impl DeployError {
    /// Returns the error kind. A failed automatic rollback reports the kind of
    /// the failure that triggered it.
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployError::Configuration(_) => DeployErrorKind::Configuration,
            DeployError::TestFailure(_) => DeployErrorKind::TestFailure,
            DeployError::Backup(_) => DeployErrorKind::Backup,
            DeployError::Build(_) => DeployErrorKind::Build,
            DeployError::Rollout(_) => DeployErrorKind::Rollout,
            DeployError::HealthCheckTimeout { .. } => DeployErrorKind::HealthCheckTimeout,
            DeployError::NoBackupFound(_) => DeployErrorKind::NoBackupFound,
            DeployError::Rollback(_) => DeployErrorKind::Rollback,
            DeployError::AutoRollbackFailed { original, .. } => original.kind(),
            DeployError::LockHeld(_) => DeployErrorKind::LockHeld,
            DeployError::Lock(_) => DeployErrorKind::Lock,
        }
    }

    pub fn config_error(message: impl Into<String>) -> Self {
        DeployError::Configuration(message.into())
    }

    pub fn lock_error(message: impl Into<String>) -> Self {
        DeployError::Lock(message.into())
    }

    pub fn lock_held(
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
        environment: Environment,
    ) -> Self {
        DeployError::LockHeld(Box::new(LockHolderInfo {
            holder,
            pid,
            started_at,
            environment,
        }))
    }

    /// Holder details when this is a `LockHeld` error.
    pub fn lock_holder_info(&self) -> Option<&LockHolderInfo> {
        match self {
            DeployError::LockHeld(info) => Some(info),
            _ => None,
        }
    }

    /// Failure of the automatic rollback, if one was attempted and failed.
    pub fn rollback_error(&self) -> Option<&DeployError> {
        match self {
            DeployError::AutoRollbackFailed { rollback, .. } => Some(rollback),
            _ => None,
        }
    }
}

/// Attach the failing step's error type to runtime errors.
pub trait EngineErrorExt<T> {
    fn or_test_failure(self) -> Result<T, DeployError>;
    fn or_build_error(self, what: &str) -> Result<T, DeployError>;
    fn or_rollout_error(self, what: &str) -> Result<T, DeployError>;
    fn or_rollback_error(self, what: &str) -> Result<T, DeployError>;
}

impl<T> EngineErrorExt<T> for Result<T, EngineError> {
    fn or_test_failure(self) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::TestFailure(e.to_string()))
    }

    fn or_build_error(self, what: &str) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::Build(format!("{}: {}", what, e)))
    }

    fn or_rollout_error(self, what: &str) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::Rollout(format!("{}: {}", what, e)))
    }

    fn or_rollback_error(self, what: &str) -> Result<T, DeployError> {
        self.map_err(|e| DeployError::Rollback(format!("{}: {}", what, e)))
    }
}

impl From<BackupError> for DeployError {
    fn from(err: BackupError) -> Self {
        if err.is_missing_backup() {
            DeployError::NoBackupFound(err.to_string())
        } else {
            DeployError::Backup(err.to_string())
        }
    }
}
