// ABOUTME: Deploy lock to prevent concurrent deployments to the same environment.
// ABOUTME: Uses atomic file creation with lock info stored in .deploy/locks/ of the project.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::diagnostics::{Diagnostics, Warning};
use crate::types::Environment;

use super::DeployError;

/// Lock directory, relative to the project directory.
const LOCK_DIR: &str = ".deploy/locks";

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Environment being deployed.
    pub environment: Environment,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(environment: Environment) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            environment,
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        is_stale_since(self.started_at)
    }

    /// Path to the lock file for an environment.
    pub fn lock_path(project_dir: &Path, environment: Environment) -> PathBuf {
        project_dir
            .join(LOCK_DIR)
            .join(format!("{}.lock", environment))
    }
}

/// A held deploy lock that releases on drop.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    released: bool,
}

impl DeployLock {
    /// Acquire the deploy lock for `environment`.
    ///
    /// The lock info is written to a private file first and then hard-linked
    /// into place, so the lock file never exists without its contents.
    /// Returns `LockHeld` if another process holds a fresh lock.
    /// Stale locks (>1 hour) and, with `force`, any lock are broken with a
    /// warning. An unreadable lock counts as held until its file is stale.
    pub fn acquire(
        project_dir: &Path,
        environment: Environment,
        force: bool,
        diag: &mut Diagnostics,
    ) -> Result<Self, DeployError> {
        let path = LockInfo::lock_path(project_dir, environment);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                DeployError::lock_error(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let info = LockInfo::new(environment);
        let json = serde_json::to_string(&info)
            .map_err(|e| DeployError::lock_error(format!("failed to serialize lock: {}", e)))?;

        if try_create(&path, &json)? {
            return Ok(Self::held(path));
        }

        match Self::read(&path) {
            Some(existing) if !force && !existing.is_stale() => {
                return Err(DeployError::lock_held(
                    existing.holder,
                    existing.pid,
                    existing.started_at,
                    existing.environment,
                ));
            }
            Some(existing) => {
                let reason = if force { "Breaking" } else { "Auto-breaking stale" };
                diag.warn(Warning::lock_broken(format!(
                    "{} lock held by {} (pid {}) since {}",
                    reason, existing.holder, existing.pid, existing.started_at
                )));
            }
            None if !force && !modified_long_ago(&path) => {
                return Err(DeployError::lock_error(format!(
                    "{} exists but is unreadable; retry, or use --force to break it",
                    path.display()
                )));
            }
            None => diag.warn(Warning::lock_broken(format!(
                "Lock info at {} unreadable, breaking lock",
                path.display()
            ))),
        }

        tracing::debug!("Removing stale/forced lock at {}", path.display());
        match std::fs::remove_file(&path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DeployError::lock_error(format!(
                    "failed to remove {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        if try_create(&path, &json)? {
            Ok(Self::held(path))
        } else {
            Err(DeployError::lock_error(
                "lock acquired by another process during break",
            ))
        }
    }

    fn held(path: PathBuf) -> Self {
        Self {
            path,
            released: false,
        }
    }

    fn read(path: &Path) -> Option<LockInfo> {
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock, reporting a failure to remove it as a warning.
    pub fn release(mut self, diag: &mut Diagnostics) {
        self.released = true;
        if let Err(e) = std::fs::remove_file(&self.path)
            && e.kind() != ErrorKind::NotFound
        {
            diag.warn(Warning::lock_release(format!(
                "failed to remove lock file {}: {}",
                self.path.display(),
                e
            )));
        }
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = std::fs::remove_file(&self.path)
        {
            tracing::warn!("Failed to remove lock file {}: {}", self.path.display(), e);
        }
    }
}

fn is_stale_since(at: DateTime<Utc>) -> bool {
    (Utc::now() - at).num_hours() >= 1
}

/// Whether the lock file was last written more than an hour ago. A missing
/// file or unknown mtime counts as old: there is nothing live to protect.
fn modified_long_ago(path: &Path) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(|mtime| is_stale_since(DateTime::<Utc>::from(mtime)))
        .unwrap_or(true)
}

/// Atomically publish a fully written lock file. `Ok(false)` when it
/// already exists.
fn try_create(path: &Path, json: &str) -> Result<bool, DeployError> {
    let staged = path.with_extension(format!("lock.{}.tmp", std::process::id()));
    std::fs::write(&staged, json).map_err(|e| {
        DeployError::lock_error(format!("failed to write {}: {}", staged.display(), e))
    })?;

    let linked = std::fs::hard_link(&staged, path);
    if let Err(e) = std::fs::remove_file(&staged) {
        tracing::debug!("Failed to remove {}: {}", staged.display(), e);
    }

    match linked {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(false),
        Err(e) => Err(DeployError::lock_error(format!(
            "failed to create {}: {}",
            path.display(),
            e
        ))),
    }
}
