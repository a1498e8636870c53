// ABOUTME: Diagnostics accumulator for non-fatal warnings during deployment.
// ABOUTME: Notification, pruning and lock problems are recorded here instead of failing the run.

/// Collects non-fatal warnings during deployment operations.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<Warning>,
}

impl Diagnostics {
    /// Records a warning and logs it with its kind.
    pub fn warn(&mut self, warning: Warning) {
        tracing::warn!(kind = ?warning.kind, "{}", warning.message);
        self.warnings.push(warning);
    }

    /// Get all collected warnings.
    pub fn warnings(&self) -> &[Warning] {
        &self.warnings
    }

    /// Check if any warnings were collected.
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }

    /// Warnings of one kind.
    pub fn of_kind(&self, kind: WarningKind) -> impl Iterator<Item = &Warning> {
        self.warnings.iter().filter(move |w| w.kind == kind)
    }
}

/// A non-fatal warning collected during deployment.
#[derive(Debug, Clone)]
pub struct Warning {
    pub kind: WarningKind,
    pub message: String,
}

impl Warning {
    fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    /// A notification sink could not be reached.
    pub fn notification(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Notification, message)
    }

    /// Image or build-cache pruning failed.
    pub fn prune(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Prune, message)
    }

    /// Backup failed but the failure policy allowed continuing.
    pub fn backup(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Backup, message)
    }

    /// Old backups could not be removed.
    pub fn retention(message: impl Into<String>) -> Self {
        Self::new(WarningKind::Retention, message)
    }

    /// A stale or forced lock was broken.
    pub fn lock_broken(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockBroken, message)
    }

    /// Failed to release deploy lock (lock file may remain).
    pub fn lock_release(message: impl Into<String>) -> Self {
        Self::new(WarningKind::LockRelease, message)
    }
}

/// Categories of warnings that can occur during deployment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WarningKind {
    Notification,
    Prune,
    Backup,
    Retention,
    LockBroken,
    LockRelease,
}
