// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Later states carry the backup, image and health data produced so far.

use super::health::HealthReport;
use super::report::BuiltImage;
use crate::backup::BackupRecord;

/// Request accepted, nothing checked yet.
/// Available actions: `validate()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Requested;

/// Settings file present, tools and runtime available.
/// Available actions: `run_tests()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Validated;

/// Tests passed or were skipped.
/// Available actions: `backup()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Tested;

/// Backup taken (or skipped).
/// Available actions: `build()`
#[derive(Debug, Clone)]
pub struct BackedUp {
    pub(crate) backup: Option<BackupRecord>,
}

/// Image built, tagged and published when a registry is configured.
/// Available actions: `roll_out()`
#[derive(Debug, Clone)]
pub struct Built {
    pub(crate) backup: Option<BackupRecord>,
    pub(crate) image: BuiltImage,
}

/// Services started with the new image.
/// Available actions: `health_check()`
#[derive(Debug, Clone)]
pub struct RolledOut {
    pub(crate) backup: Option<BackupRecord>,
    pub(crate) image: BuiltImage,
}

/// Health endpoint reported healthy.
/// Available actions: `finish()`
#[derive(Debug, Clone)]
pub struct Healthy {
    pub(crate) backup: Option<BackupRecord>,
    pub(crate) image: BuiltImage,
    pub(crate) health: HealthReport,
}

/// States reached after the backup step, from which a failed deployment can
/// be restored.
pub(crate) trait Restorable {
    fn backup(&self) -> Option<&BackupRecord>;
}

impl Restorable for Built {
    fn backup(&self) -> Option<&BackupRecord> {
        self.backup.as_ref()
    }
}

impl Restorable for RolledOut {
    fn backup(&self) -> Option<&BackupRecord> {
        self.backup.as_ref()
    }
}
