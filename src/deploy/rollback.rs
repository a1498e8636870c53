// ABOUTME: Restores an environment from a backup record.
// ABOUTME: Used by --rollback and by automatic rollback after a failed production rollout.

use std::time::Duration;

use crate::backup::{self, BackupRecord};
use crate::config::EnvironmentSettings;
use crate::diagnostics::Diagnostics;
use crate::notify::{Event, Notification};

use super::deployment::Context;
use super::error::{DeployError, EngineErrorExt};
use super::health::wait_healthy;
use super::report::RollbackReport;
use super::transitions::activate_settings;

/// Roll `settings.environment` back to the backup named by the last-backup
/// pointer and notify the outcome.
///
/// # Errors
///
/// Returns `DeployError::NoBackupFound` before touching any service when the
/// pointer is missing, unreadable, dangling or belongs to another environment.
/// Any later failure is `DeployError::Rollback`.
pub async fn rollback(
    ctx: &Context<'_>,
    settings: &EnvironmentSettings,
    health_timeout: Duration,
    diag: &mut Diagnostics,
) -> Result<RollbackReport, DeployError> {
    let result = match last_backup(ctx, settings) {
        Ok(record) => restore(ctx, settings, record, health_timeout).await,
        Err(e) => Err(e),
    };
    notify_outcome(ctx, settings, &result, diag).await;
    result
}

/// Roll back to the backup a failed deployment took itself.
///
/// A deployment that ran without a backup has nothing to restore: an older
/// backup would replay stale data, so this is `DeployError::NoBackupFound`
/// and no service is touched.
pub(crate) async fn rollback_to(
    ctx: &Context<'_>,
    settings: &EnvironmentSettings,
    backup: Option<BackupRecord>,
    health_timeout: Duration,
    diag: &mut Diagnostics,
) -> Result<RollbackReport, DeployError> {
    let result = match backup {
        Some(record) => restore(ctx, settings, record, health_timeout).await,
        None => Err(DeployError::NoBackupFound(
            "this deployment ran without a backup".to_string(),
        )),
    };
    notify_outcome(ctx, settings, &result, diag).await;
    result
}

async fn notify_outcome(
    ctx: &Context<'_>,
    settings: &EnvironmentSettings,
    result: &Result<RollbackReport, DeployError>,
    diag: &mut Diagnostics,
) {
    let notification = match result {
        Ok(report) => Notification::new(
            Event::RollbackSucceeded,
            ctx.config.project.as_str(),
            settings.environment,
            format!("Restored backup {}", report.backup.display()),
        ),
        Err(e) => Notification::new(
            Event::RollbackFailed,
            ctx.config.project.as_str(),
            settings.environment,
            e.to_string(),
        ),
    };
    ctx.notifiers.dispatch(&notification, diag).await;
}

fn last_backup(
    ctx: &Context<'_>,
    settings: &EnvironmentSettings,
) -> Result<BackupRecord, DeployError> {
    let record = ctx.backup_store(settings).last_record()?;
    if record.environment != settings.environment {
        return Err(DeployError::NoBackupFound(format!(
            "last backup {} is for {}, not {}",
            record.path.display(),
            record.environment,
            settings.environment
        )));
    }
    Ok(record)
}

async fn restore(
    ctx: &Context<'_>,
    settings: &EnvironmentSettings,
    record: BackupRecord,
    health_timeout: Duration,
) -> Result<RollbackReport, DeployError> {
    tracing::debug!("Rolling back to {}", record.path.display());

    let topology = ctx.topology(settings);

    ctx.output.progress("  → Stopping services...");
    ctx.services
        .down(&topology)
        .await
        .or_rollback_error("stopping services")?;

    ctx.output
        .progress(&format!("  → Restoring from {}...", record.path.display()));
    backup::restore_files(&record, &settings.project_dir)
        .map_err(|e| DeployError::Rollback(e.to_string()))?;
    activate_settings(settings).map_err(|e| {
        DeployError::Rollback(format!(
            "failed to activate {}: {}",
            settings.settings_file.display(),
            e
        ))
    })?;

    if record.database.is_some() {
        ctx.output.progress("  → Restoring database...");
    }
    backup::restore_database(&record, ctx.services, &topology)
        .await
        .map_err(|e| DeployError::Rollback(e.to_string()))?;

    ctx.output.progress("  → Starting services...");
    ctx.services
        .up(&topology)
        .await
        .or_rollback_error("starting services")?;

    ctx.output.progress(&format!(
        "  → Waiting for {} (timeout {}s)...",
        settings.health_url,
        health_timeout.as_secs()
    ));
    let health = wait_healthy(ctx.probe, &ctx.health_policy(settings, health_timeout))
        .await
        .map_err(|e| DeployError::Rollback(format!("services unhealthy after restore: {}", e)))?;

    Ok(RollbackReport {
        environment: settings.environment,
        backup: record.path,
        health,
    })
}
