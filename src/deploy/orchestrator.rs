// ABOUTME: Drives a deployment through every step and handles failure.
// ABOUTME: Notifies the outcome and rolls production back after a failed rollout or health check.

use crate::backup::BackupRecord;
use crate::diagnostics::Diagnostics;
use crate::notify::{Event, Notification};

use super::deployment::{Context, Deployment};
use super::error::DeployError;
use super::report::{DeployReport, Step};
use super::request::DeployRequest;
use super::rollback::rollback_to;
use super::state::{Restorable, Validated};

/// A step failure together with what the failure handler needs to know.
#[derive(Debug)]
struct Failure {
    step: Step,
    error: DeployError,
    image: Option<String>,
    backup: Option<BackupRecord>,
}

impl Failure {
    fn at(step: Step) -> impl FnOnce(DeployError) -> Failure {
        move |error| Failure {
            step,
            error,
            image: None,
            backup: None,
        }
    }

    /// Failure after the build; keeps the image and the deployment's own backup.
    fn after_build<'a, S: Restorable + 'a>(
        step: Step,
        image: &'a str,
    ) -> impl FnOnce((Deployment<S>, DeployError)) -> Failure + 'a {
        move |(deployment, error)| Failure {
            step,
            error,
            image: Some(image.to_string()),
            backup: deployment.state.backup().cloned(),
        }
    }
}

/// Run a full deployment.
///
/// Validation failures return immediately: nothing has changed, so there is
/// nothing to notify or roll back. Any later failure is notified, and in
/// production a failed rollout or health check is followed by an automatic
/// rollback to the backup this run took before the build. A run without a
/// backup is never restored from an older one.
///
/// # Errors
///
/// Returns the error of the failing step, or `DeployError::AutoRollbackFailed`
/// when the automatic rollback failed as well.
pub async fn run_deployment(
    ctx: &Context<'_>,
    request: DeployRequest,
    diag: &mut Diagnostics,
) -> Result<DeployReport, DeployError> {
    let environment = request.environment;
    let health_timeout = request.health_timeout;

    let deployment = Deployment::new(request, ctx.config);
    let settings = deployment.settings().clone();
    let deployment = deployment.validate(ctx).await?;

    match drive(ctx, deployment, diag).await {
        Ok(report) => {
            let notification = Notification::new(
                Event::DeploySucceeded,
                ctx.config.project.as_str(),
                environment,
                format!(
                    "Healthy after {} check(s) in {:.1}s",
                    report.health.attempts,
                    report.health.elapsed.as_secs_f64()
                ),
            )
            .with_image(report.image.to_string());
            ctx.notifiers.dispatch(&notification, diag).await;
            Ok(report)
        }
        Err(failure) => {
            tracing::debug!("Step {} failed: {:?}", failure.step, failure.error);
            ctx.output
                .progress(&format!("  ✗ {} failed", failure.step));

            let mut notification = Notification::new(
                Event::DeployFailed,
                ctx.config.project.as_str(),
                environment,
                format!("{} failed: {}", failure.step, failure.error),
            );
            if let Some(image) = &failure.image {
                notification = notification.with_image(image.as_str());
            }
            ctx.notifiers.dispatch(&notification, diag).await;

            if !(environment.is_production() && failure.step.triggers_rollback()) {
                return Err(failure.error);
            }

            ctx.output.progress("  → Rolling back automatically...");
            match rollback_to(ctx, &settings, failure.backup, health_timeout, diag).await {
                Ok(report) => {
                    ctx.output.success(&format!(
                        "Rolled back to {}",
                        report.backup.display()
                    ));
                    Err(failure.error)
                }
                Err(rollback_err) => Err(DeployError::AutoRollbackFailed {
                    original: Box::new(failure.error),
                    rollback: Box::new(rollback_err),
                }),
            }
        }
    }
}

async fn drive(
    ctx: &Context<'_>,
    deployment: Deployment<Validated>,
    diag: &mut Diagnostics,
) -> Result<DeployReport, Failure> {
    let tested = deployment
        .run_tests(ctx)
        .await
        .map_err(Failure::at(Step::Test))?;
    let backed_up = tested
        .backup(ctx, diag)
        .await
        .map_err(Failure::at(Step::Backup))?;
    let built = backed_up
        .build(ctx)
        .await
        .map_err(Failure::at(Step::Build))?;

    let image = built.image().deployed().to_string();
    let rolled_out = built
        .roll_out(ctx)
        .await
        .map_err(Failure::after_build(Step::Rollout, &image))?;
    let healthy = rolled_out
        .health_check(ctx)
        .await
        .map_err(Failure::after_build(Step::HealthCheck, &image))?;

    Ok(healthy.finish(ctx, diag).await)
}
