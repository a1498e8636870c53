// ABOUTME: Rollback command implementation.
// ABOUTME: Restores the environment from its last backup under the deploy lock.

use super::confirm::confirm;
use super::toolchain::{context, detect_toolchain};
use heckx_deploy::config::Config;
use heckx_deploy::deploy::{DeployLock, DeployRequest};
use heckx_deploy::diagnostics::Diagnostics;
use heckx_deploy::error::Result;
use heckx_deploy::notify::Notifiers;
use heckx_deploy::output::Output;
use heckx_deploy::probe::HttpProbe;

/// Roll the requested environment back to the last backup.
pub async fn rollback(config: Config, request: DeployRequest, mut output: Output) -> Result<()> {
    let environment = request.environment;
    confirm(
        &format!("Roll {} back to the last backup", environment),
        request.flags.force,
    )?;

    output.start_timer();
    let mut diag = Diagnostics::default();
    let notifiers = Notifiers::from_config(&config.notifications)?;

    output.progress(&format!("Rolling back {} on {}", config.project, environment));

    output.progress("  → Acquiring deploy lock...");
    let lock = DeployLock::acquire(
        &request.project_dir,
        environment,
        request.flags.force,
        &mut diag,
    )?;

    let toolchain = detect_toolchain(&request.project_dir, &output).await;
    let probe = HttpProbe;
    let ctx = context(&config, &output, &toolchain, &probe, &notifiers);

    let settings = config.for_environment(environment, &request.project_dir);
    let result =
        heckx_deploy::deploy::rollback(&ctx, &settings, request.health_timeout, &mut diag).await;
    lock.release(&mut diag);

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    let report = result?;
    output.record("rollback", &report);
    output.success(&format!(
        "Rolled {} back to {}",
        environment,
        report.backup.display()
    ));
    Ok(())
}
