// ABOUTME: Deploy command implementation.
// ABOUTME: Confirms, takes the deploy lock and runs the deployment pipeline.

use super::confirm::confirm;
use super::toolchain::{context, detect_toolchain};
use heckx_deploy::config::Config;
use heckx_deploy::deploy::{DeployLock, DeployRequest, run_deployment};
use heckx_deploy::diagnostics::Diagnostics;
use heckx_deploy::error::Result;
use heckx_deploy::notify::Notifiers;
use heckx_deploy::output::Output;
use heckx_deploy::probe::HttpProbe;

/// Deploy the project to the requested environment.
pub async fn deploy(config: Config, request: DeployRequest, mut output: Output) -> Result<()> {
    let environment = request.environment;
    if environment.is_production() {
        confirm(
            &format!("Deploy {} to production", config.project),
            request.flags.force,
        )?;
    }

    output.start_timer();
    let mut diag = Diagnostics::default();
    let notifiers = Notifiers::from_config(&config.notifications)?;

    output.progress(&format!(
        "Deploying {} ({}) to {}",
        config.project, config.image, environment
    ));

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

    let result = run_deployment(&ctx, request, &mut diag).await;
    lock.release(&mut diag);

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    let report = result?;
    output.record("deployment", &report);
    output.success(&format!("Deployed {} to {}", report.image, environment));
    Ok(())
}
