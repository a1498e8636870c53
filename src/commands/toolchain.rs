// ABOUTME: Shared helper for detecting the local container toolchain.
// ABOUTME: Builds the pipeline Context from the detected toolchain, probe and notifiers.

use heckx_deploy::config::Config;
use heckx_deploy::deploy::Context;
use heckx_deploy::notify::Notifiers;
use heckx_deploy::output::Output;
use heckx_deploy::probe::HttpProbe;
use heckx_deploy::runtime::LocalToolchain;
use std::path::Path;

/// Detect the container runtime and compose front-end on this host.
pub async fn detect_toolchain(project_dir: &Path, output: &Output) -> LocalToolchain {
    output.progress("  → Detecting container runtime...");
    let toolchain = LocalToolchain::detect(project_dir).await;
    output.progress(&format!("  → Using {}", toolchain.engine.runtime_type()));
    toolchain
}

/// Wire the local toolchain into a pipeline context.
pub fn context<'a>(
    config: &'a Config,
    output: &'a Output,
    toolchain: &'a LocalToolchain,
    probe: &'a HttpProbe,
    notifiers: &'a Notifiers,
) -> Context<'a> {
    Context {
        config,
        output,
        preflight: toolchain,
        tests: &toolchain.tests,
        images: &toolchain.engine,
        services: &toolchain.compose,
        probe,
        notifiers,
    }
}
