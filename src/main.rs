// ABOUTME: Entry point for the heckx-deploy CLI application.
// ABOUTME: Parses arguments, loads deploy.yml and dispatches to the command handlers.

mod cli;
mod commands;

use clap::Parser;
use cli::Cli;
use heckx_deploy::config::Config;
use heckx_deploy::deploy::{DeployFlags, DeployRequest};
use heckx_deploy::error::Result;
use heckx_deploy::output::Output;
use std::env;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Initialize tracing subscriber based on verbose flag
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .init();

    let mode = cli.output_mode();
    if let Err(e) = run(cli).await {
        Output::new(mode).error(&e.to_string());
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let project_dir = match &cli.project_dir {
        Some(dir) => dir.clone(),
        None => env::current_dir()?,
    };
    let config = Config::discover(&project_dir)?;
    let output = Output::new(cli.output_mode());

    if cli.list_backups {
        return commands::list_backups(&config, cli.environment, &project_dir, &output);
    }

    let flags = DeployFlags {
        skip_tests: cli.skip_tests,
        skip_backup: cli.skip_backup,
        force: cli.force,
        rollback: cli.rollback,
    };
    let request = DeployRequest::new(
        cli.environment,
        flags,
        project_dir,
        cli.timeout.map(Duration::from_secs),
        &config,
    );

    if request.flags.rollback {
        commands::rollback(config, request, output).await
    } else {
        commands::deploy(config, request, output).await
    }
}
