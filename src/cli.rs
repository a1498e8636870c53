// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: One flat command: deploy by default, --rollback or --list-backups to switch mode.

use clap::Parser;
use heckx_deploy::output::OutputMode;
use heckx_deploy::types::Environment;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "heckx-deploy")]
#[command(about = "Deploy, roll back and inspect backups of the Heckx AI Assistant")]
#[command(version)]
pub struct Cli {
    /// Target environment: development, staging or production
    #[arg(default_value = "production")]
    pub environment: Environment,

    /// Do not run the test suite before building
    #[arg(long)]
    pub skip_tests: bool,

    /// Do not back up configuration and data before deploying
    #[arg(long)]
    pub skip_backup: bool,

    /// Skip confirmation prompts and break a held deploy lock
    #[arg(long)]
    pub force: bool,

    /// Restore the environment from the last backup instead of deploying
    #[arg(long, conflicts_with_all = ["skip_tests", "skip_backup", "list_backups"])]
    pub rollback: bool,

    /// List backups of the environment, newest first
    #[arg(long)]
    pub list_backups: bool,

    /// Health check timeout in seconds
    #[arg(long, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Project directory containing deploy.yml, .env.* and compose files
    #[arg(long, value_name = "DIR")]
    pub project_dir: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print errors and the final result
    #[arg(short, long, conflicts_with = "json")]
    pub quiet: bool,

    /// Emit JSON lines instead of human-readable output
    #[arg(long)]
    pub json: bool,
}

impl Cli {
    pub fn output_mode(&self) -> OutputMode {
        if self.json {
            OutputMode::Json
        } else if self.quiet {
            OutputMode::Quiet
        } else {
            OutputMode::Normal
        }
    }
}
