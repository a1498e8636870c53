// ABOUTME: Immutable deployment request built from CLI flags and configuration.
// ABOUTME: Resolves the health-check timeout: CLI, then environment override, then global default.

use crate::config::Config;
use crate::types::Environment;
use std::path::PathBuf;
use std::time::Duration;

/// Behaviour switches from the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DeployFlags {
    pub skip_tests: bool,
    pub skip_backup: bool,
    /// Skip confirmation and break a held deploy lock.
    pub force: bool,
    pub rollback: bool,
}

#[derive(Debug, Clone)]
pub struct DeployRequest {
    pub environment: Environment,
    pub flags: DeployFlags,
    pub project_dir: PathBuf,
    pub health_timeout: Duration,
}

impl DeployRequest {
    pub fn new(
        environment: Environment,
        flags: DeployFlags,
        project_dir: impl Into<PathBuf>,
        timeout_override: Option<Duration>,
        config: &Config,
    ) -> Self {
        let health_timeout =
            timeout_override.unwrap_or_else(|| config.health_timeout(environment));

        Self {
            environment,
            flags,
            project_dir: project_dir.into(),
            health_timeout,
        }
    }
}
