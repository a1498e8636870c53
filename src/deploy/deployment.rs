// ABOUTME: Generic deployment struct parameterized by state marker, plus the capability context.
// ABOUTME: State types carry their own data; the journal records every step's outcome.

use crate::backup::BackupStore;
use crate::config::{Config, EnvironmentSettings};
use crate::notify::Notifiers;
use crate::output::Output;
use crate::probe::HealthProbe;
use crate::runtime::{ImageBuilder, Preflight, ServiceManager, TestRunner, Topology};

use super::health::HealthPolicy;
use super::report::{Step, StepRecord, StepStatus};
use super::request::DeployRequest;
use super::state::Requested;

/// Configuration and injected capabilities shared by every step.
pub struct Context<'a> {
    pub config: &'a Config,
    pub output: &'a Output,
    pub preflight: &'a dyn Preflight,
    pub tests: &'a dyn TestRunner,
    pub images: &'a dyn ImageBuilder,
    pub services: &'a dyn ServiceManager,
    pub probe: &'a dyn HealthProbe,
    pub notifiers: &'a Notifiers,
}

impl Context<'_> {
    /// Compose project for an environment.
    pub fn topology(&self, settings: &EnvironmentSettings) -> Topology {
        Topology {
            project: format!("{}-{}", self.config.project, settings.environment),
            compose_file: settings.compose_file.clone(),
            workdir: settings.project_dir.clone(),
        }
    }

    pub fn backup_store(&self, settings: &EnvironmentSettings) -> BackupStore {
        BackupStore::new(self.config.backup_root(&settings.project_dir))
    }

    pub fn health_policy(
        &self,
        settings: &EnvironmentSettings,
        timeout: std::time::Duration,
    ) -> HealthPolicy {
        HealthPolicy {
            url: settings.health_url.clone(),
            interval: self.config.health.interval,
            timeout,
            probe_timeout: self.config.health.probe_timeout,
        }
    }
}

/// A deployment in progress, parameterized by its current state.
///
/// The state type parameter `S` carries the data produced by earlier steps
/// (backup record, built image, health report), so a step can only run once
/// everything it depends on exists.
#[derive(Debug)]
pub struct Deployment<S> {
    pub(crate) request: DeployRequest,
    pub(crate) settings: EnvironmentSettings,
    pub(crate) journal: Vec<StepRecord>,
    pub(crate) state: S,
}

impl Deployment<Requested> {
    pub fn new(request: DeployRequest, config: &Config) -> Self {
        let settings = config.for_environment(request.environment, &request.project_dir);
        Deployment {
            request,
            settings,
            journal: Vec::new(),
            state: Requested,
        }
    }
}

impl<S> Deployment<S> {
    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    pub(crate) fn record(&mut self, step: Step, status: StepStatus, detail: Option<String>) {
        self.journal.push(StepRecord {
            step,
            status,
            detail,
        });
    }
}
