// ABOUTME: Test support utilities.
// ABOUTME: Recording fakes for the host capabilities and a temporary project directory.

// Each test binary only uses some of these helpers.
#![allow(dead_code)]

use async_trait::async_trait;
use heckx_deploy::config::{Config, DatabaseConfig};
use heckx_deploy::deploy::Context;
use heckx_deploy::notify::{Notification, Notifier, Notifiers, NotifyError};
use heckx_deploy::output::{Output, OutputMode};
use heckx_deploy::probe::{HealthProbe, ProbeError};
use heckx_deploy::runtime::{
    BuildSpec, EngineError, ImageBuilder, Preflight, PruneSummary, ServiceManager, TestRunner,
    Topology,
};
use heckx_deploy::types::ImageRef;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Shared, ordered log of every capability call.
#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<String>>>);

impl Calls {
    pub fn push(&self, call: impl Into<String>) {
        self.0.lock().push(call.into());
    }

    pub fn all(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Calls whose name starts with `prefix`.
    pub fn count(&self, prefix: &str) -> usize {
        self.0.lock().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn contains(&self, prefix: &str) -> bool {
        self.count(prefix) > 0
    }

    /// Position of the first call starting with `prefix`.
    pub fn position(&self, prefix: &str) -> Option<usize> {
        self.0.lock().iter().position(|c| c.starts_with(prefix))
    }
}

/// Fake deploy host: runtime, compose, test runner and health endpoint.
///
/// Operations fail when scripted with [`FakeHost::fail`]; the probe answers
/// from a scripted queue and then with its default.
#[derive(Default)]
pub struct FakeHost {
    pub calls: Calls,
    failures: Mutex<HashMap<&'static str, usize>>,
    probe_script: Mutex<VecDeque<bool>>,
    probe_default: Mutex<bool>,
}

impl FakeHost {
    pub fn healthy() -> Self {
        let host = Self::default();
        *host.probe_default.lock() = true;
        host
    }

    pub fn unhealthy() -> Self {
        Self::default()
    }

    /// Make every call to `op` fail.
    pub fn fail(self, op: &'static str) -> Self {
        self.failures.lock().insert(op, usize::MAX);
        self
    }

    /// Make only the next call to `op` fail.
    pub fn fail_once(self, op: &'static str) -> Self {
        self.failures.lock().insert(op, 1);
        self
    }

    /// Probe answers, in order, before falling back to the default.
    pub fn probe_answers(self, answers: &[bool]) -> Self {
        self.probe_script.lock().extend(answers.iter().copied());
        self
    }

    pub fn set_healthy(&self, healthy: bool) {
        *self.probe_default.lock() = healthy;
    }

    fn call(&self, op: &'static str, detail: String) -> Result<(), EngineError> {
        self.calls.push(if detail.is_empty() {
            op.to_string()
        } else {
            format!("{} {}", op, detail)
        });

        let mut failures = self.failures.lock();
        match failures.get_mut(op) {
            Some(remaining) if *remaining > 0 => {
                *remaining = remaining.saturating_sub(1);
                Err(EngineError::command_failed(op, "exit status: 1", "scripted failure"))
            }
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl Preflight for FakeHost {
    async fn check(&self) -> Result<(), EngineError> {
        self.call("preflight", String::new())
    }
}

#[async_trait]
impl TestRunner for FakeHost {
    async fn run_tests(&self, command: &[String], _workdir: &Path) -> Result<(), EngineError> {
        self.call("tests", command.join(" "))
    }
}

#[async_trait]
impl ImageBuilder for FakeHost {
    async fn build(&self, spec: &BuildSpec) -> Result<(), EngineError> {
        let tags: Vec<String> = spec.tags.iter().map(ToString::to_string).collect();
        self.call("build", tags.join(" "))
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), EngineError> {
        self.call("tag", format!("{} {}", source, target))
    }

    async fn push(&self, image: &ImageRef) -> Result<(), EngineError> {
        self.call("push", image.to_string())
    }

    async fn prune_images(&self, older_than: Duration) -> Result<PruneSummary, EngineError> {
        self.call("prune_images", format!("{}s", older_than.as_secs()))?;
        Ok(PruneSummary::default())
    }

    async fn prune_build_cache(&self) -> Result<PruneSummary, EngineError> {
        self.call("prune_build", String::new())?;
        Ok(PruneSummary::default())
    }
}

#[async_trait]
impl ServiceManager for FakeHost {
    async fn pull(&self, topology: &Topology) -> Result<(), EngineError> {
        self.call("pull", topology.project.clone())
    }

    async fn up(&self, topology: &Topology) -> Result<(), EngineError> {
        self.call("up", topology.project.clone())
    }

    async fn down(&self, topology: &Topology) -> Result<(), EngineError> {
        self.call("down", topology.project.clone())
    }

    async fn dump_database(
        &self,
        _topology: &Topology,
        database: &DatabaseConfig,
        dest: &Path,
    ) -> Result<(), EngineError> {
        self.call("dump", database.name.clone())?;
        std::fs::write(dest, "-- dump\n").map_err(|source| EngineError::FileAccess {
            path: dest.to_path_buf(),
            source,
        })
    }

    async fn restore_database(
        &self,
        _topology: &Topology,
        database: &DatabaseConfig,
        source: &Path,
    ) -> Result<(), EngineError> {
        let dump = std::fs::read_to_string(source).unwrap_or_default();
        self.call("restore", format!("{} {}", database.name, dump.trim()))
    }
}

#[async_trait]
impl HealthProbe for FakeHost {
    async fn check(&self, url: &str, _timeout: Duration) -> Result<bool, ProbeError> {
        self.calls.push(format!("probe {}", url));
        let scripted = self.probe_script.lock().pop_front();
        Ok(scripted.unwrap_or(*self.probe_default.lock()))
    }
}

/// Notifier that records each event's title.
pub struct RecordingNotifier {
    pub sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn name(&self) -> &str {
        "recording"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        self.sent.lock().push(notification.event.title().to_string());
        Ok(())
    }
}

/// Notifier that always fails.
pub struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    fn name(&self) -> &str {
        "failing"
    }

    async fn notify(&self, _: &Notification) -> Result<(), NotifyError> {
        Err(NotifyError::WebhookStatus(503))
    }
}

/// Notifiers with a recording sink; returns the shared event log.
pub fn recording_notifiers() -> (Notifiers, Arc<Mutex<Vec<String>>>) {
    let sent = Arc::new(Mutex::new(Vec::new()));
    let mut notifiers = Notifiers::default();
    notifiers.push(Box::new(RecordingNotifier { sent: sent.clone() }));
    (notifiers, sent)
}

/// Temporary project directory with settings files for every environment,
/// a compose file and a data directory.
pub struct Project {
    pub dir: TempDir,
    pub config: Config,
}

impl Project {
    pub fn new() -> Self {
        Self::with_config("")
    }

    pub fn with_config(yaml: &str) -> Self {
        let dir = tempfile::tempdir().unwrap();
        for env in ["development", "staging", "production"] {
            std::fs::write(
                dir.path().join(format!(".env.{}", env)),
                format!("FLASK_ENV={}\n", env),
            )
            .unwrap();
        }
        std::fs::write(dir.path().join("docker-compose.yml"), COMPOSE).unwrap();
        std::fs::create_dir(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/videos.json"), "[]").unwrap();
        if !yaml.is_empty() {
            std::fs::write(dir.path().join("deploy.yml"), yaml).unwrap();
        }

        let config = Config::from_yaml(yaml).unwrap();
        Self { dir, config }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn read(&self, relative: &str) -> String {
        std::fs::read_to_string(self.path().join(relative)).unwrap()
    }

    pub fn write(&self, relative: &str, content: &str) {
        std::fs::write(self.path().join(relative), content).unwrap();
    }
}

pub const COMPOSE: &str = "\
services:
  app:
    image: heckx-video-generator:latest
    env_file: .env
  postgres:
    image: postgres:16
";

pub fn quiet() -> Output {
    Output::new(OutputMode::Quiet)
}

/// Pipeline context with every capability served by `host`.
pub fn context<'a>(
    config: &'a Config,
    output: &'a Output,
    host: &'a FakeHost,
    notifiers: &'a Notifiers,
) -> Context<'a> {
    Context {
        config,
        output,
        preflight: host,
        tests: host,
        images: host,
        services: host,
        probe: host,
        notifiers,
    }
}
