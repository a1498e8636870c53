// ABOUTME: Capability traits the deployment pipeline drives.
// ABOUTME: Preflight checks, test execution, image building and compose service management.

use super::error::EngineError;
use crate::config::DatabaseConfig;
use crate::types::ImageRef;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Verifies that required tools are installed and the container runtime is up.
#[async_trait]
pub trait Preflight: Send + Sync {
    async fn check(&self) -> Result<(), EngineError>;
}

/// Runs the project's test suite.
#[async_trait]
pub trait TestRunner: Send + Sync {
    /// Run `command` in `workdir`. A non-zero exit is an error.
    async fn run_tests(&self, command: &[String], workdir: &Path) -> Result<(), EngineError>;
}

/// What to build and how to tag it.
#[derive(Debug, Clone)]
pub struct BuildSpec {
    pub context: PathBuf,
    pub dockerfile: Option<PathBuf>,
    pub target: Option<String>,
    /// Every tag applied to the built image; the first is the primary one.
    pub tags: Vec<ImageRef>,
}

/// Result of an image or build-cache prune.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PruneSummary {
    pub removed: usize,
    pub space_reclaimed: u64,
}

/// Image lifecycle: build, tag, publish and prune.
#[async_trait]
pub trait ImageBuilder: Send + Sync {
    async fn build(&self, spec: &BuildSpec) -> Result<(), EngineError>;

    /// Tag an existing local image under another reference.
    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), EngineError>;

    async fn push(&self, image: &ImageRef) -> Result<(), EngineError>;

    /// Remove unused images created more than `older_than` ago.
    async fn prune_images(&self, older_than: Duration) -> Result<PruneSummary, EngineError>;

    async fn prune_build_cache(&self) -> Result<PruneSummary, EngineError>;
}

/// The compose project a rollout applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub project: String,
    pub compose_file: PathBuf,
    pub workdir: PathBuf,
}

/// Compose-level service management.
#[async_trait]
pub trait ServiceManager: Send + Sync {
    async fn pull(&self, topology: &Topology) -> Result<(), EngineError>;

    /// Start (or recreate) services detached, removing orphans.
    async fn up(&self, topology: &Topology) -> Result<(), EngineError>;

    async fn down(&self, topology: &Topology) -> Result<(), EngineError>;

    /// Write a SQL dump of `database` to `dest`.
    async fn dump_database(
        &self,
        topology: &Topology,
        database: &DatabaseConfig,
        dest: &Path,
    ) -> Result<(), EngineError>;

    /// Feed the SQL dump at `source` back into `database`, starting its
    /// service first when the rest of the project is down.
    async fn restore_database(
        &self,
        topology: &Topology,
        database: &DatabaseConfig,
        source: &Path,
    ) -> Result<(), EngineError>;
}
