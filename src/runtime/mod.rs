// ABOUTME: Container runtime layer: capability traits and their local implementations.
// ABOUTME: Detects Docker/Podman and compose, and bundles them into a LocalToolchain.

pub mod command;
mod compose;
mod detection;
mod engine;
mod error;
mod test_runner;
mod traits;

pub use compose::{ComposeCli, rewrite_service_image};
pub use detection::{ComposeCommand, DetectionError, RuntimeInfo, RuntimeType, detect_local};
pub use engine::DockerEngine;
pub use error::{EngineError, EngineErrorKind};
pub use test_runner::ShellTestRunner;
pub use traits::{
    BuildSpec, ImageBuilder, Preflight, PruneSummary, ServiceManager, TestRunner, Topology,
};

use async_trait::async_trait;
use std::path::PathBuf;

/// Everything the pipeline needs from the deploy host.
pub struct LocalToolchain {
    pub engine: DockerEngine,
    pub compose: ComposeCli,
    pub tests: ShellTestRunner,
}

impl LocalToolchain {
    pub async fn detect(workdir: impl Into<PathBuf>) -> Self {
        let engine = DockerEngine::connect_local(workdir);
        let compose = ComposeCli::detect(engine.runtime_type()).await;
        Self {
            engine,
            compose,
            tests: ShellTestRunner,
        }
    }
}

#[async_trait]
impl Preflight for LocalToolchain {
    async fn check(&self) -> Result<(), EngineError> {
        self.engine.check().await?;
        self.compose.check().await
    }
}
