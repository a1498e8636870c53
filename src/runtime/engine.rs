// ABOUTME: Docker/Podman engine adapter implementing Preflight and ImageBuilder.
// ABOUTME: Bollard for ping, tag and prune; the runtime CLI for build and push.

use super::command;
use super::detection::{RuntimeInfo, RuntimeType, detect_local};
use super::error::{ApiSnafu, EngineError};
use super::traits::{BuildSpec, ImageBuilder, Preflight, PruneSummary};
use crate::types::ImageRef;
use async_trait::async_trait;
use bollard::Docker;
use bollard::query_parameters::{PruneBuildOptions, PruneImagesOptions, TagImageOptions};
use snafu::ResultExt;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Request timeout for the engine API, in seconds.
const API_TIMEOUT_SECS: u64 = 120;

/// Container engine on the deploy host.
///
/// Construction never fails: when no socket is reachable the error is kept
/// and surfaces from [`Preflight::check`], so configuration problems that
/// don't need the engine are reported first.
pub struct DockerEngine {
    runtime: RuntimeType,
    client: Result<Docker, String>,
    workdir: PathBuf,
}

impl DockerEngine {
    /// Detect the local runtime and connect to its socket.
    pub fn connect_local(workdir: impl Into<PathBuf>) -> Self {
        match detect_local() {
            Ok(info) => Self::connect(&info, workdir),
            Err(e) => Self {
                runtime: RuntimeType::Docker,
                client: Err(e.to_string()),
                workdir: workdir.into(),
            },
        }
    }

    pub fn connect(info: &RuntimeInfo, workdir: impl Into<PathBuf>) -> Self {
        tracing::debug!(
            "Connecting to {} at {}",
            info.runtime_type,
            info.socket_path
        );
        let client = Docker::connect_with_unix(
            &info.socket_path,
            API_TIMEOUT_SECS,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| e.to_string());

        Self {
            runtime: info.runtime_type,
            client,
            workdir: workdir.into(),
        }
    }

    pub fn runtime_type(&self) -> RuntimeType {
        self.runtime
    }

    fn client(&self) -> Result<&Docker, EngineError> {
        self.client
            .as_ref()
            .map_err(|message| EngineError::RuntimeDown {
                message: message.clone(),
            })
    }

    fn program(&self) -> &'static str {
        self.runtime.program()
    }
}

/// Arguments for `<runtime> build`.
pub(crate) fn build_args(spec: &BuildSpec) -> Vec<String> {
    let mut args = vec!["build".to_string()];
    if let Some(dockerfile) = &spec.dockerfile {
        args.push("-f".to_string());
        args.push(dockerfile.display().to_string());
    }
    if let Some(target) = &spec.target {
        args.push("--target".to_string());
        args.push(target.clone());
    }
    for tag in &spec.tags {
        args.push("-t".to_string());
        args.push(tag.to_string());
    }
    args.push(spec.context.display().to_string());
    args
}

fn to_summary(removed: usize, space_reclaimed: Option<i64>) -> PruneSummary {
    PruneSummary {
        removed,
        space_reclaimed: space_reclaimed
            .and_then(|bytes| u64::try_from(bytes).ok())
            .unwrap_or(0),
    }
}

#[async_trait]
impl Preflight for DockerEngine {
    async fn check(&self) -> Result<(), EngineError> {
        let program = self.program();
        command::run(program, &["--version".to_string()], &self.workdir)
            .await
            .map_err(|_| EngineError::ToolMissing {
                tool: program.to_string(),
            })?;

        let client = self.client()?;
        client
            .ping()
            .await
            .map_err(|e| EngineError::RuntimeDown {
                message: e.to_string(),
            })?;
        Ok(())
    }
}

#[async_trait]
impl ImageBuilder for DockerEngine {
    async fn build(&self, spec: &BuildSpec) -> Result<(), EngineError> {
        command::run_checked(self.program(), &build_args(spec), &self.workdir).await?;
        Ok(())
    }

    async fn tag(&self, source: &ImageRef, target: &ImageRef) -> Result<(), EngineError> {
        let options = TagImageOptions {
            repo: Some(target.repository()),
            tag: Some(target.tag().to_string()),
        };
        self.client()?
            .tag_image(&source.to_string(), Some(options))
            .await
            .context(ApiSnafu)
    }

    async fn push(&self, image: &ImageRef) -> Result<(), EngineError> {
        let args = vec!["push".to_string(), image.to_string()];
        command::run_checked(self.program(), &args, &self.workdir).await?;
        Ok(())
    }

    async fn prune_images(&self, older_than: Duration) -> Result<PruneSummary, EngineError> {
        let filters = HashMap::from([
            (
                "until".to_string(),
                vec![format!("{}s", older_than.as_secs())],
            ),
            ("dangling".to_string(), vec!["false".to_string()]),
        ]);
        let response = self
            .client()?
            .prune_images(Some(PruneImagesOptions {
                filters: Some(filters),
            }))
            .await
            .context(ApiSnafu)?;

        let removed = response.images_deleted.map(|d| d.len()).unwrap_or(0);
        Ok(to_summary(removed, response.space_reclaimed))
    }

    async fn prune_build_cache(&self) -> Result<PruneSummary, EngineError> {
        let response = self
            .client()?
            .prune_build(Some(PruneBuildOptions {
                all: Some(true),
                ..Default::default()
            }))
            .await
            .context(ApiSnafu)?;

        let removed = response.caches_deleted.map(|c| c.len()).unwrap_or(0);
        Ok(to_summary(removed, response.space_reclaimed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_args_include_target_and_every_tag() {
        let spec = BuildSpec {
            context: PathBuf::from("/srv/heckx"),
            dockerfile: Some(PathBuf::from("Dockerfile.prod")),
            target: Some("production".to_string()),
            tags: vec![
                ImageRef::parse("heckx-video-generator:staging-20260101-120000").unwrap(),
                ImageRef::parse("heckx-video-generator:latest").unwrap(),
            ],
        };

        assert_eq!(
            build_args(&spec),
            vec![
                "build",
                "-f",
                "Dockerfile.prod",
                "--target",
                "production",
                "-t",
                "heckx-video-generator:staging-20260101-120000",
                "-t",
                "heckx-video-generator:latest",
                "/srv/heckx",
            ]
        );
    }

    #[test]
    fn negative_space_reclaimed_counts_as_zero() {
        assert_eq!(to_summary(2, Some(-1)).space_reclaimed, 0);
        assert_eq!(to_summary(2, Some(2048)).space_reclaimed, 2048);
        assert_eq!(to_summary(0, None), PruneSummary::default());
    }

    #[tokio::test]
    async fn missing_socket_reports_runtime_down() {
        let info = RuntimeInfo {
            runtime_type: RuntimeType::Docker,
            socket_path: "/nonexistent/heckx/docker.sock".to_string(),
        };
        let engine = DockerEngine::connect(&info, ".");
        let err = engine.prune_build_cache().await.unwrap_err();
        assert!(matches!(err, EngineError::RuntimeDown { .. }));
    }
}
