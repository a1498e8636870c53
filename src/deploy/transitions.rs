// ABOUTME: State transition methods for deployment orchestration.
// ABOUTME: Each method consumes self and returns the next state on success.

use chrono::{DateTime, Utc};

use crate::backup::{self, BackupPlan};
use crate::config::{BackupFailurePolicy, EnvironmentSettings};
use crate::diagnostics::{Diagnostics, Warning};
use crate::runtime::{BuildSpec, rewrite_service_image};
use crate::types::{Environment, ImageRef};

use super::deployment::{Context, Deployment};
use super::error::{DeployError, EngineErrorExt};
use super::health::wait_healthy;
use super::report::{BuiltImage, DeployReport, Step, StepStatus};
use super::state::{BackedUp, Built, Healthy, Requested, RolledOut, Tested, Validated};

/// Result type for transitions that may need rollback on failure.
pub type TransitionResult<T, S> = Result<Deployment<T>, (Deployment<S>, DeployError)>;

// =============================================================================
// Internal Helpers
// =============================================================================

impl<S> Deployment<S> {
    /// Internal helper to transition to a new state.
    fn transition<T>(self, state: T) -> Deployment<T> {
        Deployment {
            request: self.request,
            settings: self.settings,
            journal: self.journal,
            state,
        }
    }
}

/// Unique image tag, `{environment}-{YYYYmmdd-HHMMSS}`.
pub fn unique_tag(environment: Environment, at: DateTime<Utc>) -> String {
    format!("{}-{}", environment, at.format("%Y%m%d-%H%M%S"))
}

/// Copy the environment's settings file to the active env file compose reads.
pub(crate) fn activate_settings(settings: &EnvironmentSettings) -> std::io::Result<()> {
    std::fs::copy(&settings.settings_file, &settings.active_env_file).map(|_| ())
}

fn build_err(what: &str) -> impl FnOnce(crate::types::ParseImageRefError) -> DeployError + '_ {
    move |e| DeployError::Build(format!("{}: {}", what, e))
}

// =============================================================================
// Requested -> Validated
// =============================================================================

impl Deployment<Requested> {
    /// Check the settings file and its required keys, then the tools and
    /// the container runtime.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Configuration`; nothing has been changed yet.
    pub async fn validate(mut self, ctx: &Context<'_>) -> Result<Deployment<Validated>, DeployError> {
        ctx.output.progress(&format!(
            "  → Validating {} environment...",
            self.request.environment
        ));

        if !self.settings.settings_file.is_file() {
            return Err(DeployError::config_error(format!(
                "settings file {} not found",
                self.settings.settings_file.display()
            )));
        }

        let missing = self.settings.missing_required_vars().map_err(|e| {
            DeployError::config_error(format!(
                "failed to parse {}: {}",
                self.settings.settings_file.display(),
                e
            ))
        })?;
        if !missing.is_empty() {
            return Err(DeployError::config_error(format!(
                "{} is missing required settings: {}",
                self.settings.settings_file.display(),
                missing.join(", ")
            )));
        }

        ctx.preflight
            .check()
            .await
            .map_err(|e| DeployError::config_error(e.to_string()))?;

        self.record(Step::Validate, StepStatus::Completed, None);
        Ok(self.transition(Validated))
    }
}

// =============================================================================
// Validated -> Tested
// =============================================================================

impl Deployment<Validated> {
    /// Run the test suite unless `--skip-tests` was given.
    pub async fn run_tests(mut self, ctx: &Context<'_>) -> Result<Deployment<Tested>, DeployError> {
        if self.request.flags.skip_tests {
            ctx.output.progress("  → Skipping tests");
            self.record(Step::Test, StepStatus::Skipped, None);
            return Ok(self.transition(Tested));
        }

        ctx.output.progress("  → Running tests...");
        ctx.tests
            .run_tests(&ctx.config.tests.command, &self.settings.project_dir)
            .await
            .or_test_failure()?;

        self.record(Step::Test, StepStatus::Completed, None);
        Ok(self.transition(Tested))
    }
}

// =============================================================================
// Tested -> BackedUp
// =============================================================================

impl Deployment<Tested> {
    /// Back up configuration (and, in production, database and data) unless
    /// `--skip-backup` was given, then prune old backups.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Backup` when capture fails and the failure
    /// policy is `abort`.
    pub async fn backup(
        mut self,
        ctx: &Context<'_>,
        diag: &mut Diagnostics,
    ) -> Result<Deployment<BackedUp>, DeployError> {
        if self.request.flags.skip_backup {
            ctx.output.progress("  → Skipping backup");
            self.record(Step::Backup, StepStatus::Skipped, None);
            return Ok(self.transition(BackedUp { backup: None }));
        }

        ctx.output.progress("  → Creating backup...");
        let store = ctx.backup_store(&self.settings);
        let plan = BackupPlan::for_environment(ctx.config, &self.settings);
        let topology = ctx.topology(&self.settings);

        match backup::capture(&store, &plan, ctx.services, &topology).await {
            Ok(record) => {
                let retention = ctx.config.backup.retention();
                match store.prune(self.request.environment, &retention, Utc::now()) {
                    Ok(removed) if !removed.is_empty() => {
                        tracing::debug!("Pruned {} old backup(s)", removed.len());
                    }
                    Ok(_) => {}
                    Err(e) => diag.warn(Warning::retention(format!(
                        "failed to prune old backups: {}",
                        e
                    ))),
                }
                ctx.output
                    .progress(&format!("  ✓ Backup saved to {}", record.path.display()));
                self.record(
                    Step::Backup,
                    StepStatus::Completed,
                    Some(record.path.display().to_string()),
                );
                Ok(self.transition(BackedUp {
                    backup: Some(record),
                }))
            }
            Err(e) => match ctx.config.backup.on_failure {
                BackupFailurePolicy::Abort => Err(DeployError::Backup(e.to_string())),
                BackupFailurePolicy::Warn => {
                    diag.warn(Warning::backup(format!(
                        "backup failed, continuing without one: {}",
                        e
                    )));
                    self.record(Step::Backup, StepStatus::Warned, Some(e.to_string()));
                    Ok(self.transition(BackedUp { backup: None }))
                }
            },
        }
    }
}

// =============================================================================
// BackedUp -> Built
// =============================================================================

impl Deployment<BackedUp> {
    /// Build the image with a unique and a `latest` tag, publishing both when
    /// a registry is configured.
    ///
    /// # Errors
    ///
    /// Returns `DeployError::Build` for build, tag, push or compose rewrite failures.
    pub async fn build(mut self, ctx: &Context<'_>) -> Result<Deployment<Built>, DeployError> {
        let build = &ctx.config.build;
        let project_dir = &self.settings.project_dir;

        let tag = unique_tag(self.request.environment, Utc::now());
        let local = ctx.config.image.with_tag(&tag).map_err(build_err("image tag"))?;
        let latest = ctx
            .config
            .image
            .with_tag("latest")
            .map_err(build_err("image tag"))?;

        ctx.output.progress(&format!("  → Building {}...", local));
        let spec = BuildSpec {
            context: project_dir.join(&build.context),
            dockerfile: build.dockerfile.as_ref().map(|d| project_dir.join(d)),
            target: build.target.clone(),
            tags: vec![local.clone(), latest.clone()],
        };
        ctx.images.build(&spec).await.or_build_error("image build")?;

        let published = match &build.registry {
            Some(registry) => Some(self.publish(ctx, registry, &local, &latest).await?),
            None => None,
        };

        let image = BuiltImage {
            tag,
            local,
            latest,
            published,
        };
        self.record(
            Step::Build,
            StepStatus::Completed,
            Some(image.deployed().to_string()),
        );
        let backup = self.state.backup.take();
        Ok(self.transition(Built { backup, image }))
    }

    /// Tag and push both references, then point the app service at the unique one.
    async fn publish(
        &self,
        ctx: &Context<'_>,
        registry: &str,
        local: &ImageRef,
        latest: &ImageRef,
    ) -> Result<ImageRef, DeployError> {
        let published = local.in_registry(registry).map_err(build_err("registry"))?;
        let published_latest = latest.in_registry(registry).map_err(build_err("registry"))?;

        for (source, target) in [(local, &published), (latest, &published_latest)] {
            ctx.output.progress(&format!("  → Pushing {}...", target));
            ctx.images
                .tag(source, target)
                .await
                .or_build_error("image tag")?;
            ctx.images.push(target).await.or_build_error("image push")?;
        }

        rewrite_service_image(
            &self.settings.compose_file,
            &ctx.config.build.app_service,
            &published,
        )
        .or_build_error("compose file update")?;

        Ok(published)
    }
}

// =============================================================================
// Built -> RolledOut
// =============================================================================

impl Deployment<Built> {
    pub fn image(&self) -> &BuiltImage {
        &self.state.image
    }

    /// Activate the environment's settings and restart services on the new image.
    ///
    /// On failure, returns the deployment so the caller can roll back.
    pub async fn roll_out(mut self, ctx: &Context<'_>) -> TransitionResult<RolledOut, Built> {
        ctx.output.progress(&format!(
            "  → Rolling out with {}...",
            self.settings.compose_file.display()
        ));

        if let Err(e) = activate_settings(&self.settings) {
            let err = DeployError::Rollout(format!(
                "failed to activate {}: {}",
                self.settings.settings_file.display(),
                e
            ));
            return Err((self, err));
        }

        let topology = ctx.topology(&self.settings);
        let result = async {
            ctx.services
                .pull(&topology)
                .await
                .or_rollout_error("pulling images")?;
            ctx.services
                .up(&topology)
                .await
                .or_rollout_error("starting services")
        }
        .await;
        if let Err(e) = result {
            return Err((self, e));
        }

        self.record(Step::Rollout, StepStatus::Completed, None);
        let Built { backup, image } = self.state.clone();
        Ok(self.transition(RolledOut { backup, image }))
    }
}

// =============================================================================
// RolledOut -> Healthy
// =============================================================================

impl Deployment<RolledOut> {
    pub fn image(&self) -> &BuiltImage {
        &self.state.image
    }

    /// Poll the environment's health endpoint until it passes or the request
    /// timeout elapses.
    ///
    /// On failure, returns the deployment so the caller can roll back.
    pub async fn health_check(self, ctx: &Context<'_>) -> TransitionResult<Healthy, RolledOut> {
        ctx.output.progress(&format!(
            "  → Waiting for {} (timeout {}s)...",
            self.settings.health_url,
            self.request.health_timeout.as_secs()
        ));

        let policy = ctx.health_policy(&self.settings, self.request.health_timeout);
        match wait_healthy(ctx.probe, &policy).await {
            Ok(health) => {
                let mut deployment = self;
                deployment.record(
                    Step::HealthCheck,
                    StepStatus::Completed,
                    Some(format!("{} attempt(s)", health.attempts)),
                );
                let RolledOut { backup, image } = deployment.state.clone();
                Ok(deployment.transition(Healthy {
                    backup,
                    image,
                    health,
                }))
            }
            Err(e) => Err((self, e)),
        }
    }
}

// =============================================================================
// Healthy -> finish
// =============================================================================

impl Deployment<Healthy> {
    /// Prune old images and the build cache (best effort) and produce the report.
    pub async fn finish(mut self, ctx: &Context<'_>, diag: &mut Diagnostics) -> DeployReport {
        ctx.output.progress("  → Cleaning up old images...");
        let mut problems = Vec::new();

        match ctx
            .images
            .prune_images(ctx.config.cleanup.image_retention)
            .await
        {
            Ok(summary) => tracing::debug!(
                "Pruned {} image(s), {} bytes reclaimed",
                summary.removed,
                summary.space_reclaimed
            ),
            Err(e) => problems.push(format!("image prune failed: {}", e)),
        }

        if ctx.config.cleanup.build_cache {
            match ctx.images.prune_build_cache().await {
                Ok(summary) => tracing::debug!(
                    "Pruned {} build cache entries, {} bytes reclaimed",
                    summary.removed,
                    summary.space_reclaimed
                ),
                Err(e) => problems.push(format!("build cache prune failed: {}", e)),
            }
        }

        if problems.is_empty() {
            self.record(Step::Cleanup, StepStatus::Completed, None);
        } else {
            let detail = problems.join("; ");
            for problem in problems {
                diag.warn(Warning::prune(problem));
            }
            self.record(Step::Cleanup, StepStatus::Warned, Some(detail));
        }

        DeployReport {
            environment: self.request.environment,
            image: self.state.image.deployed().clone(),
            backup: self.state.backup,
            health: self.state.health,
            steps: self.journal,
        }
    }
}
