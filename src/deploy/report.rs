// ABOUTME: Step journal and result types of a deployment or rollback run.
// ABOUTME: Reports serialize for JSON output.

use serde::Serialize;
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use super::health::HealthReport;
use crate::backup::BackupRecord;
use crate::types::{Environment, ImageRef};

/// Named pipeline steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    Validate,
    Test,
    Backup,
    Build,
    Rollout,
    HealthCheck,
    Cleanup,
}

impl Step {
    pub fn as_str(&self) -> &'static str {
        match self {
            Step::Validate => "validate",
            Step::Test => "test",
            Step::Backup => "backup",
            Step::Build => "build",
            Step::Rollout => "rollout",
            Step::HealthCheck => "health_check",
            Step::Cleanup => "cleanup",
        }
    }

    /// Failures at this step trigger automatic rollback in production.
    pub fn triggers_rollback(&self) -> bool {
        matches!(self, Step::Rollout | Step::HealthCheck)
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Completed,
    Skipped,
    /// Completed with a non-fatal problem.
    Warned,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepRecord {
    pub step: Step,
    pub status: StepStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl StepRecord {
    pub fn new(step: Step, status: StepStatus) -> Self {
        Self {
            step,
            status,
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

/// Image produced by the build step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuiltImage {
    /// Unique tag, `{environment}-{YYYYmmdd-HHMMSS}`.
    pub tag: String,
    pub local: ImageRef,
    pub latest: ImageRef,
    /// Registry reference, when a registry is configured.
    pub published: Option<ImageRef>,
}

impl BuiltImage {
    /// The reference services run.
    pub fn deployed(&self) -> &ImageRef {
        self.published.as_ref().unwrap_or(&self.local)
    }
}

/// Result of a successful deployment.
#[derive(Debug, Clone, Serialize)]
pub struct DeployReport {
    pub environment: Environment,
    #[serde(serialize_with = "ser::display")]
    pub image: ImageRef,
    #[serde(serialize_with = "ser::backup_path")]
    pub backup: Option<BackupRecord>,
    #[serde(serialize_with = "ser::health")]
    pub health: HealthReport,
    pub steps: Vec<StepRecord>,
}

/// Result of a successful rollback.
#[derive(Debug, Clone, Serialize)]
pub struct RollbackReport {
    pub environment: Environment,
    pub backup: PathBuf,
    #[serde(serialize_with = "ser::health")]
    pub health: HealthReport,
}

mod ser {
    use super::*;
    use serde::Serializer;
    use serde::ser::SerializeStruct;

    pub fn display<S: Serializer>(value: &ImageRef, s: S) -> Result<S::Ok, S::Error> {
        s.collect_str(value)
    }

    pub fn backup_path<S: Serializer>(
        value: &Option<BackupRecord>,
        s: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(record) => s.serialize_some(&record.path),
            None => s.serialize_none(),
        }
    }

    pub fn health<S: Serializer>(value: &HealthReport, s: S) -> Result<S::Ok, S::Error> {
        let mut st = s.serialize_struct("HealthReport", 2)?;
        st.serialize_field("attempts", &value.attempts)?;
        st.serialize_field("elapsed_secs", &secs(value.elapsed))?;
        st.end()
    }

    fn secs(d: Duration) -> f64 {
        d.as_secs_f64()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_rollout_and_health_check_trigger_rollback() {
        let triggering: Vec<Step> = [
            Step::Validate,
            Step::Test,
            Step::Backup,
            Step::Build,
            Step::Rollout,
            Step::HealthCheck,
            Step::Cleanup,
        ]
        .into_iter()
        .filter(Step::triggers_rollback)
        .collect();
        assert_eq!(triggering, vec![Step::Rollout, Step::HealthCheck]);
    }

    #[test]
    fn deployed_prefers_published_reference() {
        let local = ImageRef::parse("heckx-video-generator:staging-20260101-000000").unwrap();
        let mut image = BuiltImage {
            tag: "staging-20260101-000000".to_string(),
            latest: local.with_tag("latest").unwrap(),
            local: local.clone(),
            published: None,
        };
        assert_eq!(image.deployed(), &local);

        let published = local.in_registry("ghcr.io/heckx").unwrap();
        image.published = Some(published.clone());
        assert_eq!(image.deployed(), &published);
    }

    #[test]
    fn report_serializes_health_in_seconds() {
        let report = RollbackReport {
            environment: Environment::Production,
            backup: PathBuf::from("backups/production-20260101_000000"),
            health: HealthReport {
                attempts: 2,
                elapsed: Duration::from_secs(5),
            },
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["health"]["attempts"], 2);
        assert_eq!(json["health"]["elapsed_secs"], 5.0);
        assert_eq!(json["environment"], "production");
    }
}
