// ABOUTME: Configuration types and parsing for deploy.yml.
// ABOUTME: Handles YAML parsing, defaults, env var interpolation and per-environment resolution.

mod backup;
mod deserialize;
mod env_value;
mod health;
mod notifications;

pub use backup::{BackupConfig, BackupFailurePolicy, DatabaseConfig};
pub use env_value::EnvValue;
pub use health::HealthConfig;
pub use notifications::{EmailConfig, NotificationsConfig, WebhookConfig};

use crate::error::{Error, Result};
use crate::types::{Environment, ImageRef, ProjectName};
use deserialize::{deserialize_image_ref, deserialize_project_name};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_FILENAME: &str = "deploy.yml";
pub const CONFIG_FILENAME_ALT: &str = "deploy.yaml";
pub const CONFIG_FILENAME_DIR: &str = ".deploy/config.yml";

/// Env file docker compose reads by default; rollout copies the environment's settings here.
pub const ACTIVE_ENV_FILE: &str = ".env";
pub const DEFAULT_COMPOSE_FILE: &str = "docker-compose.yml";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(
        default = "default_project",
        deserialize_with = "deserialize_project_name"
    )]
    pub project: ProjectName,

    #[serde(default = "default_image", deserialize_with = "deserialize_image_ref")]
    pub image: ImageRef,

    #[serde(default)]
    pub build: BuildConfig,

    #[serde(default)]
    pub tests: TestsConfig,

    #[serde(default)]
    pub backup: BackupConfig,

    #[serde(default)]
    pub health: HealthConfig,

    #[serde(default)]
    pub cleanup: CleanupConfig,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    /// Keys every settings file must define with a non-empty value.
    #[serde(default)]
    pub required_vars: Vec<String>,

    #[serde(default)]
    pub environments: HashMap<Environment, EnvironmentConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BuildConfig {
    #[serde(default = "default_context")]
    pub context: PathBuf,

    #[serde(default)]
    pub dockerfile: Option<PathBuf>,

    /// Multi-stage build target.
    #[serde(default = "default_target")]
    pub target: Option<String>,

    /// Registry prefix to publish to, e.g. `ghcr.io/heckx`. No push when unset.
    #[serde(default)]
    pub registry: Option<String>,

    /// Compose service whose `image:` is rewritten after a push.
    #[serde(default = "default_app_service")]
    pub app_service: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TestsConfig {
    #[serde(default = "default_test_command")]
    pub command: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupConfig {
    /// Images older than this are pruned after a successful deployment.
    #[serde(default = "default_image_retention", with = "humantime_serde")]
    pub image_retention: Duration,

    #[serde(default = "default_true")]
    pub build_cache: bool,
}

/// Per-environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct EnvironmentConfig {
    #[serde(default)]
    pub health_url: Option<String>,

    #[serde(default, with = "humantime_serde")]
    pub health_timeout: Option<Duration>,

    #[serde(default)]
    pub settings_file: Option<PathBuf>,

    #[serde(default)]
    pub compose_file: Option<PathBuf>,

    /// Required in this environment on top of the global `required_vars`.
    #[serde(default)]
    pub required_vars: Vec<String>,
}

/// Configuration resolved for one environment inside a project directory.
#[derive(Debug, Clone)]
pub struct EnvironmentSettings {
    pub environment: Environment,
    pub project_dir: PathBuf,
    pub settings_file: PathBuf,
    pub active_env_file: PathBuf,
    pub compose_file: PathBuf,
    pub health_url: String,
    /// Keys the settings file must define, global ones first.
    pub required_vars: Vec<String>,
}

fn default_project() -> ProjectName {
    ProjectName::new("heckx-ai-assistant").expect("default project name is valid")
}

fn default_image() -> ImageRef {
    ImageRef::parse("heckx-video-generator").expect("default image is valid")
}

fn default_context() -> PathBuf {
    PathBuf::from(".")
}

fn default_target() -> Option<String> {
    Some("production".to_string())
}

fn default_app_service() -> String {
    "app".to_string()
}

fn default_test_command() -> Vec<String> {
    vec!["python".into(), "-m".into(), "pytest".into()]
}

fn default_image_retention() -> Duration {
    Duration::from_secs(168 * 60 * 60)
}

fn default_true() -> bool {
    true
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            context: default_context(),
            dockerfile: None,
            target: default_target(),
            registry: None,
            app_service: default_app_service(),
        }
    }
}

impl Default for TestsConfig {
    fn default() -> Self {
        Self {
            command: default_test_command(),
        }
    }
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            image_retention: default_image_retention(),
            build_cache: true,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            project: default_project(),
            image: default_image(),
            build: BuildConfig::default(),
            tests: TestsConfig::default(),
            backup: BackupConfig::default(),
            health: HealthConfig::default(),
            cleanup: CleanupConfig::default(),
            notifications: NotificationsConfig::default(),
            required_vars: Vec::new(),
            environments: HashMap::new(),
        }
    }
}

impl Config {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| Error::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    /// Path of the config file in `dir`, if any.
    pub fn find(dir: &Path) -> Option<PathBuf> {
        [CONFIG_FILENAME, CONFIG_FILENAME_ALT, CONFIG_FILENAME_DIR]
            .iter()
            .map(|name| dir.join(name))
            .find(|path| path.is_file())
    }

    /// Load the config from `dir`, falling back to defaults when no file exists.
    pub fn discover(dir: &Path) -> Result<Self> {
        match Self::find(dir) {
            Some(path) => {
                tracing::debug!("Loading configuration from {}", path.display());
                Self::load(&path)
            }
            None => {
                tracing::debug!("No deploy.yml in {}, using defaults", dir.display());
                Ok(Self::default())
            }
        }
    }

    /// Resolve file locations and health settings for one environment.
    pub fn for_environment(&self, environment: Environment, project_dir: &Path) -> EnvironmentSettings {
        let overrides = self
            .environments
            .get(&environment)
            .cloned()
            .unwrap_or_default();

        let settings_file = project_dir.join(
            overrides
                .settings_file
                .unwrap_or_else(|| PathBuf::from(environment.settings_file_name())),
        );

        let compose_file = match overrides.compose_file {
            Some(file) => project_dir.join(file),
            None => {
                let specific = project_dir.join(environment.compose_file_name());
                if specific.is_file() {
                    specific
                } else {
                    project_dir.join(DEFAULT_COMPOSE_FILE)
                }
            }
        };

        EnvironmentSettings {
            environment,
            project_dir: project_dir.to_path_buf(),
            settings_file,
            active_env_file: project_dir.join(ACTIVE_ENV_FILE),
            compose_file,
            health_url: overrides
                .health_url
                .unwrap_or_else(|| self.health.url.clone()),
            required_vars: required_vars(&self.required_vars, &overrides.required_vars),
        }
    }

    /// Health-check timeout for an environment: its override, else the global one.
    pub fn health_timeout(&self, environment: Environment) -> Duration {
        self.environments
            .get(&environment)
            .and_then(|env| env.health_timeout)
            .unwrap_or(self.health.timeout)
    }

    /// Backup root, relative paths resolved against the project directory.
    pub fn backup_root(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.backup.dir)
    }
}

impl EnvironmentSettings {
    /// Required keys the settings file leaves undefined or empty, in order.
    ///
    /// # Errors
    ///
    /// Returns the parse error when the settings file is not valid dotenv.
    pub fn missing_required_vars(&self) -> std::result::Result<Vec<String>, dotenvy::Error> {
        if self.required_vars.is_empty() {
            return Ok(Vec::new());
        }

        let mut defined = HashMap::new();
        for entry in dotenvy::from_path_iter(&self.settings_file)? {
            let (key, value) = entry?;
            defined.insert(key, value);
        }

        Ok(self
            .required_vars
            .iter()
            .filter(|var| defined.get(*var).is_none_or(|value| value.trim().is_empty()))
            .cloned()
            .collect())
    }
}

fn required_vars(global: &[String], environment: &[String]) -> Vec<String> {
    let mut vars = global.to_vec();
    for var in environment {
        if !vars.contains(var) {
            vars.push(var.clone());
        }
    }
    vars
}
