// ABOUTME: Compose CLI adapter implementing Preflight and ServiceManager.
// ABOUTME: Also rewrites a service's image reference in a compose file after a registry push.

use super::command;
use super::detection::{ComposeCommand, RuntimeType, detect_compose};
use super::error::{EngineError, FileAccessSnafu, SpawnSnafu};
use super::traits::{Preflight, ServiceManager, Topology};
use crate::config::DatabaseConfig;
use crate::types::ImageRef;
use async_trait::async_trait;
use serde_yaml::Value;
use snafu::ResultExt;
use std::path::Path;
use std::process::Stdio;

/// Compose front-end on the deploy host.
pub struct ComposeCli {
    command: Option<ComposeCommand>,
}

impl ComposeCli {
    /// Detect `docker compose` / `docker-compose` for the given runtime.
    pub async fn detect(runtime: RuntimeType) -> Self {
        let command = detect_compose(runtime).await;
        match &command {
            Some(cmd) => tracing::debug!("Using `{}` for compose operations", cmd),
            None => tracing::debug!("No compose front-end found"),
        }
        Self { command }
    }

    pub fn with_command(command: ComposeCommand) -> Self {
        Self {
            command: Some(command),
        }
    }

    fn command(&self) -> Result<&ComposeCommand, EngineError> {
        self.command.as_ref().ok_or_else(|| EngineError::ToolMissing {
            tool: "docker compose".to_string(),
        })
    }

    fn args<'a>(
        &self,
        topology: &Topology,
        rest: impl IntoIterator<Item = &'a str>,
    ) -> Result<Vec<String>, EngineError> {
        Ok(self.command()?.args(topology_args(topology).into_iter().chain(
            rest.into_iter().map(str::to_string),
        )))
    }

    async fn compose(
        &self,
        topology: &Topology,
        rest: &[&str],
    ) -> Result<(), EngineError> {
        let args = self.args(topology, rest.iter().copied())?;
        command::run_checked(&self.command()?.program, &args, &topology.workdir).await?;
        Ok(())
    }
}

/// Project and file selection shared by every compose invocation.
pub(crate) fn topology_args(topology: &Topology) -> Vec<String> {
    vec![
        "-p".to_string(),
        topology.project.clone(),
        "-f".to_string(),
        topology.compose_file.display().to_string(),
    ]
}

/// Attempts at `pg_isready` before a restore, one second apart.
const DB_READY_ATTEMPTS: u32 = 30;

fn dump_args(database: &DatabaseConfig) -> Vec<&str> {
    vec![
        "exec",
        "-T",
        database.service.as_str(),
        "pg_dump",
        "-U",
        database.user.as_str(),
        "--clean",
        "--if-exists",
        database.name.as_str(),
    ]
}

fn restore_args(database: &DatabaseConfig) -> Vec<&str> {
    vec![
        "exec",
        "-T",
        database.service.as_str(),
        "psql",
        "-U",
        database.user.as_str(),
        "-d",
        database.name.as_str(),
    ]
}

impl ComposeCli {
    /// Start the database service alone and wait until it accepts connections.
    async fn start_database(
        &self,
        topology: &Topology,
        database: &DatabaseConfig,
    ) -> Result<(), EngineError> {
        self.compose(topology, &["up", "-d", database.service.as_str()])
            .await?;

        let program = &self.command()?.program;
        let args = self.args(
            topology,
            ["exec", "-T", database.service.as_str(), "pg_isready", "-U", database.user.as_str()],
        )?;
        for attempt in 1..=DB_READY_ATTEMPTS {
            if command::run(program, &args, &topology.workdir).await?.success {
                return Ok(());
            }
            tracing::debug!("Database not ready (attempt {})", attempt);
            tokio::time::sleep(std::time::Duration::from_secs(1)).await;
        }
        Err(EngineError::command_failed(
            command::render(program, &args),
            format!("not ready after {} attempts", DB_READY_ATTEMPTS),
            "",
        ))
    }
}

#[async_trait]
impl Preflight for ComposeCli {
    async fn check(&self) -> Result<(), EngineError> {
        self.command().map(|_| ())
    }
}

#[async_trait]
impl ServiceManager for ComposeCli {
    async fn pull(&self, topology: &Topology) -> Result<(), EngineError> {
        self.compose(topology, &["pull", "--ignore-pull-failures"])
            .await
    }

    async fn up(&self, topology: &Topology) -> Result<(), EngineError> {
        self.compose(topology, &["up", "-d", "--remove-orphans"])
            .await
    }

    async fn down(&self, topology: &Topology) -> Result<(), EngineError> {
        self.compose(topology, &["down"]).await
    }

    async fn dump_database(
        &self,
        topology: &Topology,
        database: &DatabaseConfig,
        dest: &Path,
    ) -> Result<(), EngineError> {
        let program = self.command()?.program.clone();
        let args = self.args(topology, dump_args(database))?;
        let file = std::fs::File::create(dest).context(FileAccessSnafu { path: dest })?;

        tracing::debug!("Dumping database {} to {}", database.name, dest.display());
        let output = tokio::process::Command::new(&program)
            .args(&args)
            .current_dir(&topology.workdir)
            .stdin(Stdio::null())
            .stdout(Stdio::from(file))
            .stderr(Stdio::piped())
            .output()
            .await
            .context(SpawnSnafu { program: &program })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(EngineError::command_failed(
                command::render(&program, &args),
                output.status.to_string(),
                command::tail(&String::from_utf8_lossy(&output.stderr)),
            ))
        }
    }

    async fn restore_database(
        &self,
        topology: &Topology,
        database: &DatabaseConfig,
        source: &Path,
    ) -> Result<(), EngineError> {
        self.start_database(topology, database).await?;

        let program = self.command()?.program.clone();
        let args = self.args(topology, restore_args(database))?;
        let file = std::fs::File::open(source).context(FileAccessSnafu { path: source })?;

        tracing::debug!("Restoring database {} from {}", database.name, source.display());
        let output = tokio::process::Command::new(&program)
            .args(&args)
            .current_dir(&topology.workdir)
            .stdin(Stdio::from(file))
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .output()
            .await
            .context(SpawnSnafu { program: &program })?;

        if output.status.success() {
            Ok(())
        } else {
            Err(EngineError::command_failed(
                command::render(&program, &args),
                output.status.to_string(),
                command::tail(&String::from_utf8_lossy(&output.stderr)),
            ))
        }
    }
}

/// Point `services.<service>.image` in the compose file at `image`.
pub fn rewrite_service_image(
    compose_file: &Path,
    service: &str,
    image: &ImageRef,
) -> Result<(), EngineError> {
    let rewrite_error = |message: String| EngineError::ComposeRewrite {
        path: compose_file.to_path_buf(),
        message,
    };

    let content =
        std::fs::read_to_string(compose_file).context(FileAccessSnafu { path: compose_file })?;
    let mut document: Value =
        serde_yaml::from_str(&content).map_err(|e| rewrite_error(e.to_string()))?;

    let entry = document
        .get_mut("services")
        .and_then(|services| services.get_mut(service))
        .and_then(Value::as_mapping_mut)
        .ok_or_else(|| rewrite_error(format!("service '{}' not found", service)))?;
    entry.insert(
        Value::String("image".to_string()),
        Value::String(image.to_string()),
    );

    let updated = serde_yaml::to_string(&document).map_err(|e| rewrite_error(e.to_string()))?;
    std::fs::write(compose_file, updated).context(FileAccessSnafu { path: compose_file })?;
    Ok(())
}
