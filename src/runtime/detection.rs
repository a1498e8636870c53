// ABOUTME: Local runtime detection: container sockets and the compose front-end.
// ABOUTME: Checks Podman sockets first, then Docker; prefers `docker compose` over `docker-compose`.

use std::path::Path;

/// The container runtime type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeType {
    Docker,
    Podman,
}

impl RuntimeType {
    /// CLI program driving this runtime.
    pub fn program(&self) -> &'static str {
        match self {
            RuntimeType::Docker => "docker",
            RuntimeType::Podman => "podman",
        }
    }
}

impl std::fmt::Display for RuntimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.program())
    }
}

/// Detected runtime information.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeInfo {
    pub runtime_type: RuntimeType,
    pub socket_path: String,
}

/// Error during runtime detection.
#[derive(Debug, thiserror::Error)]
pub enum DetectionError {
    #[error("no container runtime found (checked DOCKER_HOST, Podman and Docker sockets)")]
    NoRuntimeFound,
}

const ROOTFUL_PODMAN: &str = "/run/podman/podman.sock";
const DOCKER_SOCKET: &str = "/var/run/docker.sock";

/// Detect the container runtime on this host.
///
/// Detection order:
/// 1. `DOCKER_HOST` when it names a unix socket
/// 2. Rootless Podman socket (`/run/user/$UID/podman/podman.sock`)
/// 3. Rootful Podman socket (`/run/podman/podman.sock`)
/// 4. Docker socket (`/var/run/docker.sock`)
pub fn detect_local() -> Result<RuntimeInfo, DetectionError> {
    if let Some(socket) = std::env::var("DOCKER_HOST")
        .ok()
        .and_then(|host| host.strip_prefix("unix://").map(str::to_string))
    {
        let runtime_type = if socket.contains("podman") {
            RuntimeType::Podman
        } else {
            RuntimeType::Docker
        };
        return Ok(RuntimeInfo {
            runtime_type,
            socket_path: socket,
        });
    }

    if let Some(uid) = get_uid() {
        let rootless_socket = format!("/run/user/{}/podman/podman.sock", uid);
        if Path::new(&rootless_socket).exists() {
            return Ok(RuntimeInfo {
                runtime_type: RuntimeType::Podman,
                socket_path: rootless_socket,
            });
        }
    }

    if Path::new(ROOTFUL_PODMAN).exists() {
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::Podman,
            socket_path: ROOTFUL_PODMAN.to_string(),
        });
    }

    if Path::new(DOCKER_SOCKET).exists() {
        return Ok(RuntimeInfo {
            runtime_type: RuntimeType::Docker,
            socket_path: DOCKER_SOCKET.to_string(),
        });
    }

    Err(DetectionError::NoRuntimeFound)
}

fn get_uid() -> Option<String> {
    std::env::var("UID").ok().or_else(|| {
        std::fs::read_to_string("/proc/self/status")
            .ok()
            .and_then(|s| {
                s.lines()
                    .find(|l| l.starts_with("Uid:"))
                    .and_then(|l| l.split_whitespace().nth(1))
                    .map(|s| s.to_string())
            })
    })
}

/// How compose is invoked on this host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposeCommand {
    pub program: String,
    /// Leading arguments, e.g. `["compose"]` for the docker plugin.
    pub prefix: Vec<String>,
}

impl ComposeCommand {
    /// `docker compose` (v2 plugin), or `podman compose` on Podman hosts.
    pub fn plugin(runtime: RuntimeType) -> Self {
        Self {
            program: runtime.program().to_string(),
            prefix: vec!["compose".to_string()],
        }
    }

    /// Standalone `docker-compose` (v1).
    pub fn standalone() -> Self {
        Self {
            program: "docker-compose".to_string(),
            prefix: Vec::new(),
        }
    }

    /// Full argument list for a compose subcommand.
    pub fn args<I, S>(&self, rest: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.prefix
            .iter()
            .cloned()
            .chain(rest.into_iter().map(Into::into))
            .collect()
    }
}

impl std::fmt::Display for ComposeCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.prefix {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}

/// Pick the compose front-end: the plugin when `<runtime> compose version`
/// succeeds, else standalone `docker-compose` when it is on `PATH`.
pub async fn detect_compose(runtime: RuntimeType) -> Option<ComposeCommand> {
    let plugin = ComposeCommand::plugin(runtime);
    if succeeds(&plugin.program, &plugin.args(["version"])).await {
        return Some(plugin);
    }

    let standalone = ComposeCommand::standalone();
    if succeeds("which", &[standalone.program.clone()]).await {
        return Some(standalone);
    }

    None
}

async fn succeeds(program: &str, args: &[String]) -> bool {
    tokio::process::Command::new(program)
        .args(args)
        .stdin(std::process::Stdio::null())
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .await
        .map(|status| status.success())
        .unwrap_or(false)
}
