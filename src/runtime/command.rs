// ABOUTME: Thin wrapper around tokio::process for running external tools.
// ABOUTME: Captures output, renders commands for messages and maps failures to EngineError.

use snafu::ResultExt;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::error::{EngineError, SpawnSnafu};

/// Lines of stderr kept in error messages.
const STDERR_TAIL_LINES: usize = 20;

/// Captured result of an external command.
#[derive(Debug)]
pub struct CommandOutput {
    pub success: bool,
    pub exit_code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

impl CommandOutput {
    /// Human-readable exit status.
    pub fn status_text(&self) -> String {
        match self.exit_code {
            Some(code) => format!("exit code {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Run `program args..` in `cwd`, capturing stdout and stderr.
pub async fn run(program: &str, args: &[String], cwd: &Path) -> Result<CommandOutput, EngineError> {
    tracing::debug!("Running `{}` in {}", render(program, args), cwd.display());

    let output = Command::new(program)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await
        .context(SpawnSnafu { program })?;

    Ok(CommandOutput {
        success: output.status.success(),
        exit_code: output.status.code(),
        stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Like [`run`], but an unsuccessful exit becomes `EngineError::CommandFailed`.
pub async fn run_checked(
    program: &str,
    args: &[String],
    cwd: &Path,
) -> Result<CommandOutput, EngineError> {
    let output = run(program, args, cwd).await?;
    if output.success {
        Ok(output)
    } else {
        Err(EngineError::command_failed(
            render(program, args),
            output.status_text(),
            tail(&output.stderr),
        ))
    }
}

/// Render a command line for logs and error messages.
pub fn render(program: &str, args: &[String]) -> String {
    std::iter::once(program)
        .chain(args.iter().map(String::as_str))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Last few non-empty lines of command output.
pub fn tail(text: &str) -> String {
    let lines: Vec<&str> = text.lines().filter(|l| !l.trim().is_empty()).collect();
    let start = lines.len().saturating_sub(STDERR_TAIL_LINES);
    lines[start..].join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_joins_program_and_args() {
        let args = vec!["compose".to_string(), "up".to_string(), "-d".to_string()];
        assert_eq!(render("docker", &args), "docker compose up -d");
    }

    #[test]
    fn tail_keeps_last_lines() {
        let text = (1..=30)
            .map(|i| format!("line {}", i))
            .collect::<Vec<_>>()
            .join("\n");
        let tailed = tail(&text);
        assert!(tailed.starts_with("line 11"));
        assert!(tailed.ends_with("line 30"));
    }

    #[tokio::test]
    async fn missing_program_is_a_spawn_error() {
        let err = run("heckx-definitely-not-installed", &[], Path::new("."))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Spawn { .. }));
    }
}
