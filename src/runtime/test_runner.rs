// ABOUTME: Runs the project's test command as a child process.
// ABOUTME: Output is captured; a failing suite reports the tail of its output.

use super::command;
use super::error::EngineError;
use super::traits::TestRunner;
use async_trait::async_trait;
use std::path::Path;

/// Test runner executing a command line such as `python -m pytest`.
#[derive(Debug, Default, Clone, Copy)]
pub struct ShellTestRunner;

#[async_trait]
impl TestRunner for ShellTestRunner {
    async fn run_tests(&self, cmd: &[String], workdir: &Path) -> Result<(), EngineError> {
        let Some((program, args)) = cmd.split_first() else {
            return Err(EngineError::ToolMissing {
                tool: "test command (empty)".to_string(),
            });
        };

        let output = command::run(program, args, workdir).await?;
        if output.success {
            return Ok(());
        }

        // pytest reports failures on stdout
        let mut detail = command::tail(&output.stdout);
        if detail.is_empty() {
            detail = command::tail(&output.stderr);
        }
        Err(EngineError::command_failed(
            command::render(program, args),
            output.status_text(),
            detail,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn passing_command_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        ShellTestRunner
            .run_tests(&["true".to_string()], dir.path())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn failing_command_reports_output() {
        let dir = tempfile::tempdir().unwrap();
        let cmd = vec![
            "sh".to_string(),
            "-c".to_string(),
            "echo '1 failed, 3 passed'; exit 1".to_string(),
        ];
        let err = ShellTestRunner.run_tests(&cmd, dir.path()).await.unwrap_err();
        assert!(err.to_string().contains("1 failed, 3 passed"));
    }

    #[tokio::test]
    async fn empty_command_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ShellTestRunner.run_tests(&[], dir.path()).await.is_err());
    }
}
