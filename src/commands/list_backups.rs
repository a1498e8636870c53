// ABOUTME: List-backups command implementation.
// ABOUTME: Prints an environment's backups newest first and marks the rollback target.

use heckx_deploy::backup::{BackupEntry, BackupStore};
use heckx_deploy::config::Config;
use heckx_deploy::deploy::DeployError;
use heckx_deploy::error::Result;
use heckx_deploy::output::{Output, OutputMode};
use heckx_deploy::types::Environment;
use serde::Serialize;
use std::path::Path;

#[derive(Serialize)]
struct ListedBackup<'a> {
    path: &'a Path,
    environment: Environment,
    created_at: String,
    size: u64,
    artifacts: Vec<&'a str>,
    last: bool,
}

impl<'a> From<&'a BackupEntry> for ListedBackup<'a> {
    fn from(entry: &'a BackupEntry) -> Self {
        Self {
            path: &entry.record.path,
            environment: entry.record.environment,
            created_at: entry.record.created_at.to_rfc3339(),
            size: entry.size,
            artifacts: entry.record.artifacts(),
            last: entry.is_last,
        }
    }
}

/// Print every backup of `environment`.
pub fn list_backups(
    config: &Config,
    environment: Environment,
    project_dir: &Path,
    output: &Output,
) -> Result<()> {
    let store = BackupStore::new(config.backup_root(project_dir));
    let entries = store
        .list(Some(environment))
        .map_err(DeployError::from)?;

    if output.mode() == OutputMode::Json {
        for entry in &entries {
            output.record("backup", &ListedBackup::from(entry));
        }
        return Ok(());
    }

    if entries.is_empty() {
        println!(
            "No backups for {} in {}",
            environment,
            store.root().display()
        );
        return Ok(());
    }

    println!("Backups for {} (newest first):", environment);
    for entry in &entries {
        let marker = if entry.is_last { "*" } else { " " };
        println!(
            "{} {}  {}  {}  [{}]",
            marker,
            entry.record.name(),
            entry.record.created_at.format("%Y-%m-%d %H:%M:%S UTC"),
            human_size(entry.size),
            entry.record.artifacts().join(", ")
        );
    }
    println!("* last backup (rollback target)");
    Ok(())
}

fn human_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{} {}", bytes, UNITS[0])
    } else {
        format!("{:.1} {}", size, UNITS[unit])
    }
}
