// ABOUTME: Integration tests for backup capture and restore.
// ABOUTME: Exercises the store, pointer and artifacts through the fake service manager.

mod support;

use heckx_deploy::backup::{self, BackupPlan, BackupStore, POINTER_FILE};
use heckx_deploy::runtime::Topology;
use heckx_deploy::types::Environment;
use support::{FakeHost, Project};

fn topology(project: &Project) -> Topology {
    Topology {
        project: "heckx-ai-assistant-production".to_string(),
        compose_file: project.path().join("docker-compose.yml"),
        workdir: project.path().to_path_buf(),
    }
}

#[tokio::test]
async fn capture_records_pointer_and_manifest() {
    let project = Project::with_config("project: heckx-ai-assistant\n");
    let host = FakeHost::healthy();
    let store = BackupStore::new(project.path().join("backups"));
    let settings = project
        .config
        .for_environment(Environment::Production, project.path());
    let plan = BackupPlan::for_environment(&project.config, &settings);

    let record = backup::capture(&store, &plan, &host, &topology(&project))
        .await
        .unwrap();

    assert!(store.root().join(POINTER_FILE).is_file());
    assert_eq!(store.last_record().unwrap(), record);
    assert_eq!(
        record.artifacts(),
        vec![
            ".env.production",
            "docker-compose.yml",
            "deploy.yml",
            "database.sql",
            "data.tar.gz"
        ]
    );
    assert!(host.calls.contains("dump heckx"));
}

#[tokio::test]
async fn failed_capture_keeps_previous_pointer() {
    let project = Project::new();
    let store = BackupStore::new(project.path().join("backups"));
    let settings = project
        .config
        .for_environment(Environment::Production, project.path());
    let plan = BackupPlan::for_environment(&project.config, &settings);

    let first = backup::capture(&store, &plan, &FakeHost::healthy(), &topology(&project))
        .await
        .unwrap();
    let failing = FakeHost::healthy().fail("dump");
    backup::capture(&store, &plan, &failing, &topology(&project))
        .await
        .unwrap_err();

    assert_eq!(store.last().unwrap().path, first.path);
    assert_eq!(store.list(None).unwrap().len(), 1);
}

#[tokio::test]
async fn restore_files_puts_configuration_back() {
    let project = Project::new();
    let store = BackupStore::new(project.path().join("backups"));
    let settings = project
        .config
        .for_environment(Environment::Production, project.path());
    let plan = BackupPlan::for_environment(&project.config, &settings);
    let record = backup::capture(&store, &plan, &FakeHost::healthy(), &topology(&project))
        .await
        .unwrap();

    project.write(".env.production", "FLASK_ENV=tampered\n");
    std::fs::remove_dir_all(project.path().join("data")).unwrap();

    backup::restore_files(&record, project.path()).unwrap();

    assert_eq!(project.read(".env.production"), "FLASK_ENV=production\n");
    assert_eq!(project.read("data/videos.json"), "[]");
}
