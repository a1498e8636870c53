// ABOUTME: Integration tests for deploy.yml parsing and per-environment resolution.
// ABOUTME: Covers a full configuration, discovery, validation errors and env interpolation.

use heckx_deploy::config::{BackupFailurePolicy, Config, EnvValue};
use heckx_deploy::deploy::{DeployFlags, DeployRequest};
use heckx_deploy::notify::Notifiers;
use heckx_deploy::types::{Environment, ImageRef};
use proptest::prelude::*;
use std::path::Path;
use std::time::Duration;

const FULL: &str = r#"
project: heckx
image: heckx-video-generator
build:
  context: backend
  dockerfile: backend/Dockerfile
  target: production
  registry: ghcr.io/heckx
  app_service: web
tests:
  command: ["pytest", "-q"]
backup:
  dir: /var/backups/heckx
  keep: 5
  max_age: 7d
  on_failure: warn
  database:
    service: db
    user: heckx
    name: heckx_prod
health:
  interval: 2s
  timeout: 90s
  url: http://localhost:8080/healthz
cleanup:
  image_retention: 72h
  build_cache: false
notifications:
  webhook:
    url:
      env: HECKX_TEST_SLACK_URL
      default: https://hooks.slack.invalid/services/x
  email:
    smtp_host: smtp.example.com
    smtp_port: 587
    username: deploy
    password:
      env: HECKX_TEST_SMTP_PASSWORD
      default: secret
    from: deploy@example.com
    to: ops@example.com
environments:
  staging:
    health_url: http://localhost:8081/healthz
    health_timeout: 45s
  production:
    compose_file: compose/prod.yml
"#;

#[test]
fn full_config_parses() {
    let config = Config::from_yaml(FULL).unwrap();

    assert_eq!(config.project.as_str(), "heckx");
    assert_eq!(config.image, ImageRef::parse("heckx-video-generator:latest").unwrap());
    assert_eq!(config.build.registry.as_deref(), Some("ghcr.io/heckx"));
    assert_eq!(config.build.app_service, "web");
    assert_eq!(config.tests.command, vec!["pytest", "-q"]);
    assert_eq!(config.backup.keep, 5);
    assert_eq!(config.backup.max_age, Some(Duration::from_secs(7 * 24 * 3600)));
    assert_eq!(config.backup.on_failure, BackupFailurePolicy::Warn);
    assert_eq!(config.backup.database.as_ref().unwrap().service, "db");
    assert_eq!(config.health.interval, Duration::from_secs(2));
    assert_eq!(config.cleanup.image_retention, Duration::from_secs(72 * 3600));
    assert!(!config.cleanup.build_cache);
    assert_eq!(config.notifications.email.as_ref().unwrap().to.len(), 1);
}

#[test]
fn environment_overrides_resolve_against_project_dir() {
    let config = Config::from_yaml(FULL).unwrap();
    let dir = Path::new("/srv/heckx");

    let staging = config.for_environment(Environment::Staging, dir);
    assert_eq!(staging.health_url, "http://localhost:8081/healthz");
    assert_eq!(config.health_timeout(Environment::Staging), Duration::from_secs(45));
    assert_eq!(staging.settings_file, dir.join(".env.staging"));
    assert_eq!(staging.active_env_file, dir.join(".env"));

    let production = config.for_environment(Environment::Production, dir);
    assert_eq!(production.compose_file, dir.join("compose/prod.yml"));
    assert_eq!(production.health_url, "http://localhost:8080/healthz");
    assert_eq!(config.health_timeout(Environment::Production), Duration::from_secs(90));

    assert_eq!(config.backup_root(dir), Path::new("/var/backups/heckx"));
}

#[test]
fn request_timeout_prefers_cli_then_environment_then_global() {
    let config = Config::from_yaml(FULL).unwrap();
    let timeout = |env, cli| {
        DeployRequest::new(env, DeployFlags::default(), "/srv/heckx", cli, &config).health_timeout
    };

    assert_eq!(
        timeout(Environment::Staging, Some(Duration::from_secs(5))),
        Duration::from_secs(5)
    );
    assert_eq!(timeout(Environment::Staging, None), Duration::from_secs(45));
    assert_eq!(timeout(Environment::Development, None), Duration::from_secs(90));
}

#[test]
fn discover_falls_back_to_defaults_and_finds_alternatives() {
    let dir = tempfile::tempdir().unwrap();
    let config = Config::discover(dir.path()).unwrap();
    assert_eq!(config.project.as_str(), "heckx-ai-assistant");

    std::fs::create_dir(dir.path().join(".deploy")).unwrap();
    std::fs::write(dir.path().join(".deploy/config.yml"), "project: from-dir\n").unwrap();
    assert_eq!(Config::discover(dir.path()).unwrap().project.as_str(), "from-dir");

    std::fs::write(dir.path().join("deploy.yml"), "project: from-root\n").unwrap();
    assert_eq!(Config::discover(dir.path()).unwrap().project.as_str(), "from-root");
}

#[test]
fn invalid_values_are_rejected() {
    assert!(Config::from_yaml("project: Heckx\n").is_err());
    assert!(Config::from_yaml("image: 'bad image'\n").is_err());
    assert!(Config::from_yaml("backup:\n  on_failure: ignore\n").is_err());
    assert!(Config::from_yaml("health:\n  timeout: soon\n").is_err());
    assert!(Config::from_yaml("environments:\n  qa: {}\n").is_err());
    assert!(
        Config::from_yaml(
            "notifications:\n  email:\n    smtp_host: h\n    from: a@b.c\n    to: []\n"
        )
        .is_err()
    );
}

#[tokio::test]
async fn notifier_secrets_come_from_the_environment() {
    temp_env::with_vars(
        [
            ("HECKX_TEST_SLACK_URL", Some("https://hooks.slack.invalid/from-env")),
            ("HECKX_TEST_SMTP_PASSWORD", None),
        ],
        || {
            let config = Config::from_yaml(FULL).unwrap();
            let webhook = config.notifications.webhook.as_ref().unwrap();
            assert_eq!(
                webhook.url.resolve().unwrap(),
                "https://hooks.slack.invalid/from-env"
            );
            let notifiers = Notifiers::from_config(&config.notifications).unwrap();
            assert!(!notifiers.is_empty());
        },
    );
}

#[test]
fn missing_secret_without_default_fails() {
    temp_env::with_var_unset("HECKX_TEST_MISSING_SECRET", || {
        let value = EnvValue::FromEnv {
            var: "HECKX_TEST_MISSING_SECRET".to_string(),
            default: None,
        };
        let err = value.resolve().unwrap_err();
        assert!(err.to_string().contains("HECKX_TEST_MISSING_SECRET"));
    });
}

proptest! {
    #[test]
    fn environment_names_round_trip(env in prop_oneof![
        Just(Environment::Development),
        Just(Environment::Staging),
        Just(Environment::Production),
    ]) {
        let parsed: Environment = env.as_str().to_uppercase().parse().unwrap();
        prop_assert_eq!(parsed, env);
    }

    #[test]
    fn unique_tags_are_valid_image_tags(secs in 0i64..4_102_444_800) {
        let at = chrono::DateTime::from_timestamp(secs, 0).unwrap();
        let tag = heckx_deploy::deploy::unique_tag(Environment::Staging, at);
        prop_assert!(ImageRef::parse("heckx-video-generator").unwrap().with_tag(&tag).is_ok());
    }
}
