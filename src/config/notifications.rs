// ABOUTME: Notification sink configuration (webhook and SMTP email).
// ABOUTME: Both sinks are optional; secrets support env var interpolation.

use nonempty::NonEmpty;
use serde::Deserialize;
use std::time::Duration;

use super::EnvValue;
use super::deserialize::deserialize_recipients;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default)]
    pub webhook: Option<WebhookConfig>,

    #[serde(default)]
    pub email: Option<EmailConfig>,
}

/// Slack-compatible incoming webhook.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookConfig {
    pub url: EnvValue,

    #[serde(default = "default_webhook_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

fn default_webhook_timeout() -> Duration {
    Duration::from_secs(10)
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailConfig {
    pub smtp_host: String,

    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,

    #[serde(default)]
    pub username: Option<String>,

    #[serde(default)]
    pub password: Option<EnvValue>,

    pub from: String,

    #[serde(deserialize_with = "deserialize_recipients")]
    pub to: NonEmpty<String>,
}

fn default_smtp_port() -> u16 {
    25
}
