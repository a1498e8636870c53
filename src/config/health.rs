// ABOUTME: Health check polling configuration.
// ABOUTME: Fixed poll interval, overall deadline and per-probe timeout with defaults.

use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct HealthConfig {
    #[serde(default = "default_interval", with = "humantime_serde")]
    pub interval: Duration,

    #[serde(default = "default_timeout", with = "humantime_serde")]
    pub timeout: Duration,

    #[serde(default = "default_probe_timeout", with = "humantime_serde")]
    pub probe_timeout: Duration,

    #[serde(default = "default_url")]
    pub url: String,
}

pub(crate) fn default_interval() -> Duration {
    Duration::from_secs(5)
}

pub(crate) fn default_timeout() -> Duration {
    Duration::from_secs(300)
}

fn default_probe_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_url() -> String {
    "http://localhost:5001/api/health".to_string()
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            timeout: default_timeout(),
            probe_timeout: default_probe_timeout(),
            url: default_url(),
        }
    }
}
