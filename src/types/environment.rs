// ABOUTME: Deployment target environments.
// ABOUTME: Parses development/staging/production and exposes per-environment conventions.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown environment '{0}' (expected development, staging or production)")]
pub struct ParseEnvironmentError(pub String);

/// A named deployment target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Staging,
    #[default]
    Production,
}

impl Environment {
    pub const ALL: [Environment; 3] = [
        Environment::Development,
        Environment::Staging,
        Environment::Production,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    /// Settings file loaded by convention, e.g. `.env.staging`.
    pub fn settings_file_name(&self) -> String {
        format!(".env.{}", self.as_str())
    }

    /// Environment-specific compose file, e.g. `docker-compose.production.yml`.
    pub fn compose_file_name(&self) -> String {
        format!("docker-compose.{}.yml", self.as_str())
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Environment {
    type Err = ParseEnvironmentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(Environment::Development),
            "staging" | "stage" => Ok(Environment::Staging),
            "production" | "prod" => Ok(Environment::Production),
            _ => Err(ParseEnvironmentError(s.to_string())),
        }
    }
}
