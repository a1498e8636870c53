// ABOUTME: Configuration values with environment variable interpolation.
// ABOUTME: Handles literal values and `{ env: VAR, default: ... }` references for secrets.

use crate::error::{Error, Result};
use serde::Deserialize;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
    Literal(String),
    FromEnv {
        #[serde(rename = "env")]
        var: String,
        #[serde(default)]
        default: Option<String>,
    },
}

impl EnvValue {
    pub fn resolve(&self) -> Result<String> {
        match self {
            EnvValue::Literal(s) => Ok(s.clone()),
            EnvValue::FromEnv { var, default } => match std::env::var(var) {
                Ok(val) => Ok(val),
                Err(_) => default
                    .clone()
                    .ok_or_else(|| Error::MissingEnvVar(var.clone())),
            },
        }
    }
}

impl From<&str> for EnvValue {
    fn from(value: &str) -> Self {
        EnvValue::Literal(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn literal_resolves_to_itself() {
        let value = EnvValue::from("https://hooks.example.com/x");
        assert_eq!(value.resolve().unwrap(), "https://hooks.example.com/x");
    }

    #[test]
    fn env_reference_reads_variable() {
        temp_env::with_var("HECKX_TEST_WEBHOOK", Some("https://hooks/abc"), || {
            let value = EnvValue::FromEnv {
                var: "HECKX_TEST_WEBHOOK".to_string(),
                default: None,
            };
            assert_eq!(value.resolve().unwrap(), "https://hooks/abc");
        });
    }

    #[test]
    fn missing_variable_uses_default_or_fails() {
        temp_env::with_var_unset("HECKX_TEST_UNSET", || {
            let with_default = EnvValue::FromEnv {
                var: "HECKX_TEST_UNSET".to_string(),
                default: Some("fallback".to_string()),
            };
            assert_eq!(with_default.resolve().unwrap(), "fallback");

            let without = EnvValue::FromEnv {
                var: "HECKX_TEST_UNSET".to_string(),
                default: None,
            };
            assert!(matches!(without.resolve(), Err(Error::MissingEnvVar(v)) if v == "HECKX_TEST_UNSET"));
        });
    }
}
