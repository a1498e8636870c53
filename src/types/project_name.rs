// ABOUTME: Compose project name validation.
// ABOUTME: Project names must be lowercase alphanumerics, hyphens or underscores.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProjectNameError {
    #[error("project name cannot be empty")]
    Empty,

    #[error("project name exceeds maximum length of 63 characters")]
    TooLong,

    #[error("project name must start with a letter or digit")]
    BadStart,

    #[error("project name must be lowercase")]
    NotLowercase,

    #[error("invalid character in project name: '{0}'")]
    InvalidChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    pub fn new(value: &str) -> Result<Self, ProjectNameError> {
        if value.is_empty() {
            return Err(ProjectNameError::Empty);
        }

        if value.len() > 63 {
            return Err(ProjectNameError::TooLong);
        }

        if value.starts_with(['-', '_']) {
            return Err(ProjectNameError::BadStart);
        }

        for c in value.chars() {
            if c.is_ascii_uppercase() {
                return Err(ProjectNameError::NotLowercase);
            }
            if !c.is_ascii_lowercase() && !c.is_ascii_digit() && c != '-' && c != '_' {
                return Err(ProjectNameError::InvalidChar(c));
            }
        }

        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_compose_style_names() {
        assert!(ProjectName::new("heckx-ai_assistant2").is_ok());
    }

    #[test]
    fn rejects_invalid_names() {
        assert!(matches!(ProjectName::new(""), Err(ProjectNameError::Empty)));
        assert!(matches!(
            ProjectName::new("Heckx"),
            Err(ProjectNameError::NotLowercase)
        ));
        assert!(matches!(
            ProjectName::new("-heckx"),
            Err(ProjectNameError::BadStart)
        ));
        assert!(matches!(
            ProjectName::new("heckx.ai"),
            Err(ProjectNameError::InvalidChar('.'))
        ));
        assert!(matches!(
            ProjectName::new(&"a".repeat(64)),
            Err(ProjectNameError::TooLong)
        ));
    }
}
