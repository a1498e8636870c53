// ABOUTME: Container image reference parsing and validation.
// ABOUTME: Handles formats like app, app:tag, registry/org/app:tag and retagging for publishing.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseImageRefError {
    #[error("image reference cannot be empty")]
    Empty,

    #[error("invalid character in image reference: {0}")]
    InvalidChar(char),

    #[error("invalid image reference format: {0}")]
    InvalidFormat(String),

    #[error("invalid image tag: {0}")]
    InvalidTag(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageRef {
    registry: Option<String>,
    name: String,
    tag: String,
}

impl ImageRef {
    pub fn parse(input: &str) -> Result<Self, ParseImageRefError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseImageRefError::Empty);
        }

        for c in input.chars() {
            if !c.is_ascii_alphanumeric() && !matches!(c, '/' | ':' | '.' | '-' | '_') {
                return Err(ParseImageRefError::InvalidChar(c));
            }
        }

        // A trailing ":segment" without a slash is a tag; otherwise it is a registry port.
        let (without_tag, tag) = match input.rsplit_once(':') {
            Some((before, after)) if !after.contains('/') => (before, Some(after)),
            _ => (input, None),
        };

        let (registry, name) = Self::parse_registry_and_name(without_tag)?;
        let tag = tag.unwrap_or("latest");
        validate_tag(tag)?;

        Ok(Self {
            registry,
            name,
            tag: tag.to_string(),
        })
    }

    fn parse_registry_and_name(
        input: &str,
    ) -> Result<(Option<String>, String), ParseImageRefError> {
        if input.is_empty() || input.starts_with('/') || input.ends_with('/') {
            return Err(ParseImageRefError::InvalidFormat(input.to_string()));
        }

        match input.split_once('/') {
            None => Ok((None, input.to_string())),
            Some((first, rest))
                if first.contains('.') || first.contains(':') || first == "localhost" =>
            {
                Ok((Some(first.to_string()), rest.to_string()))
            }
            Some(_) => Ok((None, input.to_string())),
        }
    }

    /// Same image with a different tag.
    pub fn with_tag(&self, tag: &str) -> Result<Self, ParseImageRefError> {
        validate_tag(tag)?;
        Ok(Self {
            registry: self.registry.clone(),
            name: self.name.clone(),
            tag: tag.to_string(),
        })
    }

    /// Same image and tag, published under `prefix` (e.g. `ghcr.io/heckx`).
    ///
    /// The prefix replaces any registry the reference already carries.
    pub fn in_registry(&self, prefix: &str) -> Result<Self, ParseImageRefError> {
        let prefix = prefix.trim().trim_end_matches('/');
        let basename = self.name.rsplit('/').next().unwrap_or(&self.name);
        Self::parse(&format!("{}/{}:{}", prefix, basename, self.tag))
    }

    pub fn registry(&self) -> Option<&str> {
        self.registry.as_deref()
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    /// Repository part without the tag (`registry/name`).
    pub fn repository(&self) -> String {
        match &self.registry {
            Some(registry) => format!("{}/{}", registry, self.name),
            None => self.name.clone(),
        }
    }
}

fn validate_tag(tag: &str) -> Result<(), ParseImageRefError> {
    let valid = !tag.is_empty()
        && tag.len() <= 128
        && !tag.starts_with(['.', '-'])
        && tag
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'));
    if valid {
        Ok(())
    } else {
        Err(ParseImageRefError::InvalidTag(tag.to_string()))
    }
}

impl fmt::Display for ImageRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.repository(), self.tag)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_name_defaults_to_latest() {
        let image = ImageRef::parse("heckx-video-generator").unwrap();
        assert_eq!(image.name(), "heckx-video-generator");
        assert_eq!(image.tag(), "latest");
        assert_eq!(image.registry(), None);
    }

    #[test]
    fn registry_with_port_is_not_a_tag() {
        let image = ImageRef::parse("localhost:5000/heckx/app").unwrap();
        assert_eq!(image.registry(), Some("localhost:5000"));
        assert_eq!(image.name(), "heckx/app");
        assert_eq!(image.tag(), "latest");
    }

    #[test]
    fn retag_keeps_repository() {
        let image = ImageRef::parse("ghcr.io/heckx/app:v1").unwrap();
        let retagged = image.with_tag("production-20261018-120000").unwrap();
        assert_eq!(
            retagged.to_string(),
            "ghcr.io/heckx/app:production-20261018-120000"
        );
    }

    #[test]
    fn in_registry_replaces_prefix() {
        let image = ImageRef::parse("heckx-video-generator:staging-1").unwrap();
        let published = image.in_registry("registry.example.com/heckx/").unwrap();
        assert_eq!(
            published.to_string(),
            "registry.example.com/heckx/heckx-video-generator:staging-1"
        );
    }

    #[test]
    fn rejects_bad_tags() {
        let image = ImageRef::parse("app").unwrap();
        assert!(image.with_tag("-bad").is_err());
        assert!(image.with_tag("has space").is_err());
        assert!(ImageRef::parse("app@sha256").is_err());
    }
}
