// ABOUTME: Custom serde deserializers for config types.
// ABOUTME: Handles project names, image refs and non-empty recipient lists.

use nonempty::NonEmpty;
use serde::Deserialize;

use crate::types::{ImageRef, ProjectName};

pub fn deserialize_project_name<'de, D>(deserializer: D) -> Result<ProjectName, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ProjectName::new(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_image_ref<'de, D>(deserializer: D) -> Result<ImageRef, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    ImageRef::parse(&s).map_err(serde::de::Error::custom)
}

pub fn deserialize_recipients<'de, D>(deserializer: D) -> Result<NonEmpty<String>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let values: Vec<RecipientEntry> = match RecipientList::deserialize(deserializer)? {
        RecipientList::One(single) => vec![single],
        RecipientList::Many(many) => many,
    };

    let recipients = values
        .into_iter()
        .map(|entry| entry.0.trim().to_string())
        .filter(|r| !r.is_empty())
        .collect::<Vec<_>>();

    NonEmpty::from_vec(recipients)
        .ok_or_else(|| serde::de::Error::custom("at least one email recipient is required"))
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RecipientList {
    One(RecipientEntry),
    Many(Vec<RecipientEntry>),
}

#[derive(Debug, Deserialize)]
#[serde(transparent)]
struct RecipientEntry(String);
