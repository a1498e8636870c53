// ABOUTME: Validated domain types shared across the orchestrator.
// ABOUTME: Environments, image references and compose project names.

mod environment;
mod image_ref;
mod project_name;

pub use environment::{Environment, ParseEnvironmentError};
pub use image_ref::{ImageRef, ParseImageRefError};
pub use project_name::{ProjectName, ProjectNameError};
