// ABOUTME: Deployment orchestration using the type state pattern.
// ABOUTME: Exports the pipeline entry points, state markers, reports and the deploy lock.

mod deployment;
mod error;
mod health;
mod lock;
mod orchestrator;
mod report;
mod request;
mod rollback;
mod state;
mod transitions;

pub use deployment::{Context, Deployment};
pub use error::{DeployError, DeployErrorKind, EngineErrorExt, LockHolderInfo};
pub use health::{HealthPolicy, HealthReport, wait_healthy};
pub use lock::{DeployLock, LockInfo};
pub use orchestrator::run_deployment;
pub use report::{BuiltImage, DeployReport, RollbackReport, Step, StepRecord, StepStatus};
pub use request::{DeployFlags, DeployRequest};
pub use rollback::rollback;
pub use state::{BackedUp, Built, Healthy, Requested, RolledOut, Tested, Validated};
pub use transitions::{TransitionResult, unique_tag};
