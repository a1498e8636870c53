// ABOUTME: Fixed-interval health polling with an overall deadline.
// ABOUTME: First probe is immediate; the loop never sleeps past the deadline.

use std::time::Duration;
use tokio::time::Instant;

use super::DeployError;
use crate::probe::HealthProbe;

/// Outcome of a passing health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthReport {
    pub attempts: u32,
    pub elapsed: Duration,
}

/// Polling parameters.
#[derive(Debug, Clone)]
pub struct HealthPolicy {
    pub url: String,
    pub interval: Duration,
    pub timeout: Duration,
    /// Upper bound for a single probe.
    pub probe_timeout: Duration,
}

/// Poll until the endpoint is healthy or the deadline passes.
///
/// # Errors
///
/// Returns `DeployError::HealthCheckTimeout` when no probe succeeded in time.
pub async fn wait_healthy(
    probe: &dyn HealthProbe,
    policy: &HealthPolicy,
) -> Result<HealthReport, DeployError> {
    let start = Instant::now();
    let deadline = start + policy.timeout;
    let mut attempts = 0u32;

    loop {
        attempts += 1;
        let remaining = deadline.saturating_duration_since(Instant::now());
        let per_probe = policy.probe_timeout.min(remaining.max(Duration::from_millis(1)));

        match probe.check(&policy.url, per_probe).await {
            Ok(true) => {
                return Ok(HealthReport {
                    attempts,
                    elapsed: start.elapsed(),
                });
            }
            Ok(false) => tracing::debug!("Health check attempt {}: unhealthy", attempts),
            Err(e) => tracing::debug!("Health check attempt {}: {}", attempts, e),
        }

        if Instant::now() + policy.interval > deadline {
            return Err(DeployError::HealthCheckTimeout {
                timeout: policy.timeout,
                attempts,
            });
        }
        tokio::time::sleep(policy.interval).await;
    }
}
