// ABOUTME: Deployment notifications: event model, Notifier trait and best-effort fan-out.
// ABOUTME: Sink failures become diagnostics warnings and never change a deployment's outcome.

mod email;
mod webhook;

pub use email::EmailNotifier;
pub use webhook::{WebhookNotifier, slack_payload};

use crate::config::NotificationsConfig;
use crate::diagnostics::{Diagnostics, Warning};
use crate::error::Result;
use crate::types::Environment;
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// What happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    DeploySucceeded,
    DeployFailed,
    RollbackSucceeded,
    RollbackFailed,
}

impl Event {
    pub fn title(&self) -> &'static str {
        match self {
            Event::DeploySucceeded => "Deployment succeeded",
            Event::DeployFailed => "Deployment failed",
            Event::RollbackSucceeded => "Rollback completed",
            Event::RollbackFailed => "Rollback failed",
        }
    }

    /// Slack attachment colour.
    pub fn color(&self) -> &'static str {
        match self {
            Event::DeploySucceeded => "good",
            Event::RollbackSucceeded => "warning",
            Event::DeployFailed | Event::RollbackFailed => "danger",
        }
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, Event::DeployFailed | Event::RollbackFailed)
    }
}

/// A single notification sent to every configured sink.
#[derive(Debug, Clone)]
pub struct Notification {
    pub event: Event,
    pub project: String,
    pub environment: Environment,
    pub image: Option<String>,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        event: Event,
        project: impl Into<String>,
        environment: Environment,
        message: impl Into<String>,
    ) -> Self {
        Self {
            event,
            project: project.into(),
            environment,
            image: None,
            message: message.into(),
            timestamp: Utc::now(),
        }
    }

    pub fn with_image(mut self, image: impl Into<String>) -> Self {
        self.image = Some(image.into());
        self
    }

    /// One-line subject, e.g. `[heckx-ai-assistant] Deployment failed (production)`.
    pub fn subject(&self) -> String {
        format!(
            "[{}] {} ({})",
            self.project,
            self.event.title(),
            self.environment
        )
    }
}

/// Errors from a notification sink.
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("webhook request failed: {0}")]
    Webhook(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    WebhookStatus(u16),

    #[error("invalid email address '{address}': {reason}")]
    Address { address: String, reason: String },

    #[error("failed to build email: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("SMTP delivery failed: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),
}

/// A notification sink.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Short sink name used in warnings.
    fn name(&self) -> &str;

    async fn notify(&self, notification: &Notification) -> std::result::Result<(), NotifyError>;
}

/// Every configured sink.
#[derive(Default)]
pub struct Notifiers {
    sinks: Vec<Box<dyn Notifier>>,
}

impl Notifiers {
    /// Build the sinks described by the configuration; secrets are resolved here.
    pub fn from_config(config: &NotificationsConfig) -> Result<Self> {
        let mut notifiers = Self::default();
        if let Some(webhook) = &config.webhook {
            notifiers.push(Box::new(WebhookNotifier::new(
                webhook.url.resolve()?,
                webhook.timeout,
            )));
        }
        if let Some(email) = &config.email {
            notifiers.push(Box::new(EmailNotifier::from_config(email)?));
        }
        Ok(notifiers)
    }

    pub fn push(&mut self, sink: Box<dyn Notifier>) {
        self.sinks.push(sink);
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }

    /// Send to every sink concurrently; failures are recorded, not returned.
    pub async fn dispatch(&self, notification: &Notification, diag: &mut Diagnostics) {
        if self.sinks.is_empty() {
            tracing::debug!("No notification sinks configured");
            return;
        }

        let results = futures::future::join_all(
            self.sinks
                .iter()
                .map(|sink| async move { (sink.name(), sink.notify(notification).await) }),
        )
        .await;

        for (name, result) in results {
            match result {
                Ok(()) => tracing::debug!("Sent '{}' via {}", notification.event.title(), name),
                Err(e) => diag.warn(Warning::notification(format!(
                    "{} notification failed: {}",
                    name, e
                ))),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::WarningKind;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Counting(Arc<AtomicUsize>);

    #[async_trait]
    impl Notifier for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        async fn notify(&self, _: &Notification) -> std::result::Result<(), NotifyError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    struct Broken;

    #[async_trait]
    impl Notifier for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        async fn notify(&self, _: &Notification) -> std::result::Result<(), NotifyError> {
            Err(NotifyError::WebhookStatus(500))
        }
    }

    #[test]
    fn subject_names_project_event_and_environment() {
        let n = Notification::new(
            Event::DeployFailed,
            "heckx-ai-assistant",
            Environment::Production,
            "health check timed out",
        );
        assert_eq!(
            n.subject(),
            "[heckx-ai-assistant] Deployment failed (production)"
        );
        assert!(n.event.is_failure());
        assert_eq!(n.event.color(), "danger");
    }

    #[tokio::test]
    async fn failing_sink_becomes_warning_and_others_still_run() {
        let count = Arc::new(AtomicUsize::new(0));
        let mut notifiers = Notifiers::default();
        notifiers.push(Box::new(Broken));
        notifiers.push(Box::new(Counting(count.clone())));

        let mut diag = Diagnostics::default();
        let n = Notification::new(Event::DeploySucceeded, "p", Environment::Staging, "ok");
        notifiers.dispatch(&n, &mut diag).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(diag.of_kind(WarningKind::Notification).count(), 1);
        assert!(diag.warnings()[0].message.contains("broken"));
    }

    #[test]
    fn empty_config_builds_no_sinks() {
        let notifiers = Notifiers::from_config(&NotificationsConfig::default()).unwrap();
        assert!(notifiers.is_empty());
    }
}
