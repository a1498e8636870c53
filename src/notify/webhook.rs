// ABOUTME: Slack-compatible incoming-webhook notifier.
// ABOUTME: Posts a text line plus one coloured attachment with environment, image and time fields.

use super::{Notification, Notifier, NotifyError};
use async_trait::async_trait;
use serde_json::{Value, json};
use std::time::Duration;

pub struct WebhookNotifier {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            url: url.into(),
            timeout,
        }
    }
}

/// Slack message body for a notification.
pub fn slack_payload(notification: &Notification) -> Value {
    let mut fields = vec![json!({
        "title": "Environment",
        "value": notification.environment.as_str(),
        "short": true,
    })];
    if let Some(image) = &notification.image {
        fields.push(json!({ "title": "Image", "value": image, "short": true }));
    }
    fields.push(json!({
        "title": "Time",
        "value": notification.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
        "short": true,
    }));

    json!({
        "text": format!("Heckx deployment: {}", notification.subject()),
        "attachments": [{
            "color": notification.event.color(),
            "title": notification.event.title(),
            "text": notification.message,
            "timestamp": notification.timestamp.timestamp(),
            "fields": fields,
        }],
    })
}

#[async_trait]
impl Notifier for WebhookNotifier {
    fn name(&self) -> &str {
        "webhook"
    }

    async fn notify(&self, notification: &Notification) -> Result<(), NotifyError> {
        let response = self
            .client
            .post(&self.url)
            .json(&slack_payload(notification))
            .timeout(self.timeout)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(NotifyError::WebhookStatus(status.as_u16()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Event;
    use crate::types::Environment;

    #[test]
    fn payload_carries_colour_and_fields() {
        let n = Notification::new(
            Event::DeploySucceeded,
            "heckx-ai-assistant",
            Environment::Staging,
            "healthy after 3 attempts",
        )
        .with_image("heckx-video-generator:staging-20260101-120000");

        let payload = slack_payload(&n);
        let attachment = &payload["attachments"][0];
        assert_eq!(attachment["color"], "good");
        assert_eq!(attachment["title"], "Deployment succeeded");
        assert_eq!(attachment["text"], "healthy after 3 attempts");

        let titles: Vec<&str> = attachment["fields"]
            .as_array()
            .unwrap()
            .iter()
            .map(|f| f["title"].as_str().unwrap())
            .collect();
        assert_eq!(titles, vec!["Environment", "Image", "Time"]);
    }

    #[test]
    fn payload_without_image_omits_field() {
        let n = Notification::new(
            Event::RollbackFailed,
            "heckx-ai-assistant",
            Environment::Production,
            "compose up failed",
        );
        let payload = slack_payload(&n);
        assert_eq!(payload["attachments"][0]["fields"].as_array().unwrap().len(), 2);
        assert_eq!(payload["attachments"][0]["color"], "danger");
    }
}
