// ABOUTME: SMTP email notifier built on lettre's tokio transport.
// ABOUTME: Sends a plain-text message to every configured recipient.

use super::{Notification, Notifier, NotifyError};
use crate::config::EmailConfig;
use crate::error::Result;
use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

pub struct EmailNotifier {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: String,
    to: Vec<String>,
}

impl EmailNotifier {
    pub fn from_config(config: &EmailConfig) -> Result<Self> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&config.smtp_host)
                .port(config.smtp_port);

        if let (Some(username), Some(password)) = (&config.username, &config.password) {
            builder = builder.credentials(Credentials::new(username.clone(), password.resolve()?));
        }

        Ok(Self {
            transport: builder.build(),
            from: config.from.clone(),
            to: config.to.iter().cloned().collect(),
        })
    }

    fn message(&self, notification: &Notification) -> std::result::Result<Message, NotifyError> {
        let mut builder = Message::builder()
            .from(parse_mailbox(&self.from)?)
            .subject(notification.subject())
            .header(ContentType::TEXT_PLAIN);
        for recipient in &self.to {
            builder = builder.to(parse_mailbox(recipient)?);
        }
        Ok(builder.body(body(notification))?)
    }
}

fn parse_mailbox(address: &str) -> std::result::Result<Mailbox, NotifyError> {
    address.parse().map_err(|e: lettre::address::AddressError| NotifyError::Address {
        address: address.to_string(),
        reason: e.to_string(),
    })
}

/// Plain-text body.
fn body(notification: &Notification) -> String {
    let mut text = format!(
        "{}\n\nProject: {}\nEnvironment: {}\n",
        notification.message, notification.project, notification.environment
    );
    if let Some(image) = &notification.image {
        text.push_str(&format!("Image: {}\n", image));
    }
    text.push_str(&format!(
        "Time: {}\n",
        notification.timestamp.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    text
}

#[async_trait]
impl Notifier for EmailNotifier {
    fn name(&self) -> &str {
        "email"
    }

    async fn notify(&self, notification: &Notification) -> std::result::Result<(), NotifyError> {
        let message = self.message(notification)?;
        self.transport.send(message).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::notify::Event;
    use crate::types::Environment;
    use nonempty::NonEmpty;

    fn config(to: NonEmpty<String>) -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".to_string(),
            smtp_port: 2525,
            username: None,
            password: None,
            from: "Heckx Deploy <deploy@heckx.local>".to_string(),
            to,
        }
    }

    fn notification() -> Notification {
        Notification::new(
            Event::DeployFailed,
            "heckx-ai-assistant",
            Environment::Production,
            "health check timed out after 300s",
        )
        .with_image("heckx-video-generator:production-20260101-000000")
    }

    #[tokio::test]
    async fn message_addresses_every_recipient() {
        let notifier = EmailNotifier::from_config(&config(NonEmpty::from((
            "ops@heckx.local".to_string(),
            vec!["oncall@heckx.local".to_string()],
        ))))
        .unwrap();

        let message = notifier.message(&notification()).unwrap();
        let envelope = message.envelope();
        assert_eq!(envelope.to().len(), 2);
    }

    #[tokio::test]
    async fn invalid_recipient_is_reported() {
        let notifier =
            EmailNotifier::from_config(&config(NonEmpty::new("not an address".to_string())))
                .unwrap();
        let err = notifier.message(&notification()).unwrap_err();
        assert!(matches!(err, NotifyError::Address { .. }));
    }

    #[test]
    fn body_lists_context() {
        let text = body(&notification());
        assert!(text.starts_with("health check timed out after 300s"));
        assert!(text.contains("Environment: production"));
        assert!(text.contains("Image: heckx-video-generator:production-20260101-000000"));
    }
}
