//! Outbound email notifier
//!
//! Email codes leave the service through a [`Notifier`]. Without a
//! configured endpoint the code is written to the log ([`LogNotifier`]);
//! with one, it is POSTed as JSON to that endpoint ([`WebhookNotifier`]),
//! which is expected to relay it to a mail provider.

use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

const USER_AGENT: &str = concat!("confman/", env!("CARGO_PKG_VERSION"));
const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(10);

/// Notifier errors
#[derive(Debug, Error)]
pub enum NotifierError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Notifier endpoint returned {0}: {1}")]
    Rejected(u16, String),
}

/// One outbound email
#[derive(Debug, Clone, Serialize)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

impl EmailMessage {
    pub fn verification_code(to: &str, username: &str, code: &str) -> Self {
        Self {
            to: to.to_string(),
            subject: "Your confman verification code".to_string(),
            body: format!(
                "Hello {},\n\nYour email verification code is {}.\n",
                username, code
            ),
        }
    }
}

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError>;
}

/// Writes messages to the log instead of sending them
#[derive(Debug, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        info!(
            to = %message.to,
            subject = %message.subject,
            body = %message.body,
            "No notifier configured; email logged instead of sent"
        );
        Ok(())
    }
}

/// POSTs `{to, subject, body}` to a relay endpoint
pub struct WebhookNotifier {
    http_client: reqwest::Client,
    url: String,
}

impl WebhookNotifier {
    pub fn new(url: impl Into<String>) -> Result<Self, NotifierError> {
        let http_client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(WEBHOOK_TIMEOUT)
            .build()
            .map_err(|e| NotifierError::Network(e.to_string()))?;

        Ok(Self {
            http_client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl Notifier for WebhookNotifier {
    async fn send(&self, message: &EmailMessage) -> Result<(), NotifierError> {
        debug!(to = %message.to, url = %self.url, "Posting email to notifier");

        let response = self
            .http_client
            .post(&self.url)
            .json(message)
            .send()
            .await
            .map_err(|e| NotifierError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected(status.as_u16(), error_text));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_verification_message_carries_code() {
        let msg = EmailMessage::verification_code("alice@x.com", "alice", "042917");
        assert_eq!(msg.to, "alice@x.com");
        assert!(msg.body.contains("042917"));

        let json = serde_json::to_value(&msg).unwrap();
        assert!(json.get("subject").is_some());
    }

    #[tokio::test]
    async fn test_log_notifier_always_succeeds() {
        let msg = EmailMessage::verification_code("a@x.com", "a", "123456");
        assert!(LogNotifier.send(&msg).await.is_ok());
    }

    #[tokio::test]
    async fn test_webhook_unreachable_is_network_error() {
        // Port 9 (discard) on localhost: nothing listens there in CI
        let notifier = WebhookNotifier::new("http://127.0.0.1:9/send").unwrap();
        let msg = EmailMessage::verification_code("a@x.com", "a", "123456");
        assert!(matches!(notifier.send(&msg).await, Err(NotifierError::Network(_))));
    }
}
