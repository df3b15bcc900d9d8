//! Passcode delivery abstractions.
//!
//! The gate treats delivery as fire-and-forget: the stored code is the source
//! of truth, a failed send is reported but never rolls persistence back. The
//! default sender for local dev is [`LogCodeSender`], which logs and returns
//! `Ok(())`; [`HttpCodeSender`] hands the message to an external gateway that
//! owns retries and the actual email/SMS providers.

use anyhow::{Context, Result};
use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde_json::json;
use tracing::info;
use url::Url;

/// Where a code gets sent, depending on which contact the identity has.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Destination {
    Email(String),
    Phone(String),
}

impl Destination {
    #[must_use]
    pub fn channel(&self) -> &'static str {
        match self {
            Self::Email(_) => "email",
            Self::Phone(_) => "sms",
        }
    }

    #[must_use]
    pub fn address(&self) -> &str {
        match self {
            Self::Email(address) | Self::Phone(address) => address,
        }
    }
}

/// Delivery abstraction used by the passcode service.
#[async_trait]
pub trait CodeSender: Send + Sync {
    /// Deliver a code or return an error for the caller to report.
    async fn send_code(&self, destination: &Destination, code: &str) -> Result<()>;
}

/// Local dev sender that logs the payload instead of sending anything.
#[derive(Clone, Debug)]
pub struct LogCodeSender;

#[async_trait]
impl CodeSender for LogCodeSender {
    async fn send_code(&self, destination: &Destination, code: &str) -> Result<()> {
        info!(
            channel = destination.channel(),
            to = destination.address(),
            code,
            "passcode send stub"
        );
        Ok(())
    }
}

/// Explicit notification-gateway settings, injected at construction.
#[derive(Clone, Debug)]
pub struct NotifyConfig {
    api_url: Url,
    api_token: SecretString,
    sender_id: String,
}

impl NotifyConfig {
    #[must_use]
    pub fn new(api_url: Url, api_token: SecretString) -> Self {
        Self {
            api_url,
            api_token,
            sender_id: env!("CARGO_PKG_NAME").to_string(),
        }
    }

    #[must_use]
    pub fn with_sender_id(mut self, sender_id: String) -> Self {
        self.sender_id = sender_id;
        self
    }

    #[must_use]
    pub fn api_url(&self) -> &Url {
        &self.api_url
    }

    #[must_use]
    pub fn sender_id(&self) -> &str {
        &self.sender_id
    }
}

/// Sender that posts the message to an HTTP notification gateway.
#[derive(Clone, Debug)]
pub struct HttpCodeSender {
    client: reqwest::Client,
    config: NotifyConfig,
}

impl HttpCodeSender {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: NotifyConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .build()
            .context("Failed to build notification client")?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl CodeSender for HttpCodeSender {
    async fn send_code(&self, destination: &Destination, code: &str) -> Result<()> {
        let payload = json!({
            "channel": destination.channel(),
            "to": destination.address(),
            "from": self.config.sender_id(),
            "subject": "Your verification code",
            "body": format!("Your verification code is {code}. Valid for 10 minutes."),
        });

        let response = self
            .client
            .post(self.config.api_url().clone())
            .bearer_auth(self.config.api_token.expose_secret())
            .json(&payload)
            .send()
            .await
            .context("Failed to reach notification gateway")?;

        if !response.status().is_success() {
            anyhow::bail!(
                "notification gateway rejected the message: {}",
                response.status()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destination_channel_and_address() {
        let email = Destination::Email("ana@example.com".to_string());
        assert_eq!(email.channel(), "email");
        assert_eq!(email.address(), "ana@example.com");

        let phone = Destination::Phone("+15550001111".to_string());
        assert_eq!(phone.channel(), "sms");
        assert_eq!(phone.address(), "+15550001111");
    }

    #[tokio::test]
    async fn log_sender_always_succeeds() -> Result<()> {
        let sender = LogCodeSender;
        sender
            .send_code(&Destination::Email("ana@example.com".to_string()), "042042")
            .await
    }

    #[test]
    fn notify_config_defaults_and_overrides() -> Result<()> {
        let config = NotifyConfig::new(
            Url::parse("https://notify.example.test/v1/messages")?,
            SecretString::from("sekreta".to_string()),
        );
        assert_eq!(config.sender_id(), env!("CARGO_PKG_NAME"));

        let config = config.with_sender_id("codequest".to_string());
        assert_eq!(config.sender_id(), "codequest");
        assert_eq!(config.api_url().host_str(), Some("notify.example.test"));
        Ok(())
    }
}
