//! SMS notifications through the Twilio Messages API.

use crate::config::TwilioConfig;
use crate::domain::Event;
use crate::error::NotificationError;
use crate::ports::notifier::Notifier;
use async_trait::async_trait;
use std::time::Duration;

const TWILIO_API: &str = "https://api.twilio.com/2010-04-01";

pub struct TwilioNotifier {
    client: reqwest::Client,
    config: TwilioConfig,
    base_url: String,
}

impl TwilioNotifier {
    pub fn new(config: TwilioConfig) -> Result<Self, NotificationError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            config,
            base_url: TWILIO_API.to_string(),
        })
    }

    /// Point the client at another API host.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/Accounts/{}/Messages.json",
            self.base_url.trim_end_matches('/'),
            self.config.sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn notify(&self, event: &Event) -> Result<(), NotificationError> {
        let body = event.notification_message();
        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.sid, Some(&self.config.token))
            .form(&[
                ("From", self.config.from.as_str()),
                ("To", self.config.to.as_str()),
                ("Body", body.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(NotificationError::Rejected { status, body });
        }

        tracing::info!(event_id = event.id, to = %self.config.to, "sent event notification");
        Ok(())
    }
}

/// Used when no credentials are configured; every call fails so the
/// pipeline logs it.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, _event: &Event) -> Result<(), NotificationError> {
        Err(NotificationError::NotConfigured)
    }
}
