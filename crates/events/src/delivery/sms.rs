//! SMS delivery through a Twilio-compatible HTTP API with retry.
//!
//! [`SmsDelivery`] posts a form (`To`, `From`, `Body`) to the messages
//! endpoint using HTTP basic auth. Failed attempts are retried with
//! backoff (1 s, 2 s) before giving up.

use std::time::Duration;

use async_trait::async_trait;
use rkids_core::notification::NotificationMessage;

use super::{ChannelKind, DeliveryChannel, DeliveryError};

/// Retry delays in seconds between attempts.
const RETRY_DELAYS_SECS: [u64; 2] = [1, 2];

/// HTTP request timeout for a single delivery attempt.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    #[error("HTTP request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("SMS gateway returned HTTP {0}")]
    HttpStatus(u16),
}

#[derive(Debug, Clone)]
pub struct SmsConfig {
    /// Messages endpoint, e.g.
    /// `https://api.twilio.com/2010-04-01/Accounts/{sid}/Messages.json`.
    pub api_url: String,
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

impl SmsConfig {
    /// Load configuration from environment variables.
    ///
    /// Returns `None` unless `SMS_ACCOUNT_SID`, `SMS_AUTH_TOKEN` and
    /// `SMS_FROM_NUMBER` are all set. `SMS_API_URL` defaults to the Twilio
    /// messages endpoint for the account.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let account_sid = non_empty("SMS_ACCOUNT_SID")?;
        let auth_token = non_empty("SMS_AUTH_TOKEN")?;
        let from_number = non_empty("SMS_FROM_NUMBER")?;
        let api_url = non_empty("SMS_API_URL").unwrap_or_else(|| {
            format!("https://api.twilio.com/2010-04-01/Accounts/{account_sid}/Messages.json")
        });
        Some(Self {
            api_url,
            account_sid,
            auth_token,
            from_number,
        })
    }
}

/// Sends SMS notifications through the configured gateway.
pub struct SmsDelivery {
    config: SmsConfig,
    client: reqwest::Client,
}

impl SmsDelivery {
    pub fn new(config: SmsConfig) -> Result<Self, SmsError> {
        let client = reqwest::Client::builder().timeout(REQUEST_TIMEOUT).build()?;
        Ok(Self { config, client })
    }

    /// Deliver with retry. Returns `Ok(())` on the first successful attempt.
    pub async fn deliver(&self, to_phone: &str, text: &str) -> Result<(), SmsError> {
        for (attempt, delay_secs) in RETRY_DELAYS_SECS.iter().enumerate() {
            match self.try_send(to_phone, text).await {
                Ok(()) => return Ok(()),
                Err(e) => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        to = to_phone,
                        error = %e,
                        "SMS delivery attempt failed, retrying"
                    );
                    tokio::time::sleep(Duration::from_secs(*delay_secs)).await;
                }
            }
        }

        // Final attempt after the last backoff.
        self.try_send(to_phone, text).await.inspect_err(|e| {
            tracing::error!(to = to_phone, error = %e, "SMS delivery failed after all retries");
        })
    }

    async fn try_send(&self, to_phone: &str, text: &str) -> Result<(), SmsError> {
        let form = [
            ("To", to_phone),
            ("From", self.config.from_number.as_str()),
            ("Body", text),
        ];
        let response = self
            .client
            .post(&self.config.api_url)
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(SmsError::HttpStatus(response.status().as_u16()));
        }
        Ok(())
    }
}

#[async_trait]
impl DeliveryChannel for SmsDelivery {
    fn kind(&self) -> ChannelKind {
        ChannelKind::Sms
    }

    async fn send(&self, to: &str, message: &NotificationMessage) -> Result<(), DeliveryError> {
        self.deliver(to, &message.sms_text()).await?;
        tracing::info!(to, kind = message.kind.as_str(), "Notification SMS sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup<'a>(vars: &'a HashMap<&'a str, &'a str>) -> impl Fn(&str) -> Option<String> + 'a {
        move |k| vars.get(k).map(|v| v.to_string())
    }

    #[test]
    fn from_lookup_requires_credentials() {
        let vars: HashMap<&str, &str> = [("SMS_ACCOUNT_SID", "AC123")].into();
        assert!(SmsConfig::from_lookup(lookup(&vars)).is_none());
    }

    #[test]
    fn from_lookup_defaults_to_twilio_endpoint() {
        let vars: HashMap<&str, &str> = [
            ("SMS_ACCOUNT_SID", "AC123"),
            ("SMS_AUTH_TOKEN", "secret"),
            ("SMS_FROM_NUMBER", "+15550001111"),
        ]
        .into();
        let config = SmsConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(
            config.api_url,
            "https://api.twilio.com/2010-04-01/Accounts/AC123/Messages.json"
        );
    }

    #[test]
    fn from_lookup_honours_custom_endpoint() {
        let vars: HashMap<&str, &str> = [
            ("SMS_API_URL", "http://localhost:9000/sms"),
            ("SMS_ACCOUNT_SID", "AC123"),
            ("SMS_AUTH_TOKEN", "secret"),
            ("SMS_FROM_NUMBER", "+15550001111"),
        ]
        .into();
        let config = SmsConfig::from_lookup(lookup(&vars)).unwrap();
        assert_eq!(config.api_url, "http://localhost:9000/sms");
    }

    #[test]
    fn sms_error_display_http_status() {
        assert_eq!(SmsError::HttpStatus(502).to_string(), "SMS gateway returned HTTP 502");
    }
}
