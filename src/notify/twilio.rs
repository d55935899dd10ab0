//! SMS delivery through the Twilio Messages API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::{NotifyError, Notifier, check_alert};

/// Credentials and endpoint for the Twilio gateway.
#[derive(Clone)]
pub struct TwilioConfig {
    /// Account SID, also the basic-auth user.
    pub account_sid: String,
    /// Auth token, the basic-auth password.
    pub auth_token: String,
    /// Sender number in E.164 form.
    pub from_phone: String,
    /// Prefix turning a 10-digit owner phone into E.164 (e.g. `+1`).
    pub country_code: String,
    /// API base URL, without trailing slash.
    pub api_base: String,
}

impl std::fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("from_phone", &self.from_phone)
            .field("country_code", &self.country_code)
            .field("api_base", &self.api_base)
            .finish()
    }
}

/// Sends alerts as SMS messages.
#[derive(Debug, Clone)]
pub struct TwilioNotifier {
    client: Client,
    config: TwilioConfig,
}

impl TwilioNotifier {
    /// Creates a notifier with a 10 s request timeout.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError::Network`] if the HTTP client cannot be built.
    pub fn new(config: TwilioConfig) -> Result<Self, NotifyError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;
        Ok(Self::with_client(config, client))
    }

    /// Creates a notifier over a caller-built client.
    #[must_use]
    pub fn with_client(config: TwilioConfig, client: Client) -> Self {
        Self { client, config }
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.config.api_base.trim_end_matches('/'),
            self.config.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn send(&self, phone: &str, message: &str) -> Result<(), NotifyError> {
        check_alert(phone, message)?;
        let to = format!("{}{phone}", self.config.country_code);
        let form = [
            ("From", self.config.from_phone.as_str()),
            ("To", to.as_str()),
            ("Body", message.trim()),
        ];

        let response = self
            .client
            .post(self.messages_url())
            .basic_auth(&self.config.account_sid, Some(&self.config.auth_token))
            .form(&form)
            .send()
            .await?;
        let status = response.status();

        if !status.is_success() {
            let error_body = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(NotifyError::SendFailed(format!(
                "Twilio API returned non-success status: {status}. Body: {error_body}"
            )));
        }

        tracing::debug!(to = %to, "sms alert accepted by gateway");
        Ok(())
    }
}
