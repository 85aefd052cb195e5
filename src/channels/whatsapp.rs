//! WhatsApp delivery via the Twilio Messages API.
//!
//! The engine only sees the `Notifier` trait; the Twilio client is a plain
//! HTTP implementation of it (form-encoded POST, basic auth). Send order per
//! identity is preserved by awaiting each send in sequence.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::error::ChannelError;

/// Twilio addresses WhatsApp users as `whatsapp:+15551234567`.
const TRANSPORT_PREFIX: &str = "whatsapp:";

/// Strip the transport prefix from a sender address, leaving the bare
/// E.164 identity the rest of the system keys on.
pub fn normalize_identity(raw: &str) -> String {
    raw.trim()
        .strip_prefix(TRANSPORT_PREFIX)
        .unwrap_or(raw.trim())
        .to_string()
}

/// Thin outbound send capability. Fire-and-forget from the engine's view,
/// but sends to one identity never reorder.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message to an identity.
    async fn say(&self, identity: &str, text: &str) -> Result<(), ChannelError>;

    /// Deliver several messages in order.
    async fn send_sequence(&self, identity: &str, texts: &[String]) -> Result<(), ChannelError> {
        for text in texts {
            self.say(identity, text).await?;
        }
        Ok(())
    }
}

/// Notifier backed by the Twilio Messages API.
pub struct TwilioNotifier {
    account_sid: String,
    auth_token: SecretString,
    from_number: String,
    client: reqwest::Client,
}

impl TwilioNotifier {
    pub fn new(account_sid: String, auth_token: SecretString, from_number: String) -> Self {
        Self {
            account_sid,
            auth_token,
            from_number,
            client: reqwest::Client::new(),
        }
    }

    fn api_url(&self) -> String {
        format!(
            "https://api.twilio.com/2010-04-01/Accounts/{}/Messages.json",
            self.account_sid
        )
    }
}

#[async_trait]
impl Notifier for TwilioNotifier {
    async fn say(&self, identity: &str, text: &str) -> Result<(), ChannelError> {
        let form = [
            ("From", format!("{TRANSPORT_PREFIX}{}", self.from_number)),
            ("To", format!("{TRANSPORT_PREFIX}{identity}")),
            ("Body", text.to_string()),
        ];

        let resp = self
            .client
            .post(self.api_url())
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&form)
            .send()
            .await
            .map_err(|e| ChannelError::SendFailed {
                identity: identity.to_string(),
                reason: e.to_string(),
            })?;

        if !resp.status().is_success() {
            let status = resp.status();
            let detail = resp.text().await.unwrap_or_default();
            return Err(ChannelError::SendFailed {
                identity: identity.to_string(),
                reason: format!("Twilio returned {status}: {detail}"),
            });
        }

        debug!(identity, "Message sent");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_transport_prefix() {
        assert_eq!(normalize_identity("whatsapp:+15551234567"), "+15551234567");
        assert_eq!(normalize_identity("  whatsapp:+441234567890 "), "+441234567890");
    }

    #[test]
    fn normalize_passes_bare_identities_through() {
        assert_eq!(normalize_identity("+15551234567"), "+15551234567");
        assert_eq!(normalize_identity("15551234567"), "15551234567");
    }
}
