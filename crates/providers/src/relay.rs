//! HTTP relay email sender.
//!
//! Deployments without a direct mail integration point the service at a
//! relay webhook: each outbound message is POSTed as JSON with an HMAC-SHA256
//! signature header the relay verifies before delivering.

use async_trait::async_trait;
use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::{Digest, Sha256};
use tracing::debug;

use crate::email::{DeliveryReceipt, EmailSender, OutboundEmail};
use crate::ProviderError;

pub const SIGNATURE_HEADER: &str = "x-concierge-signature";

type HmacSha256 = Hmac<Sha256>;

/// Hex HMAC-SHA256 of `body` under `secret`, as carried in
/// [`SIGNATURE_HEADER`].
pub fn sign_payload(secret: &str, body: &[u8]) -> String {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return encode_hex(Sha256::digest(body).as_slice()),
    };
    mac.update(body);
    encode_hex(mac.finalize().into_bytes().as_slice())
}

fn encode_hex(bytes: &[u8]) -> String {
    let mut output = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        output.push_str(&format!("{byte:02x}"));
    }
    output
}

pub struct WebhookEmailSender {
    client: reqwest::Client,
    url: String,
    secret: SecretString,
}

impl WebhookEmailSender {
    pub fn new(url: impl Into<String>, secret: SecretString) -> Self {
        Self { client: reqwest::Client::new(), url: url.into(), secret }
    }
}

#[async_trait]
impl EmailSender for WebhookEmailSender {
    async fn send_email(&self, message: &OutboundEmail) -> Result<DeliveryReceipt, ProviderError> {
        let body = serde_json::to_vec(message)
            .map_err(|error| ProviderError::Send(format!("payload encoding failed: {error}")))?;
        let signature = sign_payload(self.secret.expose_secret(), &body);

        debug!(to = %message.to, relay_url = %self.url, "posting outreach email to relay");

        let response = self
            .client
            .post(&self.url)
            .header(SIGNATURE_HEADER, signature)
            .header("content-type", "application/json")
            .body(body)
            .send()
            .await
            .map_err(|error| ProviderError::Send(format!("relay request failed: {error}")))?;

        if !response.status().is_success() {
            return Err(ProviderError::Send(format!(
                "relay rejected message for {} with status {}",
                message.to,
                response.status()
            )));
        }

        let message_id = response
            .json::<serde_json::Value>()
            .await
            .ok()
            .and_then(|value| value.get("messageId").and_then(|id| id.as_str()).map(String::from));

        Ok(DeliveryReceipt {
            to: message.to.clone(),
            correlation_token: message.correlation_token.clone(),
            message_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::sign_payload;

    #[test]
    fn signature_is_deterministic_per_secret_and_body() {
        let first = sign_payload("shared-secret", b"payload");
        let second = sign_payload("shared-secret", b"payload");
        assert_eq!(first, second);
        assert_eq!(first.len(), 64, "hex sha256 digest");
    }

    #[test]
    fn signature_varies_with_secret_and_body() {
        let base = sign_payload("shared-secret", b"payload");
        assert_ne!(base, sign_payload("other-secret", b"payload"));
        assert_ne!(base, sign_payload("shared-secret", b"tampered"));
    }
}
