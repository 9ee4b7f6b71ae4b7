use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

/// One rendered outreach message, tagged with the correlation token the
/// reply lookup will later search by.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundEmail {
    pub to: String,
    pub subject: String,
    pub body: String,
    #[serde(rename = "refToken")]
    pub correlation_token: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub to: String,
    #[serde(rename = "refToken")]
    pub correlation_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send_email(&self, message: &OutboundEmail) -> Result<DeliveryReceipt, ProviderError>;
}
