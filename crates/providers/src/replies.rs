use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMessage {
    pub id: String,
    pub snippet: String,
}

/// Looks up inbound replies by the correlation token embedded in the
/// original outreach message. An empty result means "no reply yet", which is
/// a normal outcome, not an error.
#[async_trait]
pub trait ReplyFinder: Send + Sync {
    async fn search_replies(
        &self,
        correlation_token: &str,
    ) -> Result<Vec<ReplyMessage>, ProviderError>;
}
