use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::ProviderError;

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Structured read of an inbound reply: interest plus any time slots the
/// sender mentioned.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyAnalysis {
    #[serde(rename = "isPositive")]
    pub positive: bool,
    pub sentiment: String,
    #[serde(rename = "availableTimes")]
    pub available_times: Vec<String>,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError>;

    async fn analyze_reply(&self, text: &str) -> Result<ReplyAnalysis, ProviderError> {
        let _ = text;
        Err(ProviderError::Llm("reply analysis is not supported by this client".to_owned()))
    }
}

/// Keyword heuristic used whenever no LLM is configured or the call fails.
/// Good enough for demo-grade sentiment; callers treat it as best effort.
pub fn heuristic_reply_analysis(text: &str) -> ReplyAnalysis {
    let lowered = text.to_lowercase();
    let negative = ["not available", "can't", "cannot", "unfortunately", "decline"]
        .iter()
        .any(|marker| lowered.contains(marker));
    let positive = !negative
        && ["yes", "interested", "love to", "available", "sounds"]
            .iter()
            .any(|marker| lowered.contains(marker));

    ReplyAnalysis {
        positive,
        sentiment: if positive { "positive" } else { "negative" }.to_owned(),
        available_times: Vec::new(),
    }
}

/// Chat-completion client for any OpenAI-compatible endpoint.
pub struct OpenAiClient {
    client: reqwest::Client,
    api_key: SecretString,
    model: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(api_key: SecretString, model: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_key,
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_owned(),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, prompt: &str) -> Result<String, ProviderError> {
        let body = json!({
            "model": self.model,
            "messages": [{"role": "user", "content": prompt}],
        });
        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|error| ProviderError::Llm(error.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::Llm(format!(
                "completion endpoint returned {status}"
            )));
        }
        let parsed: serde_json::Value = response
            .json()
            .await
            .map_err(|error| ProviderError::Llm(error.to_string()))?;
        parsed["choices"][0]["message"]["content"]
            .as_str()
            .map(|content| content.trim().to_owned())
            .ok_or_else(|| ProviderError::Llm("completion response had no content".to_owned()))
    }

    async fn analyze_reply(&self, text: &str) -> Result<ReplyAnalysis, ProviderError> {
        let prompt = format!(
            "Classify this reply to a meeting invitation. Respond with only a JSON object \
             shaped as {{\"isPositive\": bool, \"sentiment\": string, \"availableTimes\": \
             [string]}}.\n\nReply:\n{text}"
        );
        let raw = self.complete(&prompt).await?;
        match serde_json::from_str(&raw) {
            Ok(analysis) => Ok(analysis),
            Err(error) => {
                debug!(event_name = "llm.analysis.fallback", %error, "unparseable analysis");
                Ok(heuristic_reply_analysis(text))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::heuristic_reply_analysis;

    #[test]
    fn acceptance_language_reads_positive() {
        let analysis =
            heuristic_reply_analysis("Yes, I'm very interested in participating next week.");
        assert!(analysis.positive);
        assert_eq!(analysis.sentiment, "positive");
    }

    #[test]
    fn refusal_language_reads_negative() {
        let analysis = heuristic_reply_analysis(
            "Thank you for the invitation, but unfortunately I'm not available.",
        );
        assert!(!analysis.positive);
    }
}
