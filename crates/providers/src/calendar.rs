use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ProviderError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingRequest {
    pub attendees: Vec<String>,
    pub summary: String,
    pub description: String,
    pub duration_minutes: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timezone: Option<String>,
    /// Explicit slot chosen by the candidate; when absent the provider picks
    /// the next available one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub selected_time: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingConfirmation {
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(rename = "meetLink", skip_serializing_if = "Option::is_none")]
    pub meet_link: Option<String>,
    #[serde(rename = "scheduledTime", skip_serializing_if = "Option::is_none")]
    pub scheduled_time: Option<String>,
}

#[async_trait]
pub trait MeetingScheduler: Send + Sync {
    async fn schedule_meeting(
        &self,
        request: &MeetingRequest,
    ) -> Result<MeetingConfirmation, ProviderError>;
}
