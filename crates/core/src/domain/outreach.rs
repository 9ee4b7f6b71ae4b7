use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::candidate::CandidateDraft;

/// Calendar parameters applied to every meeting scheduled during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MeetingParameters {
    pub summary: String,
    pub description: String,
    pub duration_minutes: u32,
    pub timezone: Option<String>,
}

impl Default for MeetingParameters {
    fn default() -> Self {
        Self {
            summary: "Introductory Meeting".to_owned(),
            description: "Intro call".to_owned(),
            duration_minutes: 30,
            timezone: None,
        }
    }
}

/// One invocation of the outreach flow engine, from send through the
/// poll-for-replies deadline. At most one run may be active per process.
#[derive(Clone, Debug)]
pub struct OutreachRun {
    pub candidates: Vec<CandidateDraft>,
    pub subject: String,
    pub body_template: String,
    pub window: Duration,
    pub poll_interval: Duration,
    pub meeting: MeetingParameters,
}

/// Outcome of one successful schedule-on-reply during a run.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledMeeting {
    pub email: String,
    #[serde(rename = "eventId")]
    pub event_id: String,
    #[serde(rename = "meetLink", skip_serializing_if = "Option::is_none")]
    pub meet_link: Option<String>,
}
