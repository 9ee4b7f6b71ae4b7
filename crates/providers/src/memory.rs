//! In-process provider implementations for offline mode and tests.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::calendar::{MeetingConfirmation, MeetingRequest, MeetingScheduler};
use crate::email::{DeliveryReceipt, EmailSender, OutboundEmail};
use crate::replies::{ReplyFinder, ReplyMessage};
use crate::ProviderError;

/// Records every send and serves reply lookups from injected messages, so a
/// single instance can back both sides of the send-then-poll contract.
#[derive(Default)]
pub struct InMemoryMailbox {
    state: Mutex<MailboxState>,
}

#[derive(Default)]
struct MailboxState {
    sent: Vec<OutboundEmail>,
    replies: HashMap<String, Vec<ReplyMessage>>,
    fail_sends: bool,
    fail_lookups: bool,
}

impl InMemoryMailbox {
    pub fn sent(&self) -> Vec<OutboundEmail> {
        self.lock().sent.clone()
    }

    /// Queues a reply that subsequent lookups for `correlation_token` will
    /// return.
    pub fn inject_reply(&self, correlation_token: &str, reply: ReplyMessage) {
        self.lock().replies.entry(correlation_token.to_owned()).or_default().push(reply);
    }

    pub fn fail_sends(&self, fail: bool) {
        self.lock().fail_sends = fail;
    }

    pub fn fail_lookups(&self, fail: bool) {
        self.lock().fail_lookups = fail;
    }

    fn lock(&self) -> MutexGuard<'_, MailboxState> {
        match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl EmailSender for InMemoryMailbox {
    async fn send_email(&self, message: &OutboundEmail) -> Result<DeliveryReceipt, ProviderError> {
        let mut state = self.lock();
        if state.fail_sends {
            return Err(ProviderError::Send(format!("simulated send failure to {}", message.to)));
        }
        state.sent.push(message.clone());
        Ok(DeliveryReceipt {
            to: message.to.clone(),
            correlation_token: message.correlation_token.clone(),
            message_id: Some(format!("mem-{}", state.sent.len())),
        })
    }
}

#[async_trait]
impl ReplyFinder for InMemoryMailbox {
    async fn search_replies(
        &self,
        correlation_token: &str,
    ) -> Result<Vec<ReplyMessage>, ProviderError> {
        let state = self.lock();
        if state.fail_lookups {
            return Err(ProviderError::Lookup("simulated lookup failure".to_owned()));
        }
        Ok(state.replies.get(correlation_token).cloned().unwrap_or_default())
    }
}

/// Deterministic stand-in for a real calendar: the event id and meet link
/// are derived from the request contents, so repeated scheduling of the same
/// meeting yields the same confirmation.
pub struct SimulatedCalendar;

#[async_trait]
impl MeetingScheduler for SimulatedCalendar {
    async fn schedule_meeting(
        &self,
        request: &MeetingRequest,
    ) -> Result<MeetingConfirmation, ProviderError> {
        if request.attendees.is_empty() {
            return Err(ProviderError::Schedule("meeting needs at least one attendee".to_owned()));
        }

        let mut hasher = blake3::Hasher::new();
        for attendee in &request.attendees {
            hasher.update(attendee.as_bytes());
        }
        hasher.update(request.summary.as_bytes());
        if let Some(selected_time) = &request.selected_time {
            hasher.update(selected_time.as_bytes());
        }
        let digest = hasher.finalize().to_hex();
        let slug = &digest.as_str()[..12];

        Ok(MeetingConfirmation {
            event_id: format!("event_{slug}"),
            meet_link: Some(format!("https://meet.example.com/{slug}")),
            scheduled_time: request.selected_time.clone(),
        })
    }
}
