//! The outreach state machine: send -> poll-for-reply -> schedule-on-reply.
//!
//! Per run: every candidate gets a correlation-tagged email, then a
//! time-boxed polling loop looks up replies by token and schedules a meeting
//! for each positive hit. Provider failures are recovered per candidate so a
//! run always reaches its terminal `done` event, even when every single call
//! fails.

use std::sync::Arc;

use tokio::time::Instant;
use tracing::{info, warn};

use concierge_core::domain::candidate::{CandidateDraft, CandidateStatus};
use concierge_core::domain::outreach::{OutreachRun, ScheduledMeeting};
use concierge_core::events::{EventBus, OutreachEvent, RunGuard};
use concierge_core::registry::CandidateRegistry;
use concierge_core::token::correlation_token;
use concierge_providers::calendar::{MeetingRequest, MeetingScheduler};
use concierge_providers::email::{EmailSender, OutboundEmail};
use concierge_providers::replies::ReplyFinder;

use crate::template::render_body;

#[derive(Clone)]
pub struct OutreachFlowEngine {
    bus: EventBus,
    registry: CandidateRegistry,
    email: Arc<dyn EmailSender>,
    replies: Arc<dyn ReplyFinder>,
    calendar: Arc<dyn MeetingScheduler>,
}

/// A candidate whose outreach message went out and who is awaiting a reply.
struct ContactedCandidate {
    name: String,
    email: String,
    token: String,
    resolved: bool,
}

impl OutreachFlowEngine {
    pub fn new(
        bus: EventBus,
        registry: CandidateRegistry,
        email: Arc<dyn EmailSender>,
        replies: Arc<dyn ReplyFinder>,
        calendar: Arc<dyn MeetingScheduler>,
    ) -> Self {
        Self { bus, registry, email, replies, calendar }
    }

    /// Drives one run to completion. The terminal `done` event is published
    /// and the run slot released on every path; the guard's drop covers the
    /// flag even if this future is cancelled mid-run.
    pub async fn run(&self, run: OutreachRun, guard: RunGuard) -> Vec<ScheduledMeeting> {
        self.bus.publish(OutreachEvent::log("[Outreach] Starting outreach flow"));

        let mut contacted = self.send_phase(&run).await;
        let scheduled = self.poll_phase(&run, &mut contacted).await;

        info!(
            event_name = "outreach.run.completed",
            contacted = contacted.len(),
            scheduled = scheduled.len(),
            "outreach run reached terminal state"
        );
        self.bus.publish(OutreachEvent::done_ok(scheduled.clone()));
        drop(guard);
        scheduled
    }

    /// Sequentially sends to each candidate in input order. A failed send is
    /// logged and skipped; the candidate stays Sourced and is excluded from
    /// polling.
    async fn send_phase(&self, run: &OutreachRun) -> Vec<ContactedCandidate> {
        let mut contacted = Vec::new();

        for draft in &run.candidates {
            let Some(email) = draft.email.as_deref().filter(|email| !email.is_empty()) else {
                continue;
            };
            let name = draft
                .name
                .as_deref()
                .filter(|name| !name.is_empty())
                .unwrap_or("there")
                .to_owned();

            let token = correlation_token(email, &run.subject);
            let message = OutboundEmail {
                to: email.to_owned(),
                subject: run.subject.clone(),
                body: render_body(&run.body_template, &name),
                correlation_token: token.clone(),
            };

            match self.email.send_email(&message).await {
                Ok(_) => {
                    self.registry.load(&[CandidateDraft::new(name.clone(), email)
                        .with_status(CandidateStatus::Contacted)]);
                    self.registry.set_correlation_token(email, &token);
                    self.bus.publish(OutreachEvent::status(email, CandidateStatus::Contacted));
                    self.bus
                        .publish(OutreachEvent::log(format!("[Outreach] Sent to {name} <{email}>")));
                    contacted.push(ContactedCandidate {
                        name,
                        email: email.to_owned(),
                        token,
                        resolved: false,
                    });
                }
                Err(error) => {
                    warn!(
                        event_name = "outreach.send.failed",
                        candidate_email = email,
                        error = %error,
                        "send failed; continuing with remaining candidates"
                    );
                    self.registry.load(&[CandidateDraft::new(name.clone(), email)]);
                    self.bus.publish(OutreachEvent::log(format!(
                        "[Outreach] Send failed for {email}: {error}"
                    )));
                }
            }
        }

        self.bus.publish(OutreachEvent::Candidates(self.registry.all()));
        contacted
    }

    /// Polls for replies until the deadline, scheduling a meeting for every
    /// candidate whose token turns up messages. Lookup or scheduling
    /// failures for one candidate never abort the pass for the others.
    async fn poll_phase(
        &self,
        run: &OutreachRun,
        contacted: &mut [ContactedCandidate],
    ) -> Vec<ScheduledMeeting> {
        let deadline = Instant::now() + run.window;
        let mut scheduled = Vec::new();

        while Instant::now() < deadline {
            for candidate in contacted.iter_mut().filter(|candidate| !candidate.resolved) {
                match self.replies.search_replies(&candidate.token).await {
                    Ok(messages) if !messages.is_empty() => {
                        self.bus.publish(OutreachEvent::log(format!(
                            "[Outreach] Reply detected from {}",
                            candidate.email
                        )));
                        if let Some(meeting) = self.schedule_for(run, candidate).await {
                            scheduled.push(meeting);
                            candidate.resolved = true;
                        }
                    }
                    Ok(_) => {}
                    Err(error) => {
                        warn!(
                            event_name = "outreach.reply_lookup.failed",
                            candidate_email = %candidate.email,
                            error = %error,
                            "reply lookup failed; will retry next pass"
                        );
                    }
                }
            }

            // Nothing left to wait for: either everyone is resolved or no
            // send succeeded in the first place.
            if contacted.iter().all(|candidate| candidate.resolved) {
                break;
            }

            tokio::time::sleep(run.poll_interval).await;
        }

        scheduled
    }

    async fn schedule_for(
        &self,
        run: &OutreachRun,
        candidate: &ContactedCandidate,
    ) -> Option<ScheduledMeeting> {
        let request = MeetingRequest {
            attendees: vec![candidate.email.clone()],
            summary: run.meeting.summary.clone(),
            description: run.meeting.description.clone(),
            duration_minutes: run.meeting.duration_minutes,
            timezone: run.meeting.timezone.clone(),
            selected_time: None,
        };

        match self.calendar.schedule_meeting(&request).await {
            Ok(confirmation) => {
                self.registry.update_status(&candidate.email, CandidateStatus::Accepted);
                self.bus.publish(OutreachEvent::status(&candidate.email, CandidateStatus::Accepted));
                self.bus.publish(OutreachEvent::log(format!(
                    "[Scheduling] Meeting created for {}",
                    candidate.email
                )));
                Some(ScheduledMeeting {
                    email: candidate.email.clone(),
                    event_id: confirmation.event_id,
                    meet_link: confirmation.meet_link,
                })
            }
            Err(error) => {
                warn!(
                    event_name = "outreach.schedule.failed",
                    candidate_email = %candidate.email,
                    candidate_name = %candidate.name,
                    error = %error,
                    "scheduling failed; candidate stays unresolved"
                );
                self.bus.publish(OutreachEvent::log(format!(
                    "[Scheduling] Failed for {}: {error}",
                    candidate.email
                )));
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;

    use concierge_core::domain::candidate::{CandidateDraft, CandidateStatus};
    use concierge_core::domain::outreach::{MeetingParameters, OutreachRun};
    use concierge_core::events::{EventBus, OutreachEvent};
    use concierge_core::registry::CandidateRegistry;
    use concierge_core::token::correlation_token;
    use concierge_providers::email::{DeliveryReceipt, EmailSender, OutboundEmail};
    use concierge_providers::memory::{InMemoryMailbox, SimulatedCalendar};
    use concierge_providers::replies::ReplyMessage;
    use concierge_providers::ProviderError;

    use super::OutreachFlowEngine;

    fn run_with(candidates: Vec<CandidateDraft>, window: Duration) -> OutreachRun {
        OutreachRun {
            candidates,
            subject: "Hi".to_owned(),
            body_template: "Hi {{ name }}, join us.".to_owned(),
            window,
            poll_interval: Duration::from_millis(10),
            meeting: MeetingParameters::default(),
        }
    }

    fn engine_with_mailbox() -> (OutreachFlowEngine, EventBus, CandidateRegistry, Arc<InMemoryMailbox>)
    {
        let bus = EventBus::new();
        let registry = CandidateRegistry::new();
        let mailbox = Arc::new(InMemoryMailbox::default());
        let engine = OutreachFlowEngine::new(
            bus.clone(),
            registry.clone(),
            mailbox.clone(),
            mailbox.clone(),
            Arc::new(SimulatedCalendar),
        );
        (engine, bus, registry, mailbox)
    }

    fn drain(receiver: &mut tokio::sync::broadcast::Receiver<OutreachEvent>) -> Vec<OutreachEvent> {
        let mut events = Vec::new();
        while let Ok(event) = receiver.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test(start_paused = true)]
    async fn reply_within_window_schedules_and_accepts_the_candidate() {
        let (engine, bus, registry, mailbox) = engine_with_mailbox();
        let mut receiver = bus.subscribe();

        let token = correlation_token("ada@x.com", "Hi");
        mailbox.inject_reply(
            &token,
            ReplyMessage { id: "r1".to_owned(), snippet: "Yes, I'm in".to_owned() },
        );

        let guard = bus.try_begin_run().expect("slot free");
        let scheduled = engine
            .run(
                run_with(
                    vec![
                        CandidateDraft::new("Ada", "ada@x.com"),
                        CandidateDraft::new("Grace", "grace@x.com"),
                    ],
                    Duration::from_secs(60),
                ),
                guard,
            )
            .await;

        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].email, "ada@x.com");
        assert!(!bus.is_run_active(), "run slot must be released");

        let all = registry.all();
        assert_eq!(all[0].status, CandidateStatus::Accepted);
        assert_eq!(all[1].status, CandidateStatus::Contacted, "no reply means still contacted");
        assert_eq!(all[0].correlation_token.as_deref(), Some(token.as_str()));

        let events = drain(&mut receiver);
        let done_count = events.iter().filter(|event| event.kind() == "done").count();
        assert_eq!(done_count, 1, "exactly one terminal event");

        let ada_statuses: Vec<&OutreachEvent> = events
            .iter()
            .filter(|event| {
                matches!(event, OutreachEvent::CandidateStatus { email, .. } if email == "ada@x.com")
            })
            .collect();
        assert_eq!(ada_statuses.len(), 2, "Contacted then Accepted");
        assert!(matches!(
            ada_statuses[0],
            OutreachEvent::CandidateStatus { status: CandidateStatus::Contacted, .. }
        ));
        assert!(matches!(
            ada_statuses[1],
            OutreachEvent::CandidateStatus { status: CandidateStatus::Accepted, .. }
        ));
    }

    #[tokio::test]
    async fn zero_window_exits_immediately_with_empty_done() {
        let (engine, bus, registry, _mailbox) = engine_with_mailbox();
        let mut receiver = bus.subscribe();

        let guard = bus.try_begin_run().expect("slot free");
        let scheduled = engine
            .run(
                run_with(vec![CandidateDraft::new("Ada", "ada@x.com")], Duration::ZERO),
                guard,
            )
            .await;

        assert!(scheduled.is_empty());
        assert!(!bus.is_run_active());
        assert_eq!(registry.all()[0].status, CandidateStatus::Contacted);

        let events = drain(&mut receiver);
        assert!(matches!(
            events.last(),
            Some(OutreachEvent::Done { ok: true, scheduled }) if scheduled.is_empty()
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn all_provider_failures_still_terminate_with_done() {
        let (engine, bus, registry, mailbox) = engine_with_mailbox();
        let mut receiver = bus.subscribe();
        mailbox.fail_sends(true);
        mailbox.fail_lookups(true);

        let guard = bus.try_begin_run().expect("slot free");
        let scheduled = engine
            .run(
                run_with(
                    vec![
                        CandidateDraft::new("Ada", "ada@x.com"),
                        CandidateDraft::new("Grace", "grace@x.com"),
                    ],
                    Duration::from_secs(60),
                ),
                guard,
            )
            .await;

        assert!(scheduled.is_empty());
        assert!(!bus.is_run_active(), "flag clears even when everything failed");
        for candidate in registry.all() {
            assert_eq!(candidate.status, CandidateStatus::Sourced, "failed sends stay Sourced");
        }

        let events = drain(&mut receiver);
        assert_eq!(events.iter().filter(|event| event.kind() == "done").count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn one_failed_send_does_not_abort_the_rest() {
        struct RejectOne {
            inner: Arc<InMemoryMailbox>,
            reject: String,
        }

        #[async_trait]
        impl EmailSender for RejectOne {
            async fn send_email(
                &self,
                message: &OutboundEmail,
            ) -> Result<DeliveryReceipt, ProviderError> {
                if message.to == self.reject {
                    return Err(ProviderError::Send("mailbox full".to_owned()));
                }
                self.inner.send_email(message).await
            }
        }

        let bus = EventBus::new();
        let registry = CandidateRegistry::new();
        let mailbox = Arc::new(InMemoryMailbox::default());
        let engine = OutreachFlowEngine::new(
            bus.clone(),
            registry.clone(),
            Arc::new(RejectOne { inner: mailbox.clone(), reject: "ada@x.com".to_owned() }),
            mailbox.clone(),
            Arc::new(SimulatedCalendar),
        );

        let guard = bus.try_begin_run().expect("slot free");
        engine
            .run(
                run_with(
                    vec![
                        CandidateDraft::new("Ada", "ada@x.com"),
                        CandidateDraft::new("Grace", "grace@x.com"),
                    ],
                    Duration::ZERO,
                ),
                guard,
            )
            .await;

        let all = registry.all();
        assert_eq!(all[0].status, CandidateStatus::Sourced, "rejected send stays Sourced");
        assert_eq!(all[1].status, CandidateStatus::Contacted);
        assert_eq!(mailbox.sent().len(), 1);
        assert_eq!(mailbox.sent()[0].to, "grace@x.com");
    }

    #[tokio::test(start_paused = true)]
    async fn candidates_without_email_are_skipped_entirely() {
        let (engine, bus, registry, mailbox) = engine_with_mailbox();

        let guard = bus.try_begin_run().expect("slot free");
        engine
            .run(
                run_with(
                    vec![
                        CandidateDraft { name: Some("No Email".to_owned()), ..Default::default() },
                        CandidateDraft::new("Ada", "ada@x.com"),
                    ],
                    Duration::ZERO,
                ),
                guard,
            )
            .await;

        assert_eq!(registry.all().len(), 1);
        assert_eq!(mailbox.sent().len(), 1);
    }
}
