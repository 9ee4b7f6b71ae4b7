//! Scripted demo replay used when the process runs offline.
//!
//! Replays a fixed sourcing-and-outreach scenario with artificial pauses and
//! no provider I/O, emitting the same event vocabulary as the real engine so
//! the dashboard contract is identical either way.

use std::time::Duration;

use tokio::time::sleep;
use tracing::info;

use concierge_core::domain::candidate::{Candidate, CandidateDraft, CandidateStatus};
use concierge_core::events::{EventBus, OutreachEvent, RunGuard};
use concierge_core::registry::CandidateRegistry;

const DEFAULT_PAUSE: Duration = Duration::from_millis(800);

#[derive(Clone)]
pub struct DemoSequencer {
    bus: EventBus,
    registry: CandidateRegistry,
    pause: Duration,
}

impl DemoSequencer {
    pub fn new(bus: EventBus, registry: CandidateRegistry) -> Self {
        Self { bus, registry, pause: DEFAULT_PAUSE }
    }

    /// Overrides the artificial pause between scripted beats.
    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    /// Replays the scripted run. Terminal `done` and run-slot release happen
    /// on every path, mirroring the real engine.
    pub async fn run(&self, topic: &str, guard: RunGuard) {
        info!(event_name = "outreach.demo.started", topic, "running scripted demo sequence");
        self.replay(topic).await;
        self.bus.publish(OutreachEvent::done_ok(Vec::new()));
        drop(guard);
    }

    async fn replay(&self, topic: &str) {
        let roster = demo_roster();

        self.log(format!("--- Launching Orchestrator for topic: {topic} ---"));
        self.log("Running in simulation mode (no external providers).");
        self.pause().await;

        self.log("[SourcingAgent] Starting search...");
        self.pause().await;

        // The registry may already hold unrelated records; the scripted
        // scenario announces only what its own search turned up.
        let sourced: Vec<Candidate> = self
            .registry
            .load(&roster)
            .into_iter()
            .filter(|candidate| {
                roster.iter().any(|draft| draft.email.as_deref() == Some(candidate.email.as_str()))
            })
            .collect();
        self.log(format!("[SourcingAgent] Found {} potential candidates.", sourced.len()));
        self.bus.publish(OutreachEvent::Candidates(sourced));
        self.pause().await;

        self.log("[SourcingAgent] Task complete. Passing results to SchedulingAgent.");
        self.log("[SchedulingAgent] Initializing outreach sequence...");

        for draft in &roster {
            self.pause().await;
            let (Some(name), Some(email)) = (draft.name.as_deref(), draft.email.as_deref()) else {
                continue;
            };
            self.log(format!("[SchedulingAgent] Sending outreach email to {name}."));
            self.registry.update_status(email, CandidateStatus::Contacted);
            self.bus.publish(OutreachEvent::status(email, CandidateStatus::Contacted));
        }

        if let Some(first) = roster.first() {
            self.pause().await;
            if let (Some(name), Some(email)) = (first.name.as_deref(), first.email.as_deref()) {
                self.log(format!(
                    "[SchedulingAgent] Received positive reply from {name}. Scheduling meeting."
                ));
                self.registry.update_status(email, CandidateStatus::Accepted);
                self.bus.publish(OutreachEvent::status(email, CandidateStatus::Accepted));
            }
        }

        self.pause().await;
        self.log("[SchedulingAgent] Task complete.");
    }

    fn log(&self, message: impl Into<String>) {
        self.bus.publish(OutreachEvent::log(message));
    }

    async fn pause(&self) {
        if !self.pause.is_zero() {
            sleep(self.pause).await;
        }
    }
}

/// The fixed roster the scripted scenario sources, regardless of topic.
fn demo_roster() -> Vec<CandidateDraft> {
    vec![
        CandidateDraft::new("Dr. Evelyn Reed", "e.reed@example.com")
            .with_expertise("Quantum Computing"),
        CandidateDraft::new("Marco Jin", "m.jin@example.com").with_expertise("AI in FinTech"),
        CandidateDraft::new("Anya Sharma", "a.sharma@example.com")
            .with_expertise("Decentralized Science"),
    ]
}
