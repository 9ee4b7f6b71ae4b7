//! Typed event bus feeding the live dashboard stream.
//!
//! Events are fanned out over a tokio broadcast channel so every stream
//! subscriber sees them in publish order. Publishing never blocks and
//! tolerates having no subscribers at all (the dashboard may connect late or
//! disappear mid-run). The bus also owns the process-wide run-active flag
//! used to serialize top-level outreach runs.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::{json, Value};
use tokio::sync::broadcast;
use tracing::debug;

use crate::domain::candidate::{Candidate, CandidateStatus};
use crate::domain::outreach::ScheduledMeeting;

/// Slow subscribers fall behind by at most this many events before the
/// channel starts dropping the oldest ones for them.
const CHANNEL_CAPACITY: usize = 1024;

/// One dashboard-visible state transition. The demo sequencer and the real
/// flow engine emit the identical vocabulary.
#[derive(Clone, Debug, PartialEq)]
pub enum OutreachEvent {
    Log { message: String },
    Candidates(Vec<Candidate>),
    CandidateStatus { email: String, status: CandidateStatus },
    Done { ok: bool, scheduled: Vec<ScheduledMeeting> },
}

impl OutreachEvent {
    pub fn log(message: impl Into<String>) -> Self {
        Self::Log { message: message.into() }
    }

    pub fn status(email: impl Into<String>, status: CandidateStatus) -> Self {
        Self::CandidateStatus { email: email.into(), status }
    }

    pub fn done_ok(scheduled: Vec<ScheduledMeeting>) -> Self {
        Self::Done { ok: true, scheduled }
    }

    /// SSE event name for this transition.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Log { .. } => "log",
            Self::Candidates(_) => "candidates",
            Self::CandidateStatus { .. } => "candidate_status",
            Self::Done { .. } => "done",
        }
    }

    /// JSON wire payload, matching the dashboard contract.
    pub fn payload(&self) -> Value {
        match self {
            Self::Log { message } => json!({ "message": message }),
            Self::Candidates(candidates) => {
                serde_json::to_value(candidates).unwrap_or(Value::Null)
            }
            Self::CandidateStatus { email, status } => {
                json!({ "email": email, "status": status.as_str() })
            }
            Self::Done { ok, scheduled } => {
                json!({ "ok": ok, "scheduled": scheduled })
            }
        }
    }
}

/// Clears the run-active flag when dropped, so a flow that errors or is
/// cancelled still releases the process-wide run slot.
pub struct RunGuard {
    flag: Arc<AtomicBool>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<OutreachEvent>,
    run_active: Arc<AtomicBool>,
}

impl Default for EventBus {
    fn default() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender, run_active: Arc::new(AtomicBool::new(false)) }
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues an event for every current subscriber. Never blocks; an
    /// event published with no subscribers is simply dropped.
    pub fn publish(&self, event: OutreachEvent) {
        debug!(event_kind = event.kind(), "publishing outreach event");
        let _ = self.sender.send(event);
    }

    /// New subscription receiving events in publish order from this point
    /// on, until the receiver is dropped.
    pub fn subscribe(&self) -> broadcast::Receiver<OutreachEvent> {
        self.sender.subscribe()
    }

    /// Atomically claims the single run slot. Returns `None` when a run is
    /// already active; the returned guard releases the slot on drop.
    pub fn try_begin_run(&self) -> Option<RunGuard> {
        self.run_active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
            .then(|| RunGuard { flag: Arc::clone(&self.run_active) })
    }

    pub fn is_run_active(&self) -> bool {
        self.run_active.load(Ordering::Acquire)
    }
}
