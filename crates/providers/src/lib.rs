//! External collaborator surface for the concierge workflow.
//!
//! Everything the outreach flow needs from the outside world is behind a
//! trait here:
//! - **Email** (`email`) - outbound invitation delivery
//! - **Replies** (`replies`) - reply lookup keyed by correlation token
//! - **Calendar** (`calendar`) - meeting creation with conferencing links
//! - **Sourcing** (`sourcing`) - candidate search by topic
//! - **LLM** (`llm`) - completion and reply analysis
//!
//! `memory` holds in-process implementations used in offline/simulation mode
//! and by tests; `relay` is an HTTP webhook email sender for deployments with
//! a real mail relay.

pub mod calendar;
pub mod email;
pub mod llm;
pub mod memory;
pub mod relay;
pub mod replies;
pub mod sourcing;

use std::sync::Arc;

use thiserror::Error;

pub use calendar::{MeetingConfirmation, MeetingRequest, MeetingScheduler};
pub use email::{DeliveryReceipt, EmailSender, OutboundEmail};
pub use llm::{LlmClient, OpenAiClient, ReplyAnalysis};
pub use memory::{InMemoryMailbox, SimulatedCalendar};
pub use replies::{ReplyFinder, ReplyMessage};
pub use sourcing::{CandidateSearch, RosterSearch};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("provider is not configured: {0}")]
    NotConfigured(String),
    #[error("email send failed: {0}")]
    Send(String),
    #[error("reply lookup failed: {0}")]
    Lookup(String),
    #[error("meeting scheduling failed: {0}")]
    Schedule(String),
    #[error("candidate search failed: {0}")]
    Search(String),
    #[error("llm call failed: {0}")]
    Llm(String),
}

/// The bundle of collaborators one process runs against.
#[derive(Clone)]
pub struct ProviderSet {
    pub email: Arc<dyn EmailSender>,
    pub replies: Arc<dyn ReplyFinder>,
    pub calendar: Arc<dyn MeetingScheduler>,
    pub search: Arc<dyn CandidateSearch>,
    pub llm: Option<Arc<dyn LlmClient>>,
}

impl ProviderSet {
    /// Fully in-process set: a shared mailbox backs both the send and the
    /// reply-lookup side, so injected replies are found by token.
    pub fn in_memory() -> (Self, Arc<InMemoryMailbox>) {
        let mailbox = Arc::new(InMemoryMailbox::default());
        let set = Self {
            email: mailbox.clone(),
            replies: mailbox.clone(),
            calendar: Arc::new(SimulatedCalendar),
            search: Arc::new(RosterSearch::default()),
            llm: None,
        };
        (set, mailbox)
    }
}
