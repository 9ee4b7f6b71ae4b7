pub mod config;
pub mod domain;
pub mod errors;
pub mod events;
pub mod registry;
pub mod token;

pub use domain::candidate::{Candidate, CandidateDraft, CandidateStatus};
pub use domain::outreach::{MeetingParameters, OutreachRun, ScheduledMeeting};
pub use errors::{ApplicationError, DomainError};
pub use events::{EventBus, OutreachEvent, RunGuard};
pub use registry::CandidateRegistry;
pub use token::correlation_token;
