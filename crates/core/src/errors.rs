use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("unknown candidate status `{0}` (expected Sourced|Contacted|Accepted|Scheduled|Declined)")]
    UnknownStatus(String),
    #[error("candidate record has no email address")]
    MissingEmail,
}

/// Application-level failure taxonomy surfaced by the facade. Provider
/// failures inside a running flow are recovered per candidate and never
/// reach this type; these variants cover single HTTP commands.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("a run is already in progress")]
    RunInProgress,
    #[error("candidate not found: {0}")]
    CandidateNotFound(String),
    #[error("provider call failed: {0}")]
    Provider(String),
}

#[cfg(test)]
mod tests {
    use super::{ApplicationError, DomainError};

    #[test]
    fn domain_errors_convert_into_application_errors() {
        let error = ApplicationError::from(DomainError::MissingEmail);
        assert_eq!(error, ApplicationError::Domain(DomainError::MissingEmail));
    }

    #[test]
    fn conflict_message_names_the_active_run() {
        assert_eq!(ApplicationError::RunInProgress.to_string(), "a run is already in progress");
    }
}
