use serde::{Deserialize, Serialize};

use crate::errors::DomainError;

/// Lifecycle of a sourced candidate. Transitions are driven by the outreach
/// flow: Sourced -> Contacted -> Accepted | Scheduled | Declined.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateStatus {
    Sourced,
    Contacted,
    Accepted,
    Scheduled,
    Declined,
}

impl CandidateStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sourced => "Sourced",
            Self::Contacted => "Contacted",
            Self::Accepted => "Accepted",
            Self::Scheduled => "Scheduled",
            Self::Declined => "Declined",
        }
    }
}

impl std::str::FromStr for CandidateStatus {
    type Err = DomainError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "Sourced" => Ok(Self::Sourced),
            "Contacted" => Ok(Self::Contacted),
            "Accepted" => Ok(Self::Accepted),
            "Scheduled" => Ok(Self::Scheduled),
            "Declined" => Ok(Self::Declined),
            other => Err(DomainError::UnknownStatus(other.to_owned())),
        }
    }
}

/// One sourced speaker/juror. `email` is the sole identity key; a candidate
/// without an email is unusable for reply correlation and is never stored.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Candidate {
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub expertise: String,
    pub status: CandidateStatus,
    #[serde(rename = "refToken", skip_serializing_if = "Option::is_none")]
    pub correlation_token: Option<String>,
}

/// Partial record as accepted on load paths (sourcing output, manual load,
/// outreach send). Missing fields keep whatever the registry already holds.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateDraft {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub expertise: Option<String>,
    #[serde(default)]
    pub status: Option<CandidateStatus>,
}

impl CandidateDraft {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self { name: Some(name.into()), email: Some(email.into()), expertise: None, status: None }
    }

    pub fn with_status(mut self, status: CandidateStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_expertise(mut self, expertise: impl Into<String>) -> Self {
        self.expertise = Some(expertise.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::CandidateStatus;

    #[test]
    fn status_round_trips_through_wire_names() {
        for status in [
            CandidateStatus::Sourced,
            CandidateStatus::Contacted,
            CandidateStatus::Accepted,
            CandidateStatus::Scheduled,
            CandidateStatus::Declined,
        ] {
            assert_eq!(status.as_str().parse::<CandidateStatus>().expect("parse"), status);
        }
    }

    #[test]
    fn unknown_status_is_rejected() {
        assert!("Ghosted".parse::<CandidateStatus>().is_err());
    }
}
