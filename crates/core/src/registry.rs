//! In-memory candidate registry keyed by email.
//!
//! Merge-on-load semantics: repeated loads for the same email apply
//! field-wise last-write-wins, where an empty or missing incoming value
//! keeps the stored one. Records are never deleted for the lifetime of the
//! process, and `all()` returns them in first-insertion order.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use crate::domain::candidate::{Candidate, CandidateDraft, CandidateStatus};

#[derive(Clone, Default)]
pub struct CandidateRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

#[derive(Default)]
struct RegistryState {
    by_email: HashMap<String, Candidate>,
    order: Vec<String>,
}

impl CandidateRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges the given partial records and returns the full registry
    /// contents after the merge. Records without an email are skipped.
    pub fn load(&self, drafts: &[CandidateDraft]) -> Vec<Candidate> {
        let mut state = self.lock();
        for draft in drafts {
            let Some(email) = draft.email.as_deref().filter(|email| !email.is_empty()) else {
                continue;
            };
            match state.by_email.get_mut(email) {
                Some(existing) => merge_into(existing, draft),
                None => {
                    let candidate = Candidate {
                        name: draft.name.clone().unwrap_or_default(),
                        email: email.to_owned(),
                        expertise: draft.expertise.clone().unwrap_or_default(),
                        status: draft.status.unwrap_or(CandidateStatus::Sourced),
                        correlation_token: None,
                    };
                    state.order.push(email.to_owned());
                    state.by_email.insert(email.to_owned(), candidate);
                }
            }
        }
        snapshot(&state)
    }

    /// Full registry contents in insertion order.
    pub fn all(&self) -> Vec<Candidate> {
        snapshot(&self.lock())
    }

    /// Mutates the status of a known candidate. Returns `None` when the email
    /// is unknown, leaving the registry untouched.
    pub fn update_status(&self, email: &str, status: CandidateStatus) -> Option<Candidate> {
        let mut state = self.lock();
        let candidate = state.by_email.get_mut(email)?;
        candidate.status = status;
        Some(candidate.clone())
    }

    /// Records the correlation token for a known candidate. A no-op when the
    /// email is unknown; it must never create a record as a side effect.
    pub fn set_correlation_token(&self, email: &str, token: &str) {
        let mut state = self.lock();
        if let Some(candidate) = state.by_email.get_mut(email) {
            candidate.correlation_token = Some(token.to_owned());
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RegistryState> {
        match self.inner.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn merge_into(existing: &mut Candidate, draft: &CandidateDraft) {
    if let Some(name) = draft.name.as_deref().filter(|name| !name.is_empty()) {
        existing.name = name.to_owned();
    }
    if let Some(expertise) = draft.expertise.as_deref().filter(|expertise| !expertise.is_empty()) {
        existing.expertise = expertise.to_owned();
    }
    if let Some(status) = draft.status {
        existing.status = status;
    }
}

fn snapshot(state: &RegistryState) -> Vec<Candidate> {
    state.order.iter().filter_map(|email| state.by_email.get(email).cloned()).collect()
}

#[cfg(test)]
mod tests {
    use super::CandidateRegistry;
    use crate::domain::candidate::{CandidateDraft, CandidateStatus};

    #[test]
    fn load_defaults_status_to_sourced_on_first_insert() {
        let registry = CandidateRegistry::new();
        let all = registry.load(&[CandidateDraft::new("Ada", "ada@x.com")]);

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].status, CandidateStatus::Sourced);
        assert_eq!(all[0].name, "Ada");
    }

    #[test]
    fn records_without_email_are_silently_skipped() {
        let registry = CandidateRegistry::new();
        let all = registry.load(&[
            CandidateDraft { name: Some("No Email".to_owned()), ..CandidateDraft::default() },
            CandidateDraft { email: Some(String::new()), ..CandidateDraft::default() },
            CandidateDraft::new("Ada", "ada@x.com"),
        ]);

        assert_eq!(all.len(), 1);
        assert_eq!(all[0].email, "ada@x.com");
    }

    #[test]
    fn merge_keeps_prior_values_when_incoming_fields_are_empty() {
        let registry = CandidateRegistry::new();
        registry.load(&[CandidateDraft::new("A", "a@x.com")
            .with_status(CandidateStatus::Sourced)]);
        registry.load(&[CandidateDraft {
            name: Some(String::new()),
            email: Some("a@x.com".to_owned()),
            expertise: Some("ML".to_owned()),
            status: None,
        }]);

        let all = registry.all();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "A");
        assert_eq!(all[0].expertise, "ML");
        assert_eq!(all[0].status, CandidateStatus::Sourced);
    }

    #[test]
    fn merge_applies_last_write_wins_for_non_empty_fields() {
        let registry = CandidateRegistry::new();
        registry.load(&[CandidateDraft::new("Old Name", "a@x.com").with_expertise("Rust")]);
        registry.load(&[CandidateDraft::new("New Name", "a@x.com")
            .with_status(CandidateStatus::Contacted)]);

        let all = registry.all();
        assert_eq!(all[0].name, "New Name");
        assert_eq!(all[0].expertise, "Rust");
        assert_eq!(all[0].status, CandidateStatus::Contacted);
    }

    #[test]
    fn all_preserves_insertion_order_across_merges() {
        let registry = CandidateRegistry::new();
        registry.load(&[
            CandidateDraft::new("First", "first@x.com"),
            CandidateDraft::new("Second", "second@x.com"),
        ]);
        registry.load(&[CandidateDraft::new("First Updated", "first@x.com")]);

        let emails: Vec<String> =
            registry.all().into_iter().map(|candidate| candidate.email).collect();
        assert_eq!(emails, vec!["first@x.com", "second@x.com"]);
    }

    #[test]
    fn update_status_on_unknown_email_leaves_registry_unchanged() {
        let registry = CandidateRegistry::new();
        registry.load(&[CandidateDraft::new("Ada", "ada@x.com")]);

        let result = registry.update_status("ghost@x.com", CandidateStatus::Contacted);

        assert!(result.is_none());
        assert_eq!(registry.all().len(), 1);
        assert_eq!(registry.all()[0].status, CandidateStatus::Sourced);
    }

    #[test]
    fn set_correlation_token_never_creates_a_record() {
        let registry = CandidateRegistry::new();
        registry.set_correlation_token("ghost@x.com", "abc123");
        assert!(registry.all().is_empty());

        registry.load(&[CandidateDraft::new("Ada", "ada@x.com")]);
        registry.set_correlation_token("ada@x.com", "abc123");
        assert_eq!(registry.all()[0].correlation_token.as_deref(), Some("abc123"));
    }
}
