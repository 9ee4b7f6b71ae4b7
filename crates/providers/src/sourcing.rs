use async_trait::async_trait;
use concierge_core::domain::candidate::CandidateDraft;

use crate::ProviderError;

/// Sources candidate speakers/jurors for a topic. Real deployments back this
/// with search or scraping; offline mode searches a fixed roster.
#[async_trait]
pub trait CandidateSearch: Send + Sync {
    async fn search_candidates(&self, topic: &str) -> Result<Vec<CandidateDraft>, ProviderError>;
}

/// Searches a static roster by case-insensitive topic match against each
/// candidate's expertise, falling back to the whole roster when nothing
/// matches.
pub struct RosterSearch {
    roster: Vec<CandidateDraft>,
}

impl RosterSearch {
    pub fn new(roster: Vec<CandidateDraft>) -> Self {
        Self { roster }
    }
}

impl Default for RosterSearch {
    fn default() -> Self {
        Self::new(vec![
            CandidateDraft::new("Dr. Evelyn Reed", "e.reed@example.com")
                .with_expertise("Quantum Computing"),
            CandidateDraft::new("Marco Jin", "m.jin@example.com").with_expertise("AI in FinTech"),
            CandidateDraft::new("Anya Sharma", "a.sharma@example.com")
                .with_expertise("Decentralized Science"),
        ])
    }
}

#[async_trait]
impl CandidateSearch for RosterSearch {
    async fn search_candidates(&self, topic: &str) -> Result<Vec<CandidateDraft>, ProviderError> {
        let needle = topic.trim().to_lowercase();
        let matched: Vec<CandidateDraft> = self
            .roster
            .iter()
            .filter(|candidate| {
                candidate
                    .expertise
                    .as_deref()
                    .is_some_and(|expertise| expertise.to_lowercase().contains(&needle))
            })
            .cloned()
            .collect();

        if matched.is_empty() {
            Ok(self.roster.clone())
        } else {
            Ok(matched)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{CandidateSearch, RosterSearch};

    #[tokio::test]
    async fn topic_match_filters_the_roster() {
        let search = RosterSearch::default();
        let hits = search.search_candidates("fintech").await.expect("search");

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].email.as_deref(), Some("m.jin@example.com"));
    }

    #[tokio::test]
    async fn unmatched_topic_falls_back_to_the_full_roster() {
        let search = RosterSearch::default();
        let hits = search.search_candidates("underwater basket weaving").await.expect("search");
        assert_eq!(hits.len(), 3);
    }
}
