//! Previous-campaign history lookup.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const NO_HISTORY: &str = "No previous campaign data found.";

const FIXTURE_USER: &str = "user123_with_history";
const FIXTURE_SUMMARY: &str = "Last campaign (Diwali Sale): Facebook Ads (Budget: 3k INR, Clicks: 45, Conversions: 8, Rate: 17.8%), Pamphlets (Budget: 2k INR, Scans: 15, Conversions: 5, Rate: 33.3%). Pamphlets had higher Conversion Rate.";

/// Free-text summary of the user's last campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistorySummary {
    pub previous_campaign_summary: String,
}

impl HistorySummary {
    pub fn none() -> Self {
        Self {
            previous_campaign_summary: NO_HISTORY.to_string(),
        }
    }

    pub fn has_history(&self) -> bool {
        self.previous_campaign_summary != NO_HISTORY
    }
}

/// Keyed store of previous campaign results. Lookups never fail; a user with
/// no record gets [`HistorySummary::none`].
#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn previous_results(&self, user_id: &str) -> HistorySummary;
}

/// In-memory store seeded with one fixture user.
#[derive(Debug, Clone)]
pub struct MockHistoryStore {
    entries: HashMap<String, String>,
}

impl Default for MockHistoryStore {
    fn default() -> Self {
        let mut entries = HashMap::new();
        entries.insert(FIXTURE_USER.to_string(), FIXTURE_SUMMARY.to_string());
        Self { entries }
    }
}

impl MockHistoryStore {
    /// Fixture plus configured entries. Configured entries win on conflict.
    pub fn with_entries(extra: &BTreeMap<String, String>) -> Self {
        let mut store = Self::default();
        store
            .entries
            .extend(extra.iter().map(|(k, v)| (k.clone(), v.clone())));
        store
    }
}

#[async_trait]
impl HistoryStore for MockHistoryStore {
    async fn previous_results(&self, user_id: &str) -> HistorySummary {
        match self.entries.get(user_id) {
            Some(summary) => {
                tracing::debug!(user_id, "previous results found");
                HistorySummary {
                    previous_campaign_summary: summary.clone(),
                }
            }
            None => {
                tracing::debug!(user_id, "no previous results");
                HistorySummary::none()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn fixture_user_has_history() {
        let store = MockHistoryStore::default();
        let h = store.previous_results("user123_with_history").await;
        assert!(h.has_history());
        assert!(h.previous_campaign_summary.starts_with("Last campaign (Diwali Sale)"));
        assert!(h.previous_campaign_summary.ends_with("Pamphlets had higher Conversion Rate."));
    }

    #[tokio::test]
    async fn unknown_user_gets_sentinel() {
        let h = MockHistoryStore::default().previous_results("new_user_456").await;
        assert_eq!(h, HistorySummary::none());
        assert!(!h.has_history());
    }

    #[tokio::test]
    async fn configured_entries_extend_the_fixture() {
        let mut extra = BTreeMap::new();
        extra.insert("cafe_7".to_string(), "Instagram had the highest Conversion Rate".to_string());
        let store = MockHistoryStore::with_entries(&extra);
        assert!(store.previous_results("cafe_7").await.has_history());
        assert!(store.previous_results("user123_with_history").await.has_history());
    }
}
