//! Web-search collaborator used by the trend and context steps.
//!
//! A search returns a [`SearchOutcome`], never a bare string. The outcome still
//! renders to the sentinel wording the summarizers were built around, so
//! downstream prompts and the failure-indicator check see the same text either way.

pub mod serper;

use async_trait::async_trait;
use thiserror::Error;

pub use serper::SerperAdapter;

/// Substrings that mark snippet text as a failure notice rather than results.
const FAILURE_INDICATORS: &[&str] = &["failed", "configured", "found"];

/// One search query plus market/language hints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchQuery {
    pub text: String,
    /// Country hint (Serper `gl`), e.g. "in".
    pub country: String,
    /// Language hint (Serper `hl`), e.g. "en".
    pub language: String,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            country: "in".to_string(),
            language: "en".to_string(),
        }
    }

    pub fn market(mut self, country: impl Into<String>, language: impl Into<String>) -> Self {
        self.country = country.into();
        self.language = language.into();
        self
    }
}

/// What a search produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchOutcome {
    /// Newline-joined snippets, never empty.
    Snippets(String),
    /// The search ran but nothing usable came back.
    NoResults,
    /// No API key, so the search never ran.
    NotConfigured,
    /// Transport or HTTP failure, already rendered as a sentinel sentence.
    Failed(String),
}

impl SearchOutcome {
    pub fn failed_request() -> Self {
        Self::Failed("Search request failed.".to_string())
    }

    pub fn failed_status(status: u16) -> Self {
        Self::Failed(format!("Search failed with status: {status}"))
    }

    /// Text handed to summarizers and logs.
    pub fn as_text(&self) -> &str {
        match self {
            Self::Snippets(text) => text,
            Self::NoResults => "No relevant search result snippets found.",
            Self::NotConfigured => "Search API key not configured.",
            Self::Failed(reason) => reason,
        }
    }

    /// Snippets that are safe to summarize.
    ///
    /// Only real results qualify, and even those are rejected when their text
    /// contains one of the failure indicators.
    pub fn usable_snippets(&self) -> Option<&str> {
        match self {
            Self::Snippets(text) if !contains_failure_indicator(text) => Some(text),
            _ => None,
        }
    }
}

/// Whether text reads like a failed or empty search.
pub fn contains_failure_indicator(text: &str) -> bool {
    let lower = text.to_lowercase();
    FAILURE_INDICATORS.iter().any(|needle| lower.contains(needle))
}

/// Errors raised by the search call itself, as opposed to failed searches
/// reported through [`SearchOutcome`].
#[derive(Debug, Error)]
pub enum SearchError {
    #[error("search client error: {0}")]
    Client(String),
    #[error("search configuration error: {0}")]
    Config(String),
}

#[async_trait]
pub trait WebSearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sentinel_texts_trip_the_failure_check() {
        for outcome in [
            SearchOutcome::NoResults,
            SearchOutcome::NotConfigured,
            SearchOutcome::failed_request(),
            SearchOutcome::failed_status(503),
        ] {
            assert!(contains_failure_indicator(outcome.as_text()), "{outcome:?}");
            assert!(outcome.usable_snippets().is_none());
        }
    }

    #[test]
    fn snippets_with_indicator_words_are_rejected() {
        let outcome = SearchOutcome::Snippets("Store found near the station".into());
        assert!(outcome.usable_snippets().is_none());

        let outcome = SearchOutcome::Snippets("Ganesh festival draws crowds".into());
        assert_eq!(outcome.usable_snippets(), Some("Ganesh festival draws crowds"));
    }

    #[test]
    fn query_defaults_to_indian_market() {
        let q = SearchQuery::new("cafes in Pune");
        assert_eq!(q.country, "in");
        assert_eq!(q.language, "en");
        let q = q.market("us", "en");
        assert_eq!(q.country, "us");
    }
}
