//! Timing and interest signals from web search, summarized by the model.

use serde::Serialize;

use crate::generation::generate_text;
use crate::prompts::TREND_SUMMARY;
use crate::search::{SearchOutcome, SearchQuery};

use super::{PipelineStep, StepContext};

pub const NO_KEYWORDS: &str = "No keywords provided.";
pub const SEARCH_FAILED: &str = "Search failed for trend analysis.";
pub const NO_VALID_RESULTS: &str = "No valid search results found.";
pub const LLM_UNAVAILABLE: &str = "LLM not available for trend summary.";
pub const SUMMARY_FAILED: &str = "Error summarizing trend search results.";

const MAX_QUERY_KEYWORDS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendSummary {
    pub timing_recommendation: String,
    /// Always empty for now; kept for prompt compatibility.
    pub related_queries: Vec<String>,
}

impl TrendSummary {
    fn sentinel(text: &str) -> Self {
        Self {
            timing_recommendation: text.to_string(),
            related_queries: Vec::new(),
        }
    }
}

/// Space-joined first three non-blank keywords.
pub fn combined_keywords(keywords: &[String]) -> String {
    keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .take(MAX_QUERY_KEYWORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Timing-focused and interest-focused query strings.
pub fn trend_queries(combined: &str, location: &str, event: Option<&str>) -> (String, String) {
    let timing = match event {
        Some(event) => format!("best time marketing campaign {combined} {event} in {location}"),
        None => format!("best time marketing campaign {combined} in {location}"),
    };
    let interest = format!("latest news {combined} offers promotions in {location}");
    (timing, interest)
}

pub async fn analyze_trends(
    ctx: StepContext<'_>,
    keywords: &[String],
    location: &str,
    event: Option<&str>,
) -> TrendSummary {
    let combined = combined_keywords(keywords);
    if combined.is_empty() {
        return TrendSummary::sentinel(NO_KEYWORDS);
    }
    let (timing_query, interest_query) = trend_queries(&combined, location, event);
    tracing::debug!(%timing_query, %interest_query, "trend queries");

    let outcomes = match ctx.services.search.get() {
        Some(search) => {
            let settings = &ctx.config.search;
            let timing = SearchQuery::new(timing_query).market(&settings.country, &settings.language);
            let interest =
                SearchQuery::new(interest_query).market(&settings.country, &settings.language);
            tokio::try_join!(search.search(&timing), search.search(&interest))
        }
        None => Ok((SearchOutcome::NotConfigured, SearchOutcome::NotConfigured)),
    };
    let (timing, interest) = match outcomes {
        Ok(pair) => pair,
        Err(e) => {
            tracing::warn!(error = %e, "trend search failed");
            return TrendSummary::sentinel(SEARCH_FAILED);
        }
    };

    let snippets = [&timing, &interest]
        .into_iter()
        .filter_map(|outcome| match outcome {
            SearchOutcome::Snippets(text) => Some(text.as_str()),
            other => {
                tracing::debug!(outcome = other.as_text(), "trend search returned no snippets");
                None
            }
        })
        .collect::<Vec<_>>()
        .join("\n");
    if snippets.trim().is_empty() {
        return TrendSummary::sentinel(NO_VALID_RESULTS);
    }

    let Some(chat) = ctx.services.chat.get() else {
        return TrendSummary::sentinel(LLM_UNAVAILABLE);
    };
    let prompt = TREND_SUMMARY.render(&[
        ("topic", combined.as_str()),
        ("location", location),
        ("search_results", snippets.trim()),
    ]);
    match generate_text(
        chat,
        &ctx.config.models.trends,
        ctx.attribution(PipelineStep::TrendAnalyzer),
        &prompt,
    )
    .await
    {
        Ok(text) => TrendSummary {
            timing_recommendation: text,
            related_queries: Vec::new(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "trend summary failed");
            TrendSummary::sentinel(SUMMARY_FAILED)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_first_three_keywords_are_used() {
        let kws: Vec<String> = ["discount", " ", "sale", "coffee", "latte"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(combined_keywords(&kws), "discount sale coffee");
    }

    #[test]
    fn queries_include_event_when_present() {
        let (timing, interest) = trend_queries("discount sale", "Pune", Some("diwali"));
        assert_eq!(timing, "best time marketing campaign discount sale diwali in Pune");
        assert_eq!(interest, "latest news discount sale offers promotions in Pune");

        let (timing, _) = trend_queries("discount sale", "Pune", None);
        assert_eq!(timing, "best time marketing campaign discount sale in Pune");
    }
}
