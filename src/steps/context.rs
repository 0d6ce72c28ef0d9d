//! Local events and competitor landscape.
//!
//! Two searches run together; each result is summarized on its own so one bad
//! search never blanks the other summary.

use serde::Serialize;

use crate::generation::generate_text;
use crate::prompts::SNIPPET_ANSWER;
use crate::search::{SearchOutcome, SearchQuery, WebSearch};

use super::{PipelineStep, StepContext};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LocalContext {
    pub local_events_summary: String,
    pub competitor_types_summary: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Topic {
    Events,
    Competitors,
}

impl Topic {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Events => "event",
            Self::Competitors => "competitor",
        }
    }

    /// Used when the snippets are unusable.
    fn no_data(&self) -> &'static str {
        match self {
            Self::Events => "No specific events found or search/LLM failed.",
            Self::Competitors => "Could not determine competitor types or search/LLM failed.",
        }
    }

    fn llm_unavailable(&self) -> &'static str {
        match self {
            Self::Events => "LLM chain unavailable for event summary.",
            Self::Competitors => "LLM chain unavailable for competitor summary.",
        }
    }
}

pub fn context_queries(location: &str, business_type: &str, event: Option<&str>) -> (String, String) {
    let mut events = format!("major local events festivals happening in {location}");
    if let Some(event) = event {
        events.push_str(&format!(" around {event}"));
    }
    let competitors = format!("types of competitors for a {business_type} in {location}");
    (events, competitors)
}

async fn run_search(search: Option<&dyn WebSearch>, query: SearchQuery) -> SearchOutcome {
    let Some(search) = search else {
        return SearchOutcome::NotConfigured;
    };
    match search.search(&query).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::warn!(query = %query.text, error = %e, "context search failed");
            SearchOutcome::failed_request()
        }
    }
}

async fn summarize(
    ctx: StepContext<'_>,
    topic: Topic,
    outcome: &SearchOutcome,
    question: &str,
) -> String {
    let Some(chat) = ctx.services.chat.get() else {
        return topic.llm_unavailable().to_string();
    };
    let Some(snippets) = outcome.usable_snippets() else {
        tracing::debug!(topic = topic.as_str(), outcome = outcome.as_text(), "skipping summary");
        return topic.no_data().to_string();
    };

    let prompt = SNIPPET_ANSWER.render(&[("search_results", snippets), ("query", question)]);
    match generate_text(
        chat,
        &ctx.config.models.context,
        ctx.attribution(PipelineStep::ContextSearcher),
        &prompt,
    )
    .await
    {
        Ok(text) => text,
        Err(e) => {
            tracing::warn!(topic = topic.as_str(), error = %e, "context summary failed");
            format!("Error summarizing {} search results: {}", topic.as_str(), e.code())
        }
    }
}

pub async fn search_local_context(
    ctx: StepContext<'_>,
    location: &str,
    business_type: &str,
    event: Option<&str>,
) -> LocalContext {
    let (event_query, competitor_query) = context_queries(location, business_type, event);
    tracing::debug!(%event_query, %competitor_query, "context queries");

    let settings = &ctx.config.search;
    let search = ctx.services.search.get();
    let (events, competitors) = tokio::join!(
        run_search(
            search,
            SearchQuery::new(event_query).market(&settings.country, &settings.language)
        ),
        run_search(
            search,
            SearchQuery::new(competitor_query).market(&settings.country, &settings.language)
        ),
    );

    let local_events_summary = summarize(
        ctx,
        Topic::Events,
        &events,
        &format!(
            "Summarize the main local events or festivals mentioned for {location} based on the snippets."
        ),
    )
    .await;
    let competitor_types_summary = summarize(
        ctx,
        Topic::Competitors,
        &competitors,
        &format!(
            "Briefly list the main types of competitors mentioned for a {business_type} in {location} based on the snippets."
        ),
    )
    .await;

    LocalContext {
        local_events_summary,
        competitor_types_summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_query_mentions_event_only_when_known() {
        let (events, competitors) = context_queries("Pune", "cafe", Some("diwali"));
        assert_eq!(events, "major local events festivals happening in Pune around diwali");
        assert_eq!(competitors, "types of competitors for a cafe in Pune");

        let (events, _) = context_queries("Pune", "cafe", None);
        assert_eq!(events, "major local events festivals happening in Pune");
    }

    #[test]
    fn sentinels_differ_per_topic() {
        assert_ne!(Topic::Events.no_data(), Topic::Competitors.no_data());
        assert!(Topic::Competitors.llm_unavailable().contains("competitor"));
    }
}
