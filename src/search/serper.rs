//! Serper (Google search) adapter.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use super::{SearchError, SearchOutcome, SearchQuery, WebSearch};

const DEFAULT_BASE_URL: &str = "https://google.serper.dev";

#[derive(Debug, Clone)]
pub struct SerperAdapter {
    client: reqwest::Client,
    base_url: String,
    max_organic: usize,
}

impl SerperAdapter {
    pub fn new(api_key: impl Into<String>) -> Result<Self, SearchError> {
        Self::with_config(api_key, DEFAULT_BASE_URL, Duration::from_secs(10), 3)
    }

    /// Create from `SERPER_API_KEY` / `SERPER_BASE_URL`.
    pub fn from_env(timeout: Duration, max_organic: usize) -> Result<Self, SearchError> {
        let api_key = std::env::var("SERPER_API_KEY")
            .map_err(|_| SearchError::Config("SERPER_API_KEY not set".into()))?;
        let base_url =
            std::env::var("SERPER_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.into());
        Self::with_config(api_key, base_url, timeout, max_organic)
    }

    pub fn with_config(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
        max_organic: usize,
    ) -> Result<Self, SearchError> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let key = HeaderValue::from_str(&api_key.into())
            .map_err(|_| SearchError::Config("Invalid API key format".into()))?;
        headers.insert("X-API-KEY", key);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| SearchError::Client(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: base_url.into(),
            max_organic,
        })
    }

    fn search_url(&self) -> String {
        format!("{}/search", self.base_url.trim_end_matches('/'))
    }

    /// Answer box first, then the leading organic results.
    fn collect_snippets(&self, body: SerperResponse) -> SearchOutcome {
        let mut snippets: Vec<String> = Vec::new();

        if let Some(answer) = body.answer_box {
            let text = answer
                .snippet
                .filter(|s| !s.is_empty())
                .or(answer.answer)
                .unwrap_or_default();
            snippets.push(text);
        }

        snippets.extend(
            body.organic
                .unwrap_or_default()
                .into_iter()
                .take(self.max_organic)
                .map(|item| item.snippet.unwrap_or_default()),
        );

        let joined = snippets
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join("\n");

        if joined.is_empty() {
            SearchOutcome::NoResults
        } else {
            SearchOutcome::Snippets(joined)
        }
    }
}

#[derive(Serialize)]
struct SerperRequest<'a> {
    q: &'a str,
    gl: &'a str,
    hl: &'a str,
}

#[derive(Deserialize)]
struct SerperResponse {
    #[serde(rename = "answerBox")]
    answer_box: Option<AnswerBox>,
    organic: Option<Vec<OrganicResult>>,
}

#[derive(Deserialize)]
struct AnswerBox {
    snippet: Option<String>,
    answer: Option<String>,
}

#[derive(Deserialize)]
struct OrganicResult {
    snippet: Option<String>,
}

#[async_trait]
impl WebSearch for SerperAdapter {
    async fn search(&self, query: &SearchQuery) -> Result<SearchOutcome, SearchError> {
        let body = SerperRequest {
            q: &query.text,
            gl: &query.country,
            hl: &query.language,
        };

        let response = match self.client.post(self.search_url()).json(&body).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(query = %query.text, error = %e, "search request failed");
                return Ok(SearchOutcome::failed_request());
            }
        };

        let status = response.status();
        if !status.is_success() {
            tracing::warn!(query = %query.text, status = status.as_u16(), "search returned error status");
            return Ok(SearchOutcome::failed_status(status.as_u16()));
        }

        match response.json::<SerperResponse>().await {
            Ok(parsed) => Ok(self.collect_snippets(parsed)),
            Err(e) => {
                tracing::warn!(query = %query.text, error = %e, "search response was not valid JSON");
                Ok(SearchOutcome::failed_request())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adapter() -> SerperAdapter {
        SerperAdapter::with_config("key", "http://localhost:1", Duration::from_secs(1), 3).unwrap()
    }

    #[test]
    fn answer_box_comes_before_organic_and_organic_is_capped() {
        let body: SerperResponse = serde_json::from_value(serde_json::json!({
            "answerBox": {"snippet": "", "answer": "Diwali is in November"},
            "organic": [
                {"snippet": "one"}, {"snippet": ""}, {"snippet": "three"}, {"snippet": "four"}
            ]
        }))
        .unwrap();
        assert_eq!(
            adapter().collect_snippets(body),
            SearchOutcome::Snippets("Diwali is in November\none\nthree".into())
        );
    }

    #[test]
    fn empty_response_is_no_results() {
        let body: SerperResponse = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(adapter().collect_snippets(body), SearchOutcome::NoResults);
    }
}
