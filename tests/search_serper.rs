use std::time::Duration;

use campaign_planner::search::{SearchOutcome, SearchQuery, SerperAdapter, WebSearch};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn adapter(server: &MockServer) -> SerperAdapter {
    SerperAdapter::with_config("serper-test", server.uri(), Duration::from_secs(5), 3).unwrap()
}

#[tokio::test]
async fn serper_sends_key_and_market_and_joins_snippets() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .and(header("x-api-key", "serper-test"))
        .and(body_partial_json(json!({
            "q": "Diwali events in Pune",
            "gl": "in",
            "hl": "en"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "answerBox": { "snippet": "Diwali falls on 1 November." },
            "organic": [
                { "snippet": "Pune lights up for Diwali" },
                { "snippet": "FC Road stalls stay open late" }
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let outcome = adapter(&server)
        .search(&SearchQuery::new("Diwali events in Pune"))
        .await
        .unwrap();
    assert_eq!(
        outcome,
        SearchOutcome::Snippets(
            "Diwali falls on 1 November.\nPune lights up for Diwali\nFC Road stalls stay open late"
                .into()
        )
    );
    assert!(outcome.usable_snippets().is_some());
}

#[tokio::test]
async fn serper_empty_results_are_no_results() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "organic": [] })))
        .mount(&server)
        .await;

    let outcome = adapter(&server)
        .search(&SearchQuery::new("cafes in Nowhere"))
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::NoResults);
    assert_eq!(outcome.as_text(), "No relevant search result snippets found.");
}

#[tokio::test]
async fn serper_error_status_becomes_failed_outcome() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let outcome = adapter(&server)
        .search(&SearchQuery::new("cafes in Pune"))
        .await
        .unwrap();
    assert_eq!(outcome.as_text(), "Search failed with status: 500");
    assert!(outcome.usable_snippets().is_none());
}

#[tokio::test]
async fn serper_unparseable_body_is_a_failed_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/search"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>oops</html>"))
        .mount(&server)
        .await;

    let outcome = adapter(&server)
        .search(&SearchQuery::new("cafes in Pune"))
        .await
        .unwrap();
    assert_eq!(outcome, SearchOutcome::failed_request());
}
