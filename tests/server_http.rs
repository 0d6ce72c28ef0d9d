use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use campaign_planner::config::PlannerConfig;
use campaign_planner::gateway::{ChatGateway, ChatRequest, ChatResponse, ProviderError};
use campaign_planner::pipeline::Planner;
use campaign_planner::server;
use campaign_planner::services::{Collaborator, Services};
use campaign_planner::steps::entities::EntityRecognizer;
use campaign_planner::steps::history::MockHistoryStore;
use campaign_planner::steps::lexicon::LexiconRecognizer;
use serde_json::{json, Value};

/// Answers every step with a canned reply; persona can be made to fail.
struct CannedChat {
    persona_fails: bool,
}

#[async_trait]
impl ChatGateway for CannedChat {
    async fn chat(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let content = match req.attribution.caller {
            "step::persona" if self.persona_fails => {
                return Err(ProviderError::provider("canned", "upstream unavailable", true));
            }
            "step::persona" => json!({
                "segment_name": "Office goers near Baner",
                "description": "25-35, short lunch breaks, value quick service.",
                "key_pain_points": ["Long queues"],
                "preferred_channels": ["Instagram", "Flyers"],
                "motivation_triggers": ["Convenience"]
            })
            .to_string(),
            "step::strategy" => json!({
                "recommended_channels": ["Instagram Ads", "Flyers"],
                "budget_split": {"Instagram Ads": 2000, "Flyers": 1000},
                "campaign_angle": "Lunch in Ten",
                "justification": "Fast lunches for busy office goers."
            })
            .to_string(),
            "step::creative" => json!({
                "instagram_ads_copy": "Lunch in ten minutes at [Shop Name]. Tap the link!",
                "flyers_copy": "Scan the QR for 10% off your first thali."
            })
            .to_string(),
            "step::visuals" => json!({
                "visual_prompts": ["A busy office lunch counter", "A steaming thali on a desk"]
            })
            .to_string(),
            _ => "Weekday lunch hours are busiest.".to_string(),
        };
        Ok(ChatResponse::text(content))
    }
}

async fn spawn_server(persona_fails: bool) -> SocketAddr {
    let services = Services {
        chat: Collaborator::ready(Arc::new(CannedChat { persona_fails }) as Arc<dyn ChatGateway>),
        search: Collaborator::unavailable("SERPER_API_KEY not set"),
        entities: Collaborator::ready(Arc::new(LexiconRecognizer::default()) as Arc<dyn EntityRecognizer>),
        history: Arc::new(MockHistoryStore::default()),
    };
    let planner = Arc::new(Planner::new(services, PlannerConfig::default()));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, server::router(planner)).await.unwrap();
    });
    addr
}

fn request() -> Value {
    json!({
        "business_type": "restaurant",
        "location": "Pune",
        "goal_description": "More weekday lunch orders",
        "budget_min": 2000,
        "budget_max": 4000,
        "channel_preference": "AI Recommend",
        "user_id": "new_user"
    })
}

#[tokio::test]
async fn root_reports_liveness() {
    let addr = spawn_server(false).await;
    let body: Value = reqwest::get(format!("http://{addr}/"))
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(body, json!({"message": "Campaign planner API is running!"}));
}

#[tokio::test]
async fn generate_plan_returns_the_plan() {
    let addr = spawn_server(false).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/generate_plan"))
        .json(&request())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 200);

    let plan: Value = resp.json().await.unwrap();
    let recs = plan["channel_recommendations"].as_array().unwrap();
    assert_eq!(recs.len(), 2);
    let total: i64 = recs
        .iter()
        .map(|r| r["allocated_budget"].as_i64().unwrap())
        .sum();
    assert_eq!(total, 3000);
    assert_eq!(recs[1]["tracking_info"]["type"], "qr_code");
    assert_eq!(plan["campaign_overview"]["suggested_theme_name"], "Lunch in Ten");
    assert_eq!(plan["feedback_loop_note"], "No previous campaign data found.");
}

#[tokio::test]
async fn unknown_channel_preference_is_unprocessable() {
    let addr = spawn_server(false).await;
    let mut raw = request();
    raw["channel_preference"] = json!("Hybrid");

    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/generate_plan"))
        .json(&raw)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("Hybrid"));
}

#[tokio::test]
async fn malformed_body_is_unprocessable() {
    let addr = spawn_server(false).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/generate_plan"))
        .header("content-type", "application/json")
        .body("{not json")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 422);
}

#[tokio::test]
async fn step_failure_is_a_server_error_with_detail() {
    let addr = spawn_server(true).await;
    let resp = reqwest::Client::new()
        .post(format!("http://{addr}/generate_plan"))
        .json(&request())
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), 500);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().starts_with("persona failed"));
}
