//! HTTP surface for the planner.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::pipeline::{PipelineError, Planner};

pub fn router(planner: Arc<Planner>) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/generate_plan", post(generate_plan))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(planner)
}

pub async fn serve(planner: Arc<Planner>, addr: SocketAddr) -> std::io::Result<()> {
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(addr = %listener.local_addr()?, "HTTP server listening");
    axum::serve(listener, router(planner)).await
}

async fn root() -> Json<Value> {
    Json(json!({ "message": "Campaign planner API is running!" }))
}

fn detail(status: StatusCode, message: impl Into<String>) -> Response {
    (status, Json(json!({ "detail": message.into() }))).into_response()
}

async fn generate_plan(
    State(planner): State<Arc<Planner>>,
    body: Result<Json<Value>, JsonRejection>,
) -> Response {
    let Json(raw) = match body {
        Ok(body) => body,
        Err(rejection) => {
            return detail(StatusCode::UNPROCESSABLE_ENTITY, rejection.body_text());
        }
    };

    match planner.plan(&raw).await {
        Ok(plan) => (StatusCode::OK, Json(plan)).into_response(),
        Err(err @ PipelineError::Validation(_)) => {
            tracing::info!(error = %err, "rejected request");
            detail(StatusCode::UNPROCESSABLE_ENTITY, err.to_string())
        }
        Err(err) => {
            tracing::error!(code = err.code(), step = ?err.failed_step(), error = %err, "plan generation failed");
            detail(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}
