//! HTTP API exposed to the frontend
//!
//! Thin axum layer over the orchestrator. A failed turn still answers
//! 200 with the apology reply; only the structured estimate endpoint
//! surfaces errors as HTTP statuses.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use quotemaster_core::QuoteEstimate;
use quotemaster_engine::{ChatOrchestrator, EngineError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<ChatOrchestrator>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/chat", post(chat))
        .route("/api/chat/estimates/recent", get(recent_estimates))
        .route("/api/chat/estimate/uiux", post(uiux_estimate))
        .with_state(state)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Deserialize)]
struct ChatRequest {
    content: String,
    #[serde(default)]
    chat_id: Option<String>,
}

#[derive(Debug, Serialize)]
struct ChatResponse {
    content: String,
    session_uuid: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    quote: Option<QuoteEstimate>,
}

async fn chat(
    State(state): State<AppState>,
    Json(payload): Json<ChatRequest>,
) -> Json<ChatResponse> {
    let outcome = state
        .orchestrator
        .chat(payload.chat_id, &payload.content)
        .await;

    Json(ChatResponse {
        content: outcome.content,
        session_uuid: outcome.session_id,
        quote: outcome.quote,
    })
}

#[derive(Debug, Deserialize)]
struct RecentParams {
    #[serde(default)]
    limit: Option<usize>,
}

#[derive(Debug, Serialize)]
struct RecentResponse {
    estimates: Vec<QuoteEstimate>,
}

async fn recent_estimates(
    State(state): State<AppState>,
    Query(params): Query<RecentParams>,
) -> Json<RecentResponse> {
    let estimates = state.orchestrator.recent_estimates(params.limit.unwrap_or(5));
    Json(RecentResponse { estimates })
}

#[derive(Debug, Deserialize)]
struct UiuxRequest {
    #[serde(default)]
    client_name: Option<String>,
    #[serde(default)]
    project_name: Option<String>,
}

async fn uiux_estimate(
    State(state): State<AppState>,
    Json(payload): Json<UiuxRequest>,
) -> Result<Json<QuoteEstimate>, ApiError> {
    let quote = state
        .orchestrator
        .uiux_estimate(payload.client_name, payload.project_name)
        .await?;
    Ok(Json(quote))
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    error_code: String,
    message: String,
}

#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    error_code: String,
    message: String,
}

impl From<EngineError> for ApiError {
    fn from(err: EngineError) -> Self {
        let (status, error_code) = match &err {
            EngineError::PromptTooLarge { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "prompt_too_large")
            }
            EngineError::LlmTimeout(_) => (StatusCode::GATEWAY_TIMEOUT, "llm_timeout"),
            EngineError::LlmUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "llm_unavailable"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error"),
        };
        Self {
            status,
            error_code: error_code.to_string(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error_code: self.error_code,
            message: self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
