//! REST API handlers
//!
//! Route map:
//!
//! - `GET  /api/health` - liveness, ungated
//! - `POST /api/post/run` - trigger one run (rotation, random, or by id)
//! - `GET  /api/post/logs` - posting log, most recent first
//! - `GET  /api/post/status` - rotation progress snapshot
//! - `POST /api/chat/completions` - chat proxy passthrough
//!
//! Gated routes require the configured secret in the `X-Api-Secret` header.
//! Callers always get a structured JSON body; failures inside a run come
//! back as `success: false` with the per-item errors, never a bare 500 page.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use crate::chat::ChatRequest;
use crate::posting::{PostLogEntry, RunReport};

use super::AppState;

/// Header carrying the shared secret
pub const SECRET_HEADER: &str = "x-api-secret";

// ============================================================================
// API Response Types
// ============================================================================

/// Simple error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error: message.into(),
        }
    }
}

/// Health check response
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Manual trigger request body (all fields optional)
#[derive(Debug, Default, Deserialize)]
pub struct TriggerRequest {
    /// Topics to post via rotation (default 1)
    #[serde(default)]
    pub count: Option<usize>,

    /// Post this specific topic instead of rotating
    #[serde(default)]
    pub topic_id: Option<String>,

    /// Pick uniformly at random among unposted topics
    #[serde(default)]
    pub random: bool,
}

/// Manual trigger response
#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub success: bool,
    pub posted: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<RunReport> for TriggerResponse {
    fn from(report: RunReport) -> Self {
        Self {
            success: report.success(),
            error: if report.errors.is_empty() {
                None
            } else {
                Some(report.errors.join("; "))
            },
            posted: report.posted,
        }
    }
}

/// Logs query parameters
#[derive(Debug, Deserialize)]
pub struct LogsQuery {
    #[serde(default)]
    pub limit: Option<usize>,
}

/// Logs response
#[derive(Debug, Serialize)]
pub struct LogsResponse {
    pub logs: Vec<PostLogEntry>,
    pub count: usize,
}

// ============================================================================
// API Routes
// ============================================================================

/// Create the API router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health_check))
        .route("/api/post/run", post(run_post))
        .route("/api/post/logs", get(get_logs))
        .route("/api/post/status", get(get_status))
        .route("/api/chat/completions", post(chat_completions))
        .with_state(state)
}

// ============================================================================
// Auth
// ============================================================================

/// Check the shared-secret header against the configured secret
///
/// With no secret configured the gate is open (local development); the
/// server logs a warning about that at startup.
fn require_secret(state: &AppState, headers: &HeaderMap) -> Result<(), Response> {
    let Some(expected) = state.config.api_secret.as_deref() else {
        return Ok(());
    };

    let provided = headers
        .get(SECRET_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    if provided == expected {
        Ok(())
    } else {
        Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new("Missing or invalid API secret")),
        )
            .into_response())
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// Health check endpoint
async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    let uptime = state.start_time.elapsed().as_secs();

    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_secs: uptime,
    })
}

/// Trigger one posting run
///
/// The body is optional; an empty POST runs one rotation topic.
async fn run_post(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> Response {
    if let Err(response) = require_secret(&state, &headers) {
        return response;
    }

    let request: TriggerRequest = if body.is_empty() {
        TriggerRequest::default()
    } else {
        match serde_json::from_slice(&body) {
            Ok(request) => request,
            Err(e) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(ErrorResponse::new(format!("Invalid request body: {e}"))),
                )
                    .into_response();
            }
        }
    };

    tracing::info!(
        count = ?request.count,
        topic_id = ?request.topic_id,
        random = request.random,
        "Manual posting run triggered"
    );

    let report = if let Some(id) = request.topic_id {
        state.poster.run_topic(&id).await
    } else if request.random {
        state.poster.run_random().await
    } else {
        state.poster.run(request.count.unwrap_or(1)).await
    };

    Json(TriggerResponse::from(report)).into_response()
}

/// Retrieve recent posting log entries
async fn get_logs(
    State(state): State<AppState>,
    headers: HeaderMap,
    Query(query): Query<LogsQuery>,
) -> Response {
    if let Err(response) = require_secret(&state, &headers) {
        return response;
    }

    let limit = query.limit.unwrap_or(20).min(500);

    match state.log.recent(limit).await {
        Ok(logs) => Json(LogsResponse {
            count: logs.len(),
            logs,
        })
        .into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Failed to read posting log");
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse::new("Failed to read posting log")),
            )
                .into_response()
        }
    }
}

/// Rotation progress snapshot
async fn get_status(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Err(response) = require_secret(&state, &headers) {
        return response;
    }

    Json(state.poster.status().await).into_response()
}

/// Forward a chat-completion request upstream
async fn chat_completions(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(response) = require_secret(&state, &headers) {
        return response;
    }

    let request: ChatRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(ErrorResponse::new(format!("Invalid chat request: {e}"))),
            )
                .into_response();
        }
    };

    match state.chat.complete(request).await {
        Ok(response) => Json(response).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "Chat proxy request failed");
            (
                StatusCode::BAD_GATEWAY,
                Json(ErrorResponse::new(format!("Chat upstream failed: {e}"))),
            )
                .into_response()
        }
    }
}
