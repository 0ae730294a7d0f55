use super::state::AppState;
use crate::error::EchonoteError;
use crate::grouping::{WindowDigest, WindowWidth};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::{Deserialize, Serialize};
use tracing::info;

// ============================================================================
// Request/Response Types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct StopSessionRequest {
    /// Abandon in-flight work instead of draining it
    #[serde(default)]
    pub hard: bool,
}

#[derive(Debug, Deserialize)]
pub struct GroupsQuery {
    /// Window width in minutes (1-30); defaults to the configured width
    pub window_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct GroupsResponse {
    pub window_minutes: i64,
    pub windows: Vec<WindowDigest>,
    /// Batches across all windows whose summarization failed
    pub failed_batches: usize,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

fn error_response(error: EchonoteError) -> Response {
    let status = match error {
        EchonoteError::AlreadyRecording | EchonoteError::NotRecording => StatusCode::CONFLICT,
        EchonoteError::InvalidWindowWidth { .. } => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (
        status,
        Json(ErrorResponse {
            error: error.to_string(),
        }),
    )
        .into_response()
}

// ============================================================================
// Handlers
// ============================================================================

/// POST /session/start
/// Start a recording session
pub async fn start_session(State(state): State<AppState>) -> Response {
    match state.controller.start().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /session/stop
/// Stop the active session; `{"hard": true}` abandons in-flight work
pub async fn stop_session(
    State(state): State<AppState>,
    body: Option<Json<StopSessionRequest>>,
) -> Response {
    let hard = body.map(|Json(req)| req.hard).unwrap_or(false);

    match state.controller.stop(hard).await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(e),
    }
}

/// POST /session/reset
/// Clear the stored session and return to idle
pub async fn reset_session(State(state): State<AppState>) -> Response {
    match state.controller.reset().await {
        Ok(status) => (StatusCode::OK, Json(status)).into_response(),
        Err(e) => error_response(e),
    }
}

/// GET /session/status
/// Current session state and counters
pub async fn get_status(State(state): State<AppState>) -> Response {
    let status = state.controller.status().await;
    (StatusCode::OK, Json(status)).into_response()
}

/// GET /session/transcript
/// Transcript accumulated so far, oldest first
pub async fn get_transcript(State(state): State<AppState>) -> Response {
    let transcript = state.controller.transcript();
    (StatusCode::OK, Json(transcript)).into_response()
}

/// GET /session/groups?window_minutes=N
/// Group the transcript into windows and summarize each
pub async fn get_groups(
    State(state): State<AppState>,
    Query(query): Query<GroupsQuery>,
) -> Response {
    let minutes = query
        .window_minutes
        .unwrap_or_else(|| state.controller.default_window_minutes());

    let width = match WindowWidth::from_minutes(minutes) {
        Ok(width) => width,
        Err(e) => return error_response(e),
    };

    info!("Grouping transcript into {}-minute windows", minutes);
    let windows: Vec<WindowDigest> = state.controller.groups(width).await;
    let failed_batches = windows.iter().map(|w| w.failed_batches).sum();

    (
        StatusCode::OK,
        Json(GroupsResponse {
            window_minutes: minutes,
            windows,
            failed_batches,
        }),
    )
        .into_response()
}

/// GET /health
/// Health check endpoint
pub async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}
