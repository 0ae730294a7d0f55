//! HTTP API server for external control
//!
//! This module provides a REST API for driving the recording session:
//! - POST /session/start - Start recording
//! - POST /session/stop - Stop recording (optionally hard)
//! - POST /session/reset - Clear the session and return to idle
//! - GET /session/status - Query session status
//! - GET /session/transcript - Get accumulated transcript
//! - GET /session/groups - Group and summarize the transcript
//! - GET /health - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
