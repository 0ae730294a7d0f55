use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of the recording session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Recording,
    Stopped,
}

/// Point-in-time view of the session for the status endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    /// Current lifecycle state
    pub state: SessionState,

    /// Identifier of the active or most recent session
    pub session_id: Option<String>,

    /// When the session started
    pub started_at: Option<DateTime<Utc>>,

    /// When the session stopped, once it has
    pub stopped_at: Option<DateTime<Utc>>,

    /// Seconds recorded so far (or total, once stopped)
    pub duration_secs: f64,

    /// Number of audio chunks captured so far
    pub chunks_captured: usize,

    /// Number of chunks whose transcription failed
    pub failed_chunks: usize,

    /// Number of transcript segments stored
    pub segment_count: usize,
}
