use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A transcribed span of speech with its wall-clock extent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    /// Store-assigned identifier, contiguous from 0 in append order.
    pub id: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub text: String,
    /// Transcriber confidence in 0.0-1.0, when the backend reports one.
    pub confidence: Option<f32>,
}

impl Segment {
    pub fn duration_seconds(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64 / 1000.0
    }
}

/// A segment before the store has assigned it an id.
#[derive(Debug, Clone)]
pub struct SegmentDraft {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub text: String,
    pub confidence: Option<f32>,
}

impl SegmentDraft {
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        text: impl Into<String>,
    ) -> Self {
        Self {
            start_time,
            end_time,
            text: text.into(),
            confidence: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }
}
