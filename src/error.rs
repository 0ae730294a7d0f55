//! Error types for echonote.

use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum EchonoteError {
    // Startup errors
    #[error("Missing credential: set the {var} environment variable")]
    MissingCredential { var: String },

    #[error("Invalid configuration value for {key}: {message}")]
    InvalidConfigValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    // Store invariant violation: capture must produce non-decreasing
    // start times by construction, so this indicates a sequencing bug.
    #[error("Segment ordering violation: start {attempted} precedes last start {last}")]
    OrderingViolation {
        last: DateTime<Utc>,
        attempted: DateTime<Utc>,
    },

    // Session state machine errors (surfaced to the caller, non-fatal)
    #[error("A recording session is already active")]
    AlreadyRecording,

    #[error("No recording session is active")]
    NotRecording,

    // Grouping validation
    #[error("Invalid window width: {minutes} minutes (must be 1-30)")]
    InvalidWindowWidth { minutes: i64 },

    // Per-chunk collaborator failure (recovered by skipping the chunk)
    #[error("Transcription failed: {message}")]
    Transcription { message: String },

    // Per-batch collaborator failure (recovered by keeping original order)
    #[error("Summarization failed: {message}")]
    Summarization { message: String },

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    // Audio capture errors
    #[error("Audio device not found: {device}")]
    AudioDeviceNotFound { device: String },

    #[error("Audio capture failed: {message}")]
    AudioCapture { message: String },

    #[error("WAV encoding failed: {0}")]
    Wav(#[from] hound::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

// Type alias for convenience
pub type Result<T> = std::result::Result<T, EchonoteError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_missing_credential_display() {
        let error = EchonoteError::MissingCredential {
            var: "ECHONOTE_TRANSCRIPTION_KEY".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Missing credential: set the ECHONOTE_TRANSCRIPTION_KEY environment variable"
        );
    }

    #[test]
    fn test_ordering_violation_display_mentions_both_times() {
        let last = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 10).unwrap();
        let attempted = Utc.with_ymd_and_hms(2025, 1, 1, 12, 0, 5).unwrap();
        let error = EchonoteError::OrderingViolation { last, attempted };
        let text = error.to_string();
        assert!(text.contains("12:00:05"));
        assert!(text.contains("12:00:10"));
    }

    #[test]
    fn test_invalid_window_width_display() {
        let error = EchonoteError::InvalidWindowWidth { minutes: 45 };
        assert_eq!(
            error.to_string(),
            "Invalid window width: 45 minutes (must be 1-30)"
        );
    }

    #[test]
    fn test_state_errors_display() {
        assert_eq!(
            EchonoteError::AlreadyRecording.to_string(),
            "A recording session is already active"
        );
        assert_eq!(
            EchonoteError::NotRecording.to_string(),
            "No recording session is active"
        );
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let error: EchonoteError = io_err.into();
        assert!(matches!(error, EchonoteError::Io(_)));
    }
}
