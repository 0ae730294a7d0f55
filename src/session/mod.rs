//! Recording session management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - The session state machine (idle / recording / stopped)
//! - The background capture loop (chunking + transcription)
//! - Transcript snapshots for readers
//! - On-demand grouping and summarization of the transcript

mod capture;
mod config;
mod controller;
mod stats;

pub use capture::CaptureLoop;
pub use config::SessionSettings;
pub use controller::SessionController;
pub use stats::{SessionState, SessionStatus};
