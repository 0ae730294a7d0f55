use crate::config::{Config, MergePolicy};

/// Runtime settings for recording sessions, distilled from the loaded
/// configuration once at startup.
#[derive(Debug, Clone)]
pub struct SessionSettings {
    /// Duration of each capture chunk in seconds
    pub chunk_seconds: u64,
    /// Sample rate for audio processing
    pub sample_rate: u32,
    /// Number of audio channels (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Gain multiplier applied to captured samples
    pub gain: f32,
    /// Grouping window width in minutes when the caller names none
    pub default_window_minutes: i64,
    /// Maximum segments per summarization batch
    pub batch_limit: usize,
    /// How adjacent batch summaries are merged
    pub merge_policy: MergePolicy,
}

impl SessionSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            chunk_seconds: config.session.chunk_seconds,
            sample_rate: config.audio.sample_rate,
            channels: config.audio.channels,
            gain: config.audio.gain,
            default_window_minutes: config.session.window_minutes,
            batch_limit: config.session.batch_limit,
            merge_policy: config.session.merge_policy,
        }
    }
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            chunk_seconds: 10,
            sample_rate: 16_000,
            channels: 1,
            gain: 1.0,
            default_window_minutes: 5,
            batch_limit: 50,
            merge_policy: MergePolicy::Concat,
        }
    }
}
