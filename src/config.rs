use serde::Deserialize;

use crate::error::{EchonoteError, Result};

/// Environment variable holding the transcription API key.
pub const TRANSCRIPTION_KEY_VAR: &str = "ECHONOTE_TRANSCRIPTION_KEY";
/// Environment variable holding the summarization API key.
pub const SUMMARIZER_KEY_VAR: &str = "ECHONOTE_SUMMARIZER_KEY";

#[derive(Debug, Clone, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub service: ServiceConfig,
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub transcription: TranscriptionConfig,
    #[serde(default)]
    pub summarization: SummarizationConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,
    #[serde(default)]
    pub http: HttpConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_bind")]
    pub bind: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    /// Input device name, or "default" for the system default.
    #[serde(default = "default_device")]
    pub device: String,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_channels")]
    pub channels: u16,
    /// Gain multiplier applied to captured samples, clamped to 0.0-10.0.
    #[serde(default = "default_gain")]
    pub gain: f32,
    /// WAV file to capture from instead of the microphone.
    #[serde(default)]
    pub input_file: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionConfig {
    /// Duration of each capture chunk in seconds.
    #[serde(default = "default_chunk_seconds")]
    pub chunk_seconds: u64,
    /// Default grouping window width in minutes (1-30).
    #[serde(default = "default_window_minutes")]
    pub window_minutes: i64,
    /// Maximum segments per summarization batch.
    #[serde(default = "default_batch_limit")]
    pub batch_limit: usize,
    /// How adjacent windows are merged: "concat" or "second-pass".
    #[serde(default = "default_merge_policy")]
    pub merge_policy: MergePolicy,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MergePolicy {
    Concat,
    SecondPass,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionConfig {
    #[serde(default = "default_transcription_url")]
    pub base_url: String,
    #[serde(default = "default_transcription_model")]
    pub model: String,
    /// Seconds between transcript status polls.
    #[serde(default = "default_poll_seconds")]
    pub poll_seconds: u64,
    /// Polls before a pending transcript is abandoned.
    #[serde(default = "default_poll_attempts")]
    pub poll_attempts: u32,
    /// Overall per-request timeout in seconds.
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SummarizationConfig {
    #[serde(default = "default_summarization_url")]
    pub base_url: String,
    #[serde(default = "default_summarization_model")]
    pub model: String,
    #[serde(default = "default_request_timeout")]
    pub timeout_seconds: u64,
}

fn default_service_name() -> String {
    "echonote".to_string()
}

fn default_bind() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3042
}

fn default_device() -> String {
    "default".to_string()
}

fn default_sample_rate() -> u32 {
    16_000
}

fn default_channels() -> u16 {
    1
}

fn default_gain() -> f32 {
    1.0
}

fn default_chunk_seconds() -> u64 {
    10
}

fn default_window_minutes() -> i64 {
    5
}

fn default_batch_limit() -> usize {
    50
}

fn default_merge_policy() -> MergePolicy {
    MergePolicy::Concat
}

fn default_transcription_url() -> String {
    "https://api.assemblyai.com".to_string()
}

fn default_transcription_model() -> String {
    "nano".to_string()
}

fn default_poll_seconds() -> u64 {
    2
}

fn default_poll_attempts() -> u32 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

fn default_summarization_url() -> String {
    "https://api.openai.com".to_string()
}

fn default_summarization_model() -> String {
    "gpt-4o-mini".to_string()
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            http: HttpConfig::default(),
        }
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            port: default_port(),
        }
    }
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            device: default_device(),
            sample_rate: default_sample_rate(),
            channels: default_channels(),
            gain: default_gain(),
            input_file: None,
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            chunk_seconds: default_chunk_seconds(),
            window_minutes: default_window_minutes(),
            batch_limit: default_batch_limit(),
            merge_policy: default_merge_policy(),
        }
    }
}

impl Default for TranscriptionConfig {
    fn default() -> Self {
        Self {
            base_url: default_transcription_url(),
            model: default_transcription_model(),
            poll_seconds: default_poll_seconds(),
            poll_attempts: default_poll_attempts(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

impl Default for SummarizationConfig {
    fn default() -> Self {
        Self {
            base_url: default_summarization_url(),
            model: default_summarization_model(),
            timeout_seconds: default_request_timeout(),
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.audio.sample_rate == 0 {
            return Err(EchonoteError::InvalidConfigValue {
                key: "audio.sample_rate".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if self.audio.channels == 0 || self.audio.channels > 2 {
            return Err(EchonoteError::InvalidConfigValue {
                key: "audio.channels".to_string(),
                message: format!("{} (must be 1 or 2)", self.audio.channels),
            });
        }
        if self.session.chunk_seconds == 0 {
            return Err(EchonoteError::InvalidConfigValue {
                key: "session.chunk_seconds".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        if !(1..=30).contains(&self.session.window_minutes) {
            return Err(EchonoteError::InvalidConfigValue {
                key: "session.window_minutes".to_string(),
                message: format!("{} (must be 1-30)", self.session.window_minutes),
            });
        }
        if self.session.batch_limit == 0 {
            return Err(EchonoteError::InvalidConfigValue {
                key: "session.batch_limit".to_string(),
                message: "must be non-zero".to_string(),
            });
        }
        Ok(())
    }
}

/// API keys read from the environment at startup.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub transcription_key: String,
    pub summarizer_key: String,
}

impl Credentials {
    pub fn from_env() -> Result<Self> {
        let transcription_key = require_env(TRANSCRIPTION_KEY_VAR)?;
        let summarizer_key = require_env(SUMMARIZER_KEY_VAR)?;
        Ok(Self {
            transcription_key,
            summarizer_key,
        })
    }
}

fn require_env(var: &str) -> Result<String> {
    match std::env::var(var) {
        Ok(value) if !value.trim().is_empty() => Ok(value),
        _ => Err(EchonoteError::MissingCredential {
            var: var.to_string(),
        }),
    }
}
