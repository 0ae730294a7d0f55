use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::error::{EchonoteError, Result};

/// A transcribed utterance within one audio chunk.
///
/// Offsets are milliseconds relative to the chunk start, so the caller
/// anchors them to wall-clock time.
#[derive(Debug, Clone, PartialEq)]
pub struct Utterance {
    pub start_ms: u64,
    pub end_ms: u64,
    pub text: String,
    pub confidence: Option<f32>,
}

impl Utterance {
    pub fn new(start_ms: u64, end_ms: u64, text: impl Into<String>) -> Self {
        Self {
            start_ms,
            end_ms,
            text: text.into(),
            confidence: None,
        }
    }
}

/// Speech-to-text service boundary.
///
/// One call per audio chunk; a failure affects only that chunk.
#[async_trait::async_trait]
pub trait Transcription: Send + Sync {
    /// Transcribes a complete WAV file, returning utterances in
    /// chunk-relative time order. Silence yields an empty vec.
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<Vec<Utterance>>;

    /// Get implementation name for logging
    fn name(&self) -> &str;
}

enum ScriptedResult {
    Utterances(Vec<Utterance>),
    Failure(String),
}

/// Scripted transcription for tests: replies are consumed in order,
/// and the script running dry reads as silence.
#[derive(Default)]
pub struct MockTranscription {
    script: Mutex<VecDeque<ScriptedResult>>,
    calls: AtomicUsize,
}

impl MockTranscription {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_utterances(self, utterances: Vec<Utterance>) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedResult::Utterances(utterances));
        self
    }

    /// Scripts a single one-second utterance at the chunk start.
    pub fn with_text(self, text: &str) -> Self {
        self.with_utterances(vec![Utterance::new(0, 1_000, text)])
    }

    pub fn with_silence(self) -> Self {
        self.with_utterances(Vec::new())
    }

    pub fn with_failure(self, message: &str) -> Self {
        self.script
            .lock()
            .unwrap()
            .push_back(ScriptedResult::Failure(message.to_string()));
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Transcription for MockTranscription {
    async fn transcribe(&self, _audio_wav: &[u8]) -> Result<Vec<Utterance>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        match self.script.lock().unwrap().pop_front() {
            Some(ScriptedResult::Utterances(utterances)) => Ok(utterances),
            Some(ScriptedResult::Failure(message)) => {
                Err(EchonoteError::Transcription { message })
            }
            None => Ok(Vec::new()),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
