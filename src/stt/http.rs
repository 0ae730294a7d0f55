//! HTTP transcription client (upload, submit, poll).

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::transcription::{Transcription, Utterance};
use crate::config::TranscriptionConfig;
use crate::error::{EchonoteError, Result};

/// Silence gap that closes an utterance, in milliseconds.
const UTTERANCE_GAP_MS: u64 = 1500;

#[derive(Debug, Deserialize)]
struct UploadResponse {
    upload_url: String,
}

#[derive(Debug, Serialize)]
struct TranscriptRequest {
    audio_url: String,
    speech_model: String,
    punctuate: bool,
    format_text: bool,
}

#[derive(Debug, Deserialize)]
struct TranscriptResponse {
    id: String,
    status: String,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    words: Option<Vec<TranscriptWord>>,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TranscriptWord {
    text: String,
    /// Start offset in milliseconds
    start: u64,
    /// End offset in milliseconds
    end: u64,
    confidence: f32,
}

/// Transcription backed by an upload-and-poll HTTP service.
pub struct HttpTranscription {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    poll_interval: Duration,
    poll_attempts: u32,
}

impl HttpTranscription {
    pub fn new(config: &TranscriptionConfig, api_key: String) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key,
            model: config.model.clone(),
            poll_interval: Duration::from_secs(config.poll_seconds),
            poll_attempts: config.poll_attempts,
        })
    }

    async fn upload(&self, audio_wav: &[u8]) -> Result<String> {
        debug!("Uploading chunk ({} bytes)", audio_wav.len());
        let response: UploadResponse = self
            .client
            .post(format!("{}/v2/upload", self.base_url))
            .header("authorization", &self.api_key)
            .body(audio_wav.to_vec())
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.upload_url)
    }

    async fn submit(&self, audio_url: String) -> Result<String> {
        let response: TranscriptResponse = self
            .client
            .post(format!("{}/v2/transcript", self.base_url))
            .header("authorization", &self.api_key)
            .json(&TranscriptRequest {
                audio_url,
                speech_model: self.model.clone(),
                punctuate: true,
                format_text: true,
            })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.id)
    }

    async fn poll(&self, transcript_id: &str) -> Result<TranscriptResponse> {
        let mut attempts = 0;
        loop {
            let response: TranscriptResponse = self
                .client
                .get(format!("{}/v2/transcript/{}", self.base_url, transcript_id))
                .header("authorization", &self.api_key)
                .send()
                .await?
                .error_for_status()?
                .json()
                .await?;

            match response.status.as_str() {
                "completed" => return Ok(response),
                "error" => {
                    return Err(EchonoteError::Transcription {
                        message: response
                            .error
                            .unwrap_or_else(|| "unspecified transcription error".to_string()),
                    })
                }
                status => {
                    attempts += 1;
                    if attempts >= self.poll_attempts {
                        return Err(EchonoteError::Transcription {
                            message: format!(
                                "transcript {} still {} after {} polls",
                                transcript_id, status, attempts
                            ),
                        });
                    }
                    debug!(
                        "Transcript {} is {}, poll {}/{}",
                        transcript_id, status, attempts, self.poll_attempts
                    );
                    tokio::time::sleep(self.poll_interval).await;
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl Transcription for HttpTranscription {
    async fn transcribe(&self, audio_wav: &[u8]) -> Result<Vec<Utterance>> {
        let audio_url = self.upload(audio_wav).await?;
        let transcript_id = self.submit(audio_url).await?;
        let response = self.poll(&transcript_id).await?;
        Ok(utterances_from(response))
    }

    fn name(&self) -> &str {
        "http"
    }
}

fn utterances_from(response: TranscriptResponse) -> Vec<Utterance> {
    if let Some(words) = &response.words {
        if !words.is_empty() {
            return split_words(words);
        }
    }

    // Word timings missing: fall back to the full text as one
    // utterance anchored at the chunk start.
    match response.text {
        Some(text) if !text.trim().is_empty() => {
            vec![Utterance::new(0, 0, text.trim())]
        }
        _ => Vec::new(),
    }
}

/// Groups consecutive words into utterances, splitting where the
/// silence between one word's end and the next word's start exceeds
/// [`UTTERANCE_GAP_MS`].
fn split_words(words: &[TranscriptWord]) -> Vec<Utterance> {
    let mut utterances = Vec::new();
    let mut current: Vec<&TranscriptWord> = Vec::new();

    for word in words {
        if let Some(prev) = current.last() {
            if word.start.saturating_sub(prev.end) > UTTERANCE_GAP_MS {
                if let Some(utterance) = build_utterance(&current) {
                    utterances.push(utterance);
                }
                current.clear();
            }
        }
        current.push(word);
    }

    if let Some(utterance) = build_utterance(&current) {
        utterances.push(utterance);
    }
    utterances
}

fn build_utterance(words: &[&TranscriptWord]) -> Option<Utterance> {
    let first = words.first()?;
    let last = words.last()?;

    let text = words
        .iter()
        .map(|w| w.text.as_str())
        .collect::<Vec<_>>()
        .join(" ");
    let text = text.trim().to_string();
    if text.is_empty() {
        return None;
    }

    let confidence = words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;

    Some(Utterance {
        start_ms: first.start,
        end_ms: last.end,
        text,
        confidence: Some(confidence),
    })
}
