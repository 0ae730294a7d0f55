use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tracing::{error, info, warn};

use super::config::SessionSettings;
use crate::audio::chunk::AudioChunk;
use crate::audio::wav::encode_chunk;
use crate::audio::{AudioBackend, AudioFrame, Chunker};
use crate::stt::Transcription;
use crate::transcript::{SegmentDraft, SegmentStore};

/// How long the loop waits for a frame before re-checking its flags.
const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// Background capture loop for one recording session.
///
/// Frames are chunked, each completed chunk is transcribed, and the
/// resulting segments are appended to the store in chunk order. The
/// transcription call runs inline, so appends are ordered by
/// construction. A failed chunk is logged and skipped, never fatal.
///
/// `running` cleared requests a graceful stop: the backend is closed,
/// queued frames are drained, and the partial chunk is flushed and
/// transcribed before the loop returns. `abandoned` set requests a
/// hard stop: the loop exits without flushing, and any in-flight
/// transcription result is discarded instead of appended.
pub struct CaptureLoop {
    store: SegmentStore,
    transcription: Arc<dyn Transcription>,
    chunk_seconds: u64,
    sample_rate: u32,
    channels: u16,
    gain: f32,
    running: Arc<AtomicBool>,
    abandoned: Arc<AtomicBool>,
    chunks_captured: Arc<AtomicUsize>,
    failed_chunks: Arc<AtomicUsize>,
}

impl CaptureLoop {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: SegmentStore,
        transcription: Arc<dyn Transcription>,
        settings: &SessionSettings,
        running: Arc<AtomicBool>,
        abandoned: Arc<AtomicBool>,
        chunks_captured: Arc<AtomicUsize>,
        failed_chunks: Arc<AtomicUsize>,
    ) -> Self {
        Self {
            store,
            transcription,
            chunk_seconds: settings.chunk_seconds,
            sample_rate: settings.sample_rate,
            channels: settings.channels,
            gain: settings.gain,
            running,
            abandoned,
            chunks_captured,
            failed_chunks,
        }
    }

    /// Runs until the session stops or the frame stream ends.
    pub async fn run(
        self,
        mut backend: Box<dyn AudioBackend>,
        mut frames: mpsc::Receiver<AudioFrame>,
        epoch: DateTime<Utc>,
    ) {
        info!("Capture loop started (epoch {})", epoch);
        let mut chunker = Chunker::new(
            epoch,
            self.chunk_seconds,
            self.sample_rate,
            self.channels,
            self.gain,
        );
        let mut stopping = false;

        loop {
            if self.abandoned.load(Ordering::SeqCst) {
                let _ = backend.stop().await;
                info!("Capture loop abandoned");
                return;
            }

            if !stopping && !self.running.load(Ordering::SeqCst) {
                // Stop requested: close the source so the channel
                // drains to completion, then keep receiving
                if let Err(e) = backend.stop().await {
                    warn!("Backend stop failed: {}", e);
                }
                stopping = true;
            }

            match timeout(RECV_TIMEOUT, frames.recv()).await {
                Ok(Some(frame)) => {
                    for chunk in chunker.push(&frame) {
                        if !self.handle_chunk(chunk).await {
                            let _ = backend.stop().await;
                            return;
                        }
                    }
                }
                // Channel closed: every queued frame is consumed
                Ok(None) => break,
                // Idle tick: re-check the flags
                Err(_) => continue,
            }
        }

        if self.abandoned.load(Ordering::SeqCst) {
            info!("Capture loop abandoned");
            return;
        }

        if let Some(chunk) = chunker.flush() {
            self.handle_chunk(chunk).await;
        }
        if !stopping {
            // Stream ended on its own
            let _ = backend.stop().await;
        }

        info!(
            "Capture loop finished: {} chunks, {} failed",
            self.chunks_captured.load(Ordering::SeqCst),
            self.failed_chunks.load(Ordering::SeqCst)
        );
    }

    /// Transcribes one chunk and appends its segments.
    ///
    /// Returns false when the loop must terminate (hard stop observed
    /// mid-flight, or an append was rejected).
    async fn handle_chunk(&self, chunk: AudioChunk) -> bool {
        let index = chunk.index;
        self.chunks_captured.fetch_add(1, Ordering::SeqCst);

        let wav = match encode_chunk(&chunk) {
            Ok(wav) => wav,
            Err(e) => {
                warn!("Chunk {} encoding failed, skipping: {}", index, e);
                self.failed_chunks.fetch_add(1, Ordering::SeqCst);
                return true;
            }
        };

        let utterances = match self.transcription.transcribe(&wav).await {
            Ok(utterances) => utterances,
            Err(e) => {
                warn!("Chunk {} transcription failed, skipping: {}", index, e);
                self.failed_chunks.fetch_add(1, Ordering::SeqCst);
                return true;
            }
        };

        // Hard stop while the call was in flight: discard the result
        if self.abandoned.load(Ordering::SeqCst) {
            return false;
        }

        for utterance in utterances {
            if utterance.text.trim().is_empty() {
                continue;
            }

            let start_time =
                chunk.start_time + chrono::Duration::milliseconds(utterance.start_ms as i64);
            let end_time =
                chunk.start_time + chrono::Duration::milliseconds(utterance.end_ms as i64);
            let mut draft = SegmentDraft::new(start_time, end_time, utterance.text);
            if let Some(confidence) = utterance.confidence {
                draft = draft.with_confidence(confidence);
            }

            if let Err(e) = self.store.append(draft) {
                // Chunk starts are monotonic by construction, so a
                // rejected append is a sequencing bug
                error!("Capture loop terminating: {}", e);
                return false;
            }
        }

        true
    }
}
