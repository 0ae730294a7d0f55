use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use hound::WavReader;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::error::{EchonoteError, Result};

/// A WAV file loaded fully into memory.
pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path).map_err(|e| EchonoteError::AudioCapture {
            message: format!("failed to open {}: {}", path.display(), e),
        })?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let duration_seconds =
            samples.len() as f64 / (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }
}

/// Backend that streams a WAV file as capture input.
///
/// Frames are delivered as fast as the consumer accepts them, so a
/// file session runs at batch speed rather than real time.
pub struct FileBackend {
    path: String,
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn new(path: String, config: AudioBackendConfig) -> Self {
        Self {
            path,
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            task: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let file = AudioFile::open(&self.path)?;

        if file.sample_rate != self.config.sample_rate || file.channels != self.config.channels {
            warn!(
                "File format {}Hz/{}ch differs from configured {}Hz/{}ch",
                file.sample_rate, file.channels, self.config.sample_rate, self.config.channels
            );
        }

        let samples_per_frame = ((file.sample_rate as u64 * self.config.buffer_duration_ms / 1000)
            as usize
            * file.channels as usize)
            .max(1);

        let (tx, rx) = mpsc::channel(16);
        let running = self.capturing.clone();
        running.store(true, Ordering::SeqCst);

        let sample_rate = file.sample_rate;
        let channels = file.channels;
        let samples = file.samples;

        let task = tokio::spawn(async move {
            let mut offset = 0;
            while offset < samples.len() && running.load(Ordering::SeqCst) {
                let end = (offset + samples_per_frame).min(samples.len());
                let frame = AudioFrame {
                    samples: samples[offset..end].to_vec(),
                    sample_rate,
                    channels,
                };
                if tx.send(frame).await.is_err() {
                    break;
                }
                offset = end;
            }
            running.store(false, Ordering::SeqCst);
        });
        self.task = Some(task);

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(task) = self.task.take() {
            task.abort();
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "file"
    }
}
