use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;

use crate::error::{EchonoteError, Result};

/// Audio sample data (16-bit PCM, interleaved)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM, interleaved)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
}

/// Configuration for audio backends
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Input device name, or "default" for the system default
    pub device: String,
    /// Target sample rate
    pub sample_rate: u32,
    /// Target channel count (1 = mono, 2 = stereo)
    pub channels: u16,
    /// Buffer size in milliseconds (affects latency)
    pub buffer_duration_ms: u64,
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            device: "default".to_string(),
            sample_rate: 16_000,
            channels: 1,
            buffer_duration_ms: 100,
        }
    }
}

/// Audio source type
#[derive(Debug, Clone)]
pub enum AudioSource {
    /// Microphone input
    Microphone,
    /// WAV file input (for testing/batch processing)
    File(String),
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input stream (behind the `microphone` feature)
/// - File: streams a WAV file as if it were live input
/// - Mock: scripted frames for tests
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames until
    /// the backend stops or the underlying stream ends.
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Creates a fresh backend for each recording session.
pub trait AudioBackendFactory: Send + Sync {
    fn create(&self) -> Result<Box<dyn AudioBackend>>;
}

/// Factory that selects a backend from the configured audio source.
pub struct DefaultBackendFactory {
    source: AudioSource,
    config: AudioBackendConfig,
}

impl DefaultBackendFactory {
    pub fn new(source: AudioSource, config: AudioBackendConfig) -> Self {
        Self { source, config }
    }
}

impl AudioBackendFactory for DefaultBackendFactory {
    fn create(&self) -> Result<Box<dyn AudioBackend>> {
        match &self.source {
            AudioSource::Microphone => {
                #[cfg(feature = "microphone")]
                {
                    Ok(Box::new(super::microphone::MicrophoneBackend::new(
                        self.config.clone(),
                    )))
                }

                #[cfg(not(feature = "microphone"))]
                {
                    Err(EchonoteError::AudioCapture {
                        message: "built without microphone support".to_string(),
                    })
                }
            }

            AudioSource::File(path) => Ok(Box::new(super::file::FileBackend::new(
                path.clone(),
                self.config.clone(),
            ))),
        }
    }
}

/// Scripted backend for tests.
///
/// Emits its frames immediately on start, then either closes the
/// stream (the default, simulating an input that ran dry) or holds it
/// open until stopped.
pub struct MockAudioBackend {
    frames: Vec<AudioFrame>,
    hold_open: bool,
    capturing: Arc<AtomicBool>,
    hold_tx: Arc<Mutex<Option<mpsc::Sender<AudioFrame>>>>,
}

impl Default for MockAudioBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockAudioBackend {
    pub fn new() -> Self {
        Self {
            frames: Vec::new(),
            hold_open: false,
            capturing: Arc::new(AtomicBool::new(false)),
            hold_tx: Arc::new(Mutex::new(None)),
        }
    }

    pub fn with_frames(mut self, frames: Vec<AudioFrame>) -> Self {
        self.frames.extend(frames);
        self
    }

    /// Appends 100ms frames of silence covering `seconds` of audio.
    pub fn with_silence(mut self, seconds: u64, sample_rate: u32, channels: u16) -> Self {
        let samples_per_frame = (sample_rate as usize / 10) * channels as usize;
        for _ in 0..seconds * 10 {
            self.frames.push(AudioFrame {
                samples: vec![0i16; samples_per_frame],
                sample_rate,
                channels,
            });
        }
        self
    }

    /// Keeps the frame channel open after all frames are sent, so the
    /// consumer waits instead of draining to completion.
    pub fn hold_open(mut self) -> Self {
        self.hold_open = true;
        self
    }
}

#[async_trait::async_trait]
impl AudioBackend for MockAudioBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        // Capacity covers every scripted frame, so sends cannot block
        let (tx, rx) = mpsc::channel(self.frames.len().max(1) + 1);
        for frame in &self.frames {
            tx.send(frame.clone())
                .await
                .map_err(|_| EchonoteError::AudioCapture {
                    message: "mock frame channel closed".to_string(),
                })?;
        }
        if self.hold_open {
            *self.hold_tx.lock().unwrap() = Some(tx);
        }
        self.capturing.store(true, Ordering::SeqCst);
        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.hold_tx.lock().unwrap().take();
        self.capturing.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// Factory that hands out pre-built mock backends in order.
#[derive(Default)]
pub struct MockBackendFactory {
    backends: Mutex<VecDeque<MockAudioBackend>>,
}

impl MockBackendFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_backend(self, backend: MockAudioBackend) -> Self {
        self.backends.lock().unwrap().push_back(backend);
        self
    }
}

impl AudioBackendFactory for MockBackendFactory {
    fn create(&self) -> Result<Box<dyn AudioBackend>> {
        self.backends
            .lock()
            .unwrap()
            .pop_front()
            .map(|backend| Box::new(backend) as Box<dyn AudioBackend>)
            .ok_or_else(|| EchonoteError::AudioCapture {
                message: "no scripted backend available".to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 16_000,
            channels: 1,
        }
    }

    #[tokio::test]
    async fn test_mock_backend_emits_frames_then_closes() {
        let mut backend = MockAudioBackend::new()
            .with_frames(vec![frame(vec![1, 2]), frame(vec![3, 4])]);

        let mut rx = backend.start().await.unwrap();
        assert_eq!(rx.recv().await.unwrap().samples, vec![1, 2]);
        assert_eq!(rx.recv().await.unwrap().samples, vec![3, 4]);
        // Channel closes once all scripted frames are delivered
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_backend_hold_open_waits_for_stop() {
        let mut backend = MockAudioBackend::new()
            .with_frames(vec![frame(vec![7])])
            .hold_open();

        let mut rx = backend.start().await.unwrap();
        assert!(rx.recv().await.is_some());
        assert!(matches!(
            rx.try_recv(),
            Err(mpsc::error::TryRecvError::Empty)
        ));

        backend.stop().await.unwrap();
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_mock_factory_hands_out_backends_in_order() {
        let factory = MockBackendFactory::new()
            .with_backend(MockAudioBackend::new().with_frames(vec![frame(vec![1])]))
            .with_backend(MockAudioBackend::new());

        let mut first = factory.create().unwrap();
        let mut rx = first.start().await.unwrap();
        assert_eq!(rx.recv().await.unwrap().samples, vec![1]);

        factory.create().unwrap();
        assert!(factory.create().is_err());
    }

    #[test]
    fn test_silence_builder_covers_requested_duration() {
        let backend = MockAudioBackend::new().with_silence(2, 16_000, 1);
        let total: usize = backend.frames.iter().map(|f| f.samples.len()).sum();
        assert_eq!(total, 32_000);
    }
}
