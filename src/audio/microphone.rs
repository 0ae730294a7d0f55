//! Microphone capture via cpal.
//!
//! cpal streams are not Send, so a dedicated thread owns the stream
//! and forwards callback buffers into a tokio channel. The audio
//! callback never blocks: frames are dropped if the consumer falls
//! behind.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::error::{EchonoteError, Result};

pub struct MicrophoneBackend {
    config: AudioBackendConfig,
    capturing: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl MicrophoneBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            capturing: Arc::new(AtomicBool::new(false)),
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        let (frame_tx, frame_rx) = mpsc::channel(32);
        let (ready_tx, ready_rx) = oneshot::channel();

        let config = self.config.clone();
        let running = self.capturing.clone();
        running.store(true, Ordering::SeqCst);

        let thread = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || run_capture(config, frame_tx, running, ready_tx))
            .map_err(|e| EchonoteError::AudioCapture {
                message: format!("failed to spawn capture thread: {}", e),
            })?;
        self.thread = Some(thread);

        // Wait for the thread to report whether the stream opened
        match ready_rx.await {
            Ok(Ok(())) => Ok(frame_rx),
            Ok(Err(e)) => {
                self.capturing.store(false, Ordering::SeqCst);
                Err(e)
            }
            Err(_) => {
                self.capturing.store(false, Ordering::SeqCst);
                Err(EchonoteError::AudioCapture {
                    message: "capture thread exited before reporting readiness".to_string(),
                })
            }
        }
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing.store(false, Ordering::SeqCst);
        if let Some(thread) = self.thread.take() {
            let _ = tokio::task::spawn_blocking(move || thread.join()).await;
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

fn run_capture(
    config: AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    running: Arc<AtomicBool>,
    ready_tx: oneshot::Sender<Result<()>>,
) {
    let stream = match open_stream(&config, frame_tx) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready_tx.send(Err(EchonoteError::AudioCapture {
            message: format!("failed to start stream: {}", e),
        }));
        return;
    }

    let _ = ready_tx.send(Ok(()));

    // The stream captures for as long as it stays alive on this thread
    while running.load(Ordering::SeqCst) {
        thread::sleep(Duration::from_millis(50));
    }
    drop(stream);
    info!("Microphone capture stopped");
}

fn open_stream(
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();

    let device = if config.device == "default" {
        host.default_input_device()
    } else {
        host.input_devices()
            .map_err(|e| EchonoteError::AudioCapture {
                message: format!("failed to enumerate input devices: {}", e),
            })?
            .find(|d| d.name().map(|n| n == config.device).unwrap_or(false))
    }
    .ok_or_else(|| EchonoteError::AudioDeviceNotFound {
        device: config.device.clone(),
    })?;

    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());
    let supported = device
        .default_input_config()
        .map_err(|e| EchonoteError::AudioCapture {
            message: format!("no default input config for {}: {}", device_name, e),
        })?;

    let requested = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    // Prefer the configured format; fall back to the device default if
    // the hardware rejects it.
    match build_stream(&device, &requested, supported.sample_format(), frame_tx.clone()) {
        Ok(stream) => {
            info!(
                "Capturing from {} at {}Hz/{}ch",
                device_name, config.sample_rate, config.channels
            );
            Ok(stream)
        }
        Err(first_err) => {
            let native = supported.config();
            warn!(
                "Device {} rejected {}Hz/{}ch ({}), using native {}Hz/{}ch",
                device_name,
                config.sample_rate,
                config.channels,
                first_err,
                native.sample_rate.0,
                native.channels
            );
            build_stream(&device, &native, supported.sample_format(), frame_tx)
        }
    }
}

fn build_stream(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    format: cpal::SampleFormat,
    tx: mpsc::Sender<AudioFrame>,
) -> Result<cpal::Stream> {
    let sample_rate = config.sample_rate.0;
    let channels = config.channels;

    let stream = match format {
        cpal::SampleFormat::I16 => device.build_input_stream(
            config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| {
                let frame = AudioFrame {
                    samples: data.to_vec(),
                    sample_rate,
                    channels,
                };
                // Dropping beats blocking the audio thread
                let _ = tx.try_send(frame);
            },
            log_stream_error,
            None,
        ),
        cpal::SampleFormat::F32 => device.build_input_stream(
            config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples = data
                    .iter()
                    .map(|&s| {
                        (s * i16::MAX as f32).clamp(i16::MIN as f32, i16::MAX as f32) as i16
                    })
                    .collect();
                let frame = AudioFrame {
                    samples,
                    sample_rate,
                    channels,
                };
                let _ = tx.try_send(frame);
            },
            log_stream_error,
            None,
        ),
        other => {
            return Err(EchonoteError::AudioCapture {
                message: format!("unsupported sample format: {}", other),
            })
        }
    };

    stream.map_err(|e| EchonoteError::AudioCapture {
        message: format!("failed to build input stream: {}", e),
    })
}

fn log_stream_error(e: cpal::StreamError) {
    error!("Audio stream error: {}", e);
}

/// Names of all available input devices, for the `devices` command.
pub fn list_input_devices() -> Result<Vec<String>> {
    let host = cpal::default_host();
    let devices = host
        .input_devices()
        .map_err(|e| EchonoteError::AudioCapture {
            message: format!("failed to enumerate input devices: {}", e),
        })?;
    Ok(devices.filter_map(|d| d.name().ok()).collect())
}
