use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{error, info};
use uuid::Uuid;

use super::capture::CaptureLoop;
use super::config::SessionSettings;
use super::stats::{SessionState, SessionStatus};
use crate::audio::AudioBackendFactory;
use crate::clock::Clock;
use crate::error::{EchonoteError, Result};
use crate::grouping::{partition, BatchReorderer, WindowDigest, WindowWidth};
use crate::stt::Transcription;
use crate::summarize::Summarizer;
use crate::transcript::{Segment, SegmentStore};

/// Mutable lifecycle state, guarded as one unit so transitions are
/// atomic under concurrent control requests.
///
/// The signal flags and counters are per-session: `start()` replaces
/// them, so a task detached by a hard stop keeps observing its own
/// session's `abandoned` flag forever and can never append into a
/// later session.
struct Lifecycle {
    state: SessionState,
    session_id: Option<String>,
    started_at: Option<DateTime<Utc>>,
    stopped_at: Option<DateTime<Utc>>,
    capture_task: Option<JoinHandle<()>>,
    running: Arc<AtomicBool>,
    abandoned: Arc<AtomicBool>,
    chunks_captured: Arc<AtomicUsize>,
    failed_chunks: Arc<AtomicUsize>,
}

impl Lifecycle {
    fn new() -> Self {
        Self {
            state: SessionState::Idle,
            session_id: None,
            started_at: None,
            stopped_at: None,
            capture_task: None,
            running: Arc::new(AtomicBool::new(false)),
            abandoned: Arc::new(AtomicBool::new(false)),
            chunks_captured: Arc::new(AtomicUsize::new(0)),
            failed_chunks: Arc::new(AtomicUsize::new(0)),
        }
    }
}

/// Owns the session state machine and every collaborator.
///
/// State transitions: Idle --start--> Recording --stop--> Stopped
/// --reset--> Idle. Grouping and transcript reads are allowed in any
/// state and work from a store snapshot.
pub struct SessionController {
    settings: SessionSettings,
    backend_factory: Arc<dyn AudioBackendFactory>,
    transcription: Arc<dyn Transcription>,
    summarizer: Arc<dyn Summarizer>,
    clock: Arc<dyn Clock>,
    store: SegmentStore,
    lifecycle: Mutex<Lifecycle>,
}

impl SessionController {
    pub fn new(
        settings: SessionSettings,
        backend_factory: Arc<dyn AudioBackendFactory>,
        transcription: Arc<dyn Transcription>,
        summarizer: Arc<dyn Summarizer>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            settings,
            backend_factory,
            transcription,
            summarizer,
            clock,
            store: SegmentStore::new(),
            lifecycle: Mutex::new(Lifecycle::new()),
        }
    }

    /// Starts a recording session. Fails with `AlreadyRecording`
    /// unless the controller is Idle.
    pub async fn start(&self) -> Result<SessionStatus> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != SessionState::Idle {
            return Err(EchonoteError::AlreadyRecording);
        }

        let mut backend = self.backend_factory.create()?;
        let frames = backend.start().await?;

        let session_id = format!("session-{}", Uuid::new_v4());
        let epoch = self.clock.now();

        let running = Arc::new(AtomicBool::new(true));
        let abandoned = Arc::new(AtomicBool::new(false));
        let chunks_captured = Arc::new(AtomicUsize::new(0));
        let failed_chunks = Arc::new(AtomicUsize::new(0));

        let capture = CaptureLoop::new(
            self.store.clone(),
            self.transcription.clone(),
            &self.settings,
            running.clone(),
            abandoned.clone(),
            chunks_captured.clone(),
            failed_chunks.clone(),
        );
        let task = tokio::spawn(capture.run(backend, frames, epoch));

        info!("Recording session started: {}", session_id);

        lifecycle.state = SessionState::Recording;
        lifecycle.session_id = Some(session_id);
        lifecycle.started_at = Some(epoch);
        lifecycle.stopped_at = None;
        lifecycle.capture_task = Some(task);
        lifecycle.running = running;
        lifecycle.abandoned = abandoned;
        lifecycle.chunks_captured = chunks_captured;
        lifecycle.failed_chunks = failed_chunks;

        Ok(self.status_of(&lifecycle))
    }

    /// Stops the active session. Fails with `NotRecording` unless the
    /// controller is Recording.
    ///
    /// A graceful stop waits for the capture loop to drain buffered
    /// audio and transcribe the partial chunk. A hard stop returns
    /// immediately; the loop is left to notice the abandon flag and
    /// discard whatever it was doing.
    pub async fn stop(&self, hard: bool) -> Result<SessionStatus> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state != SessionState::Recording {
            return Err(EchonoteError::NotRecording);
        }

        if hard {
            lifecycle.abandoned.store(true, Ordering::SeqCst);
            lifecycle.running.store(false, Ordering::SeqCst);
            // Dropping the handle detaches the task; its in-flight
            // results are discarded, not awaited
            lifecycle.capture_task.take();
            info!("Recording session hard-stopped");
        } else {
            lifecycle.running.store(false, Ordering::SeqCst);
            if let Some(task) = lifecycle.capture_task.take() {
                if let Err(e) = task.await {
                    error!("Capture task panicked: {}", e);
                }
            }
            info!("Recording session stopped");
        }

        lifecycle.state = SessionState::Stopped;
        lifecycle.stopped_at = Some(self.clock.now());
        Ok(self.status_of(&lifecycle))
    }

    /// Clears the stored session and returns to Idle. Fails with
    /// `AlreadyRecording` while a session is active.
    pub async fn reset(&self) -> Result<SessionStatus> {
        let mut lifecycle = self.lifecycle.lock().await;
        if lifecycle.state == SessionState::Recording {
            return Err(EchonoteError::AlreadyRecording);
        }

        self.store.clear();
        *lifecycle = Lifecycle::new();
        info!("Session reset");
        Ok(self.status_of(&lifecycle))
    }

    pub async fn status(&self) -> SessionStatus {
        let lifecycle = self.lifecycle.lock().await;
        self.status_of(&lifecycle)
    }

    /// Point-in-time copy of the transcript, oldest first.
    pub fn transcript(&self) -> Vec<Segment> {
        self.store.snapshot()
    }

    /// Groups the current transcript into windows and runs each batch
    /// through the summarizer. Allowed in any state; reflects only
    /// segments present when the snapshot was taken.
    pub async fn groups(&self, width: WindowWidth) -> Vec<WindowDigest> {
        let snapshot = self.store.snapshot();
        let windows = partition(&snapshot, width);
        let reorderer = BatchReorderer::new(
            self.summarizer.clone(),
            self.settings.batch_limit,
            self.settings.merge_policy,
        );
        reorderer.process_all(windows).await
    }

    /// Window width applied when a grouping request names none.
    pub fn default_window_minutes(&self) -> i64 {
        self.settings.default_window_minutes
    }

    fn status_of(&self, lifecycle: &Lifecycle) -> SessionStatus {
        let duration_secs = match (lifecycle.state, lifecycle.started_at, lifecycle.stopped_at) {
            (SessionState::Recording, Some(started), _) => {
                (self.clock.now() - started).num_milliseconds() as f64 / 1000.0
            }
            (SessionState::Stopped, Some(started), Some(stopped)) => {
                (stopped - started).num_milliseconds() as f64 / 1000.0
            }
            _ => 0.0,
        };

        SessionStatus {
            state: lifecycle.state,
            session_id: lifecycle.session_id.clone(),
            started_at: lifecycle.started_at,
            stopped_at: lifecycle.stopped_at,
            duration_secs,
            chunks_captured: lifecycle.chunks_captured.load(Ordering::SeqCst),
            failed_chunks: lifecycle.failed_chunks.load(Ordering::SeqCst),
            segment_count: self.store.len(),
        }
    }
}
