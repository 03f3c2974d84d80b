//! Recording lifecycle management - start/stop recording

use bytes::{Bytes, BytesMut};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::super::device::CaptureDevice;
use super::state::{ActiveSession, CaptureState};
use super::types::{CaptureError, CaptureStatus};
use crate::database::{DatabaseManager, Recording};

const TICK: Duration = Duration::from_secs(1);

/// Owns at most one in-progress capture session
pub struct CaptureController {
    device: Arc<dyn CaptureDevice>,
    state: Mutex<CaptureState>,
    elapsed: Arc<AtomicU64>,
}

/// Puts the controller back to Idle if a transition is abandoned midway
struct ResetOnDrop<'a> {
    state: &'a Mutex<CaptureState>,
    armed: bool,
}

impl ResetOnDrop<'_> {
    fn disarm(mut self) {
        self.armed = false;
    }
}

impl Drop for ResetOnDrop<'_> {
    fn drop(&mut self) {
        if self.armed {
            *lock(self.state) = CaptureState::Idle;
        }
    }
}

fn lock(state: &Mutex<CaptureState>) -> MutexGuard<'_, CaptureState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CaptureController {
    pub fn new(device: Arc<dyn CaptureDevice>) -> Self {
        Self {
            device,
            state: Mutex::new(CaptureState::Idle),
            elapsed: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn status(&self) -> CaptureStatus {
        lock(&self.state).status()
    }

    pub fn is_capturing(&self) -> bool {
        self.status() == CaptureStatus::Capturing
    }

    /// Whole seconds elapsed in the current (or last) session
    pub fn elapsed_seconds(&self) -> u64 {
        self.elapsed.load(Ordering::SeqCst)
    }

    /// Notebook the session will be saved into, from device acquisition
    /// until the save has finished
    pub fn capturing_notebook_id(&self) -> Option<String> {
        lock(&self.state).notebook_id().map(str::to_string)
    }

    /// Acquire the device and begin capturing for `notebook_id`.
    ///
    /// Fails with `InvalidState` unless the controller is idle. On device
    /// failure the controller stays idle.
    pub async fn start(&self, notebook_id: &str) -> Result<Uuid, CaptureError> {
        {
            let mut state = lock(&self.state);
            if !matches!(*state, CaptureState::Idle) {
                return Err(CaptureError::InvalidState {
                    action: "start recording",
                    status: state.status(),
                });
            }
            *state = CaptureState::Starting {
                notebook_id: notebook_id.to_string(),
            };
        }
        let reset = ResetOnDrop { state: &self.state, armed: true };

        info!("Acquiring capture device '{}'", self.device.device_name());
        let stream = match self.device.acquire().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Capture device acquisition failed: {}", e);
                return Err(e);
            }
        };

        let (format, chunks, device) = stream.into_parts();
        let session_id = Uuid::new_v4();
        let started_at = Instant::now();
        let cancel = CancellationToken::new();
        self.elapsed.store(0, Ordering::SeqCst);

        let collector = tokio::spawn(collect_chunks(chunks, cancel.clone()));
        let ticker = tokio::spawn(tick_elapsed(started_at, self.elapsed.clone(), cancel.clone()));

        *lock(&self.state) = CaptureState::Capturing(ActiveSession {
            session_id,
            notebook_id: notebook_id.to_string(),
            started_at,
            format,
            device,
            cancel,
            collector,
            ticker,
        });
        reset.disarm();

        info!(
            "Capture session {} started for notebook {} ({} Hz, {} ch)",
            session_id, notebook_id, format.sample_rate, format.channels
        );
        Ok(session_id)
    }

    /// Stop capturing, release the device and save the finalized recording.
    ///
    /// The controller returns to Idle whether or not the save succeeds; a
    /// failed save reports `PersistenceFailed` and the captured audio is
    /// discarded.
    pub async fn stop(&self, store: &Arc<DatabaseManager>) -> Result<Recording, CaptureError> {
        let session = {
            let mut state = lock(&self.state);
            let session = match std::mem::replace(&mut *state, CaptureState::Idle) {
                CaptureState::Capturing(session) => session,
                other => {
                    let status = other.status();
                    *state = other;
                    return Err(CaptureError::InvalidState {
                        action: "stop recording",
                        status,
                    });
                }
            };
            *state = CaptureState::Finalizing {
                notebook_id: session.notebook_id.clone(),
            };
            session
        };
        let _reset = ResetOnDrop { state: &self.state, armed: true };

        let ActiveSession {
            session_id,
            notebook_id,
            started_at,
            format,
            mut device,
            cancel,
            collector,
            ticker,
        } = session;

        cancel.cancel();
        let duration = started_at.elapsed().as_secs();
        device.release();

        let chunks = match collector.await {
            Ok(chunks) => chunks,
            Err(e) => {
                error!("Chunk collector for session {} failed: {}", session_id, e);
                Vec::new()
            }
        };
        if let Err(e) = ticker.await {
            debug!("Elapsed ticker for session {} ended abnormally: {}", session_id, e);
        }
        self.elapsed.store(duration, Ordering::SeqCst);

        let recording = Recording {
            id: Uuid::new_v4().to_string(),
            notebook_id,
            title: recording_title(),
            audio: concat_chunks(&chunks),
            sample_rate: format.sample_rate,
            channels: format.channels,
            duration: u32::try_from(duration).unwrap_or(u32::MAX),
            transcription: None,
            summary: None,
            created_at: chrono::Utc::now().timestamp_millis(),
        };
        info!(
            "Capture session {} finalized: {} chunks, {} bytes, {}s",
            session_id,
            chunks.len(),
            recording.audio.len(),
            recording.duration
        );

        let to_save = recording.clone();
        store
            .run_blocking(move |db| db.insert_recording(&to_save))
            .await
            .map_err(|e| {
                error!("Failed to save recording {}: {}", recording.id, e);
                CaptureError::PersistenceFailed(e)
            })?;

        Ok(recording)
    }
}

/// Accumulate chunks in arrival order until the session is cancelled or the
/// device closes its stream. Chunks already queued at cancellation are kept.
async fn collect_chunks(
    mut chunks: mpsc::UnboundedReceiver<Bytes>,
    cancel: CancellationToken,
) -> Vec<Bytes> {
    let mut collected = Vec::new();
    loop {
        tokio::select! {
            biased;
            chunk = chunks.recv() => match chunk {
                Some(chunk) => collected.push(chunk),
                None => break,
            },
            _ = cancel.cancelled() => {
                while let Ok(chunk) = chunks.try_recv() {
                    collected.push(chunk);
                }
                break;
            }
        }
    }
    collected
}

/// Publish whole elapsed seconds once per second until cancelled
async fn tick_elapsed(started_at: Instant, elapsed: Arc<AtomicU64>, cancel: CancellationToken) {
    let mut interval = interval_at(started_at + TICK, TICK);
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            _ = interval.tick() => {
                elapsed.store(started_at.elapsed().as_secs(), Ordering::SeqCst);
            }
        }
    }
}

fn concat_chunks(chunks: &[Bytes]) -> Bytes {
    let mut audio = BytesMut::with_capacity(chunks.iter().map(Bytes::len).sum());
    for chunk in chunks {
        audio.extend_from_slice(chunk);
    }
    audio.freeze()
}

fn recording_title() -> String {
    format!("Recording {}", chrono::Local::now().format("%H:%M"))
}

/// Format elapsed seconds as `m:ss`
pub fn format_elapsed(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}
