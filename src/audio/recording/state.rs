//! Capture session state

use bytes::Bytes;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::super::device::{AudioFormat, DeviceGuard};
use super::types::CaptureStatus;

/// Everything owned by one in-progress capture
pub(crate) struct ActiveSession {
    pub session_id: Uuid,
    pub notebook_id: String,
    pub started_at: Instant,
    pub format: AudioFormat,
    pub device: DeviceGuard,
    pub cancel: CancellationToken,
    pub collector: JoinHandle<Vec<Bytes>>,
    pub ticker: JoinHandle<()>,
}

pub(crate) enum CaptureState {
    Idle,
    /// Acquiring the device for `notebook_id`
    Starting { notebook_id: String },
    Capturing(ActiveSession),
    /// Saving the finished recording into `notebook_id`
    Finalizing { notebook_id: String },
}

impl CaptureState {
    pub fn status(&self) -> CaptureStatus {
        match self {
            CaptureState::Idle => CaptureStatus::Idle,
            CaptureState::Starting { .. } => CaptureStatus::Starting,
            CaptureState::Capturing(_) => CaptureStatus::Capturing,
            CaptureState::Finalizing { .. } => CaptureStatus::Finalizing,
        }
    }

    /// Notebook the current or pending recording belongs to
    pub fn notebook_id(&self) -> Option<&str> {
        match self {
            CaptureState::Idle => None,
            CaptureState::Starting { notebook_id } | CaptureState::Finalizing { notebook_id } => {
                Some(notebook_id)
            }
            CaptureState::Capturing(session) => Some(&session.notebook_id),
        }
    }
}
