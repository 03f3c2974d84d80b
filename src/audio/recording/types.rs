//! Types for the capture lifecycle

use serde::Serialize;
use std::fmt;
use thiserror::Error;

use crate::database::StorageError;

/// Where the capture controller is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptureStatus {
    Idle,
    /// Waiting for the device to be acquired
    Starting,
    Capturing,
    Finalizing,
}

impl fmt::Display for CaptureStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CaptureStatus::Idle => write!(f, "idle"),
            CaptureStatus::Starting => write!(f, "starting"),
            CaptureStatus::Capturing => write!(f, "capturing"),
            CaptureStatus::Finalizing => write!(f, "finalizing"),
        }
    }
}

/// Failure of a capture operation
#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("microphone access denied: {0}")]
    DeviceAccessDenied(String),
    #[error("microphone unavailable: {0}")]
    DeviceUnavailable(String),
    #[error("cannot {action} while {status}")]
    InvalidState {
        action: &'static str,
        status: CaptureStatus,
    },
    #[error("recording could not be saved")]
    PersistenceFailed(#[source] StorageError),
}
