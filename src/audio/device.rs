//! Capture device seam
//!
//! A [`CaptureDevice`] hands out a [`CaptureStream`]: raw PCM chunks in
//! arrival order plus a [`DeviceGuard`] that releases the device when it is
//! released explicitly or dropped.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::recording::CaptureError;

/// Layout of a little-endian 16-bit PCM payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    pub const fn mono(sample_rate: u32) -> Self {
        Self { sample_rate, channels: 1 }
    }
}

/// Releases the underlying device exactly once
pub trait DeviceHandle: Send {
    fn release(&mut self);
}

/// Owns an acquired device; releasing is idempotent and also happens on drop
pub struct DeviceGuard {
    handle: Option<Box<dyn DeviceHandle>>,
}

impl DeviceGuard {
    pub fn new(handle: Box<dyn DeviceHandle>) -> Self {
        Self { handle: Some(handle) }
    }

    pub fn release(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.release();
        }
    }

    pub fn is_released(&self) -> bool {
        self.handle.is_none()
    }
}

impl Drop for DeviceGuard {
    fn drop(&mut self) {
        self.release();
    }
}

/// An acquired device emitting audio chunks until released
pub struct CaptureStream {
    format: AudioFormat,
    chunks: mpsc::UnboundedReceiver<Bytes>,
    guard: DeviceGuard,
}

impl CaptureStream {
    pub fn new(
        format: AudioFormat,
        chunks: mpsc::UnboundedReceiver<Bytes>,
        handle: Box<dyn DeviceHandle>,
    ) -> Self {
        Self {
            format,
            chunks,
            guard: DeviceGuard::new(handle),
        }
    }

    pub fn format(&self) -> AudioFormat {
        self.format
    }

    pub fn into_parts(self) -> (AudioFormat, mpsc::UnboundedReceiver<Bytes>, DeviceGuard) {
        (self.format, self.chunks, self.guard)
    }
}

/// Source of capture streams (a microphone, or a fake in tests)
#[async_trait]
pub trait CaptureDevice: Send + Sync {
    fn device_name(&self) -> String;

    /// Acquire the device, failing with `DeviceAccessDenied` or `DeviceUnavailable`
    async fn acquire(&self) -> Result<CaptureStream, CaptureError>;
}

/// Stand-in used when the crate is built without microphone support
pub struct NoCaptureDevice;

#[async_trait]
impl CaptureDevice for NoCaptureDevice {
    fn device_name(&self) -> String {
        "none".to_string()
    }

    async fn acquire(&self) -> Result<CaptureStream, CaptureError> {
        Err(CaptureError::DeviceUnavailable(
            "built without the `microphone` feature".to_string(),
        ))
    }
}
