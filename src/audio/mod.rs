// src/audio/mod.rs
pub mod device;
#[cfg(feature = "microphone")]
pub mod microphone;
pub mod recording;
pub mod wav;

pub use device::{AudioFormat, CaptureDevice, CaptureStream, DeviceGuard, DeviceHandle, NoCaptureDevice};
#[cfg(feature = "microphone")]
pub use microphone::Microphone;
pub use recording::{format_elapsed, CaptureController, CaptureError, CaptureStatus};
