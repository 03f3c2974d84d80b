//! Recording lifecycle
//!
//! This module provides:
//! - The capture state machine (idle, capturing, finalizing)
//! - Chunk accumulation and the elapsed-seconds ticker
//! - Finalization of a session into a saved `Recording`

pub mod types;
pub mod state;
pub mod lifecycle;

pub use types::{CaptureError, CaptureStatus};
pub use lifecycle::{format_elapsed, CaptureController};
