// Database models - Recording
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::audio::AudioFormat;

/// One finalized capture session and its derived analysis
///
/// `audio` holds little-endian 16-bit PCM in the layout described by
/// `sample_rate` and `channels`. It is written once, when the row is first
/// inserted, and never replaced afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub id: String,
    pub notebook_id: String,
    pub title: String,
    #[serde(skip)]
    pub audio: Bytes,
    pub sample_rate: u32,
    pub channels: u16,
    /// Whole seconds captured
    pub duration: u32,
    pub transcription: Option<String>,
    pub summary: Option<String>,
    /// Milliseconds since the Unix epoch, taken at finalization
    pub created_at: i64,
}

impl Recording {
    pub fn format(&self) -> AudioFormat {
        AudioFormat {
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }

    /// Copy of this recording with an analysis summary attached
    pub fn with_summary(&self, summary: impl Into<String>) -> Self {
        Self {
            summary: Some(summary.into()),
            ..self.clone()
        }
    }
}
