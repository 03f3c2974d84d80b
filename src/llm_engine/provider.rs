//! Analysis provider trait and types
//!
//! Defines the common interface for generative-AI backends that turn audio
//! or a conversation into text.

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

use crate::chat::Message;
use crate::database::Recording;

/// Every way an analysis request can fail; all of them surface to callers
/// as an analysis failure with no partial result.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// No API key configured for the provider
    #[error("analysis failed: no API key configured")]
    MissingApiKey,
    /// The request did not finish in time
    #[error("analysis failed: no response within {0:?}")]
    Timeout(Duration),
    /// Network or transport failure
    #[error("analysis failed: {0}")]
    Request(String),
    /// The service answered with an error status (quota, auth, ...)
    #[error("analysis failed: service returned {status}: {body}")]
    Service { status: u16, body: String },
    /// The service answered with something that could not be decoded
    #[error("analysis failed: invalid response: {0}")]
    InvalidResponse(String),
    /// The service answered without any text
    #[error("analysis failed: the service returned no text")]
    EmptyResponse,
    /// The audio payload could not be packaged for upload
    #[error("analysis failed: could not package audio: {0}")]
    Encoding(String),
}

/// Audio ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioPayload {
    pub mime_type: String,
    pub data: Bytes,
}

/// What the chat is told about one recording of the active notebook
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordingContext {
    pub title: String,
    pub transcription: Option<String>,
    pub summary: Option<String>,
}

impl From<&Recording> for RecordingContext {
    fn from(recording: &Recording) -> Self {
        Self {
            title: recording.title.clone(),
            transcription: recording.transcription.clone(),
            summary: recording.summary.clone(),
        }
    }
}

/// The trait that all analysis backends implement
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Get the provider name (e.g. "gemini")
    fn provider_name(&self) -> &'static str;

    /// Send audio plus an instruction and return the reply text verbatim
    async fn analyze(&self, audio: &AudioPayload, instruction: &str) -> Result<String, AnalysisError>;

    /// Continue a conversation scoped to a notebook's recordings
    async fn converse(
        &self,
        history: &[Message],
        message: &str,
        context: &[RecordingContext],
    ) -> Result<String, AnalysisError>;
}
