//! LLM Engine module for audio analysis and notebook chat
//!
//! A provider talks to one generative-AI backend; the gateway packages
//! recordings for it and bounds every call with a timeout.

pub mod engine;
pub mod provider;
pub mod providers;

pub use engine::{AnalysisGateway, ANALYSIS_INSTRUCTION, AUDIO_MIME_TYPE};
pub use provider::{AnalysisError, AnalysisProvider, AudioPayload, RecordingContext};
pub use providers::{GeminiConfig, GeminiProvider};
