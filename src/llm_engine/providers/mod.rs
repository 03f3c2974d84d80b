//! Analysis provider implementations
//!
//! Each provider implements the AnalysisProvider trait for a specific backend

pub mod gemini_provider;

pub use gemini_provider::{GeminiConfig, GeminiProvider};
