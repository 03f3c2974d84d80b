//! Gemini API provider
//!
//! Talks to the `generateContent` endpoint of the Generative Language API.

use async_trait::async_trait;
use base64::Engine as _;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chat::Message;
use crate::llm_engine::provider::{AnalysisError, AnalysisProvider, AudioPayload, RecordingContext};

pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";

const ANALYSIS_SYSTEM_INSTRUCTION: &str = "You are an expert academic assistant. Your goal is to \
     transcribe classes accurately and help students understand complex concepts. If asked for a \
     summary, be concise and highlight key takeaways.";

const CHAT_SYSTEM_INSTRUCTION: &str = "You are a personal study assistant. Answer questions based \
     on the user's recorded classes.";

/// Gemini request body
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    contents: Vec<GeminiContent>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

impl GeminiContent {
    fn new(role: Option<&str>, parts: Vec<GeminiPart>) -> Self {
        Self {
            role: role.map(str::to_string),
            parts,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiPart {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    inline_data: Option<InlineData>,
}

impl GeminiPart {
    fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            inline_data: None,
        }
    }

    fn inline(audio: &AudioPayload) -> Self {
        Self {
            text: None,
            inline_data: Some(InlineData {
                mime_type: audio.mime_type.clone(),
                data: base64::engine::general_purpose::STANDARD.encode(&audio.data),
            }),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

/// Gemini response body
#[derive(Debug, Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    #[serde(default)]
    content: Option<GeminiContent>,
}

impl GenerateContentResponse {
    /// Concatenated text parts of the first candidate
    fn text(self) -> Option<String> {
        let content = self.candidates.into_iter().next()?.content?;
        let text: String = content.parts.into_iter().filter_map(|p| p.text).collect();
        if text.is_empty() {
            None
        } else {
            Some(text)
        }
    }
}

/// Gemini provider configuration
#[derive(Debug, Clone)]
pub struct GeminiConfig {
    pub api_key: Option<String>,
    pub model: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GeminiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            model: DEFAULT_MODEL.to_string(),
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout_secs: 120,
        }
    }
}

/// Gemini analysis provider
pub struct GeminiProvider {
    config: GeminiConfig,
    client: Client,
}

impl GeminiProvider {
    pub fn new(config: GeminiConfig) -> Result<Self, AnalysisError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AnalysisError::Request(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    async fn generate(&self, request: &GenerateContentRequest) -> Result<String, AnalysisError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(AnalysisError::MissingApiKey)?;

        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", api_key)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AnalysisError::Timeout(Duration::from_secs(self.config.timeout_secs))
                } else {
                    AnalysisError::Request(format!("request to Gemini failed: {}", e))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            log::warn!("Gemini returned {}: {}", status, body);
            return Err(AnalysisError::Service {
                status: status.as_u16(),
                body,
            });
        }

        let body: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| AnalysisError::InvalidResponse(e.to_string()))?;

        body.text().ok_or(AnalysisError::EmptyResponse)
    }
}

fn analyze_request(audio: &AudioPayload, instruction: &str) -> GenerateContentRequest {
    GenerateContentRequest {
        system_instruction: Some(GeminiContent::new(None, vec![GeminiPart::text(ANALYSIS_SYSTEM_INSTRUCTION)])),
        contents: vec![GeminiContent::new(
            Some("user"),
            vec![GeminiPart::inline(audio), GeminiPart::text(instruction)],
        )],
    }
}

fn context_text(context: &RecordingContext) -> String {
    let mut text = format!("Context from recording \"{}\":", context.title);
    if let Some(summary) = &context.summary {
        text.push_str("\nSummary:\n");
        text.push_str(summary);
    }
    if let Some(transcription) = &context.transcription {
        text.push_str("\nTranscription:\n");
        text.push_str(transcription);
    }
    text
}

fn converse_request(
    history: &[Message],
    message: &str,
    context: &[RecordingContext],
) -> GenerateContentRequest {
    let mut contents: Vec<GeminiContent> = history
        .iter()
        .map(|m| GeminiContent::new(Some(m.role.as_str()), vec![GeminiPart::text(m.content.clone())]))
        .collect();

    let mut parts: Vec<GeminiPart> = context.iter().map(|c| GeminiPart::text(context_text(c))).collect();
    parts.push(GeminiPart::text(message));
    contents.push(GeminiContent::new(Some("user"), parts));

    GenerateContentRequest {
        system_instruction: Some(GeminiContent::new(None, vec![GeminiPart::text(CHAT_SYSTEM_INSTRUCTION)])),
        contents,
    }
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    fn provider_name(&self) -> &'static str {
        "gemini"
    }

    async fn analyze(&self, audio: &AudioPayload, instruction: &str) -> Result<String, AnalysisError> {
        log::debug!(
            "Sending {} bytes of {} to {}",
            audio.data.len(),
            audio.mime_type,
            self.config.model
        );
        self.generate(&analyze_request(audio, instruction)).await
    }

    async fn converse(
        &self,
        history: &[Message],
        message: &str,
        context: &[RecordingContext],
    ) -> Result<String, AnalysisError> {
        log::debug!(
            "Chat turn with {} prior messages and {} recordings of context",
            history.len(),
            context.len()
        );
        self.generate(&converse_request(history, message, context)).await
    }
}
