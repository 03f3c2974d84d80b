//! Analysis gateway
//!
//! Packages recordings for an `AnalysisProvider` and bounds every request
//! with a timeout. Never touches storage.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::wav::pcm16_to_wav;
use crate::chat::Message;
use crate::database::Recording;
use crate::llm_engine::provider::{AnalysisError, AnalysisProvider, AudioPayload, RecordingContext};

pub const ANALYSIS_INSTRUCTION: &str =
    "Transcribe this audio and produce a structured summary with headings and key points.";

pub const AUDIO_MIME_TYPE: &str = "audio/wav";

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);
pub const DEFAULT_CONTEXT_LIMIT: usize = 5;

pub struct AnalysisGateway {
    provider: Arc<dyn AnalysisProvider>,
    timeout: Duration,
    context_limit: usize,
}

impl AnalysisGateway {
    pub fn new(provider: Arc<dyn AnalysisProvider>) -> Self {
        Self {
            provider,
            timeout: DEFAULT_TIMEOUT,
            context_limit: DEFAULT_CONTEXT_LIMIT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Number of recordings handed to the provider as chat context
    pub fn with_context_limit(mut self, limit: usize) -> Self {
        self.context_limit = limit;
        self
    }

    pub fn provider_name(&self) -> &'static str {
        self.provider.provider_name()
    }

    /// Send an audio payload plus an instruction and return the reply verbatim
    pub async fn analyze(&self, audio: &AudioPayload, instruction: &str) -> Result<String, AnalysisError> {
        self.bounded(self.provider.analyze(audio, instruction)).await
    }

    /// Analyze a finalized recording with the fixed transcribe-and-summarize instruction
    pub async fn analyze_recording(&self, recording: &Recording) -> Result<String, AnalysisError> {
        let audio = package_audio(recording)?;
        log::info!(
            "Analyzing recording {} ({}s) with {}",
            recording.id,
            recording.duration,
            self.provider_name()
        );
        self.analyze(&audio, ANALYSIS_INSTRUCTION).await
    }

    /// Continue the notebook chat. `recordings` is expected most recent first;
    /// only the first `context_limit` of them are supplied as context.
    pub async fn converse(
        &self,
        history: &[Message],
        message: &str,
        recordings: &[Recording],
    ) -> Result<String, AnalysisError> {
        let context: Vec<RecordingContext> = recordings
            .iter()
            .take(self.context_limit)
            .map(RecordingContext::from)
            .collect();

        self.bounded(self.provider.converse(history, message, &context)).await
    }

    async fn bounded<F>(&self, request: F) -> Result<String, AnalysisError>
    where
        F: Future<Output = Result<String, AnalysisError>>,
    {
        match tokio::time::timeout(self.timeout, request).await {
            Ok(Ok(reply)) if reply.trim().is_empty() => Err(AnalysisError::EmptyResponse),
            Ok(result) => result,
            Err(_) => {
                log::warn!("Analysis request exceeded {:?}", self.timeout);
                Err(AnalysisError::Timeout(self.timeout))
            }
        }
    }
}

/// Wrap a recording's raw PCM payload in a WAV container
pub fn package_audio(recording: &Recording) -> Result<AudioPayload, AnalysisError> {
    let wav = pcm16_to_wav(&recording.audio, recording.format())
        .map_err(|e| AnalysisError::Encoding(e.to_string()))?;

    Ok(AudioPayload {
        mime_type: AUDIO_MIME_TYPE.to_string(),
        data: wav.into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::FakeProvider;
    use async_trait::async_trait;
    use bytes::Bytes;
    use std::sync::atomic::Ordering;

    fn recording(id: &str, created_at: i64) -> Recording {
        Recording {
            id: id.to_string(),
            notebook_id: "n1".to_string(),
            title: format!("Recording {}", id),
            audio: Bytes::from_static(&[1, 0, 2, 0]),
            sample_rate: 16000,
            channels: 1,
            duration: 10,
            transcription: None,
            summary: None,
            created_at,
        }
    }

    struct StalledProvider;

    #[async_trait]
    impl AnalysisProvider for StalledProvider {
        fn provider_name(&self) -> &'static str {
            "stalled"
        }

        async fn analyze(&self, _audio: &AudioPayload, _instruction: &str) -> Result<String, AnalysisError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }

        async fn converse(
            &self,
            _history: &[Message],
            _message: &str,
            _context: &[RecordingContext],
        ) -> Result<String, AnalysisError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok("too late".to_string())
        }
    }

    #[tokio::test]
    async fn test_analyze_recording_sends_wav() {
        let provider = Arc::new(FakeProvider::replying("Summary text"));
        let gateway = AnalysisGateway::new(provider.clone());

        let reply = gateway.analyze_recording(&recording("r1", 100)).await.unwrap();
        assert_eq!(reply, "Summary text");
        assert_eq!(provider.analyze_calls.load(Ordering::SeqCst), 1);

        let payload = provider.last_payload.lock().unwrap().clone().unwrap();
        assert_eq!(payload.mime_type, "audio/wav");
        assert_eq!(&payload.data[..4], b"RIFF");
        assert_eq!(&payload.data[8..12], b"WAVE");
    }

    #[tokio::test]
    async fn test_provider_failure_propagates() {
        let gateway = AnalysisGateway::new(Arc::new(FakeProvider::failing()));
        let result = gateway.analyze_recording(&recording("r1", 100)).await;
        assert!(matches!(result, Err(AnalysisError::Request(_))));
    }

    #[tokio::test]
    async fn test_blank_reply_is_a_failure() {
        let gateway = AnalysisGateway::new(Arc::new(FakeProvider::replying("  \n")));
        let result = gateway.converse(&[], "hello", &[]).await;
        assert!(matches!(result, Err(AnalysisError::EmptyResponse)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_provider_times_out() {
        let gateway = AnalysisGateway::new(Arc::new(StalledProvider)).with_timeout(Duration::from_secs(30));

        let result = gateway.analyze_recording(&recording("r1", 100)).await;
        assert!(matches!(result, Err(AnalysisError::Timeout(d)) if d == Duration::from_secs(30)));

        let result = gateway.converse(&[], "hello", &[]).await;
        assert!(matches!(result, Err(AnalysisError::Timeout(_))));
    }

    #[tokio::test]
    async fn test_converse_limits_context() {
        let provider = Arc::new(FakeProvider::replying("Answer"));
        let gateway = AnalysisGateway::new(provider.clone()).with_context_limit(2);

        let recordings = vec![recording("c", 300), recording("b", 200), recording("a", 100)];
        let history = vec![Message::user("First question"), Message::model("First answer")];

        let reply = gateway.converse(&history, "Second question", &recordings).await.unwrap();
        assert_eq!(reply, "Answer");

        let calls = provider.converse_calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].history, history);
        assert_eq!(calls[0].message, "Second question");
        let titles: Vec<&str> = calls[0].context.iter().map(|c| c.title.as_str()).collect();
        assert_eq!(titles, vec!["Recording c", "Recording b"]);
    }
}
