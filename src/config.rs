// Configuration for VoiceNotes
// Defaults overridden by environment variables

use anyhow::{Context, Result};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::llm_engine::GeminiConfig;

pub const DB_PATH_VAR: &str = "VOICE_NOTES_DB";
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";
pub const API_KEY_FALLBACK_VAR: &str = "API_KEY";
pub const MODEL_VAR: &str = "GEMINI_MODEL";
pub const BASE_URL_VAR: &str = "GEMINI_BASE_URL";
pub const TIMEOUT_VAR: &str = "VOICE_NOTES_ANALYSIS_TIMEOUT_SECS";
pub const CHAT_CONTEXT_VAR: &str = "VOICE_NOTES_CHAT_CONTEXT";

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub db_path: PathBuf,
    pub gemini: GeminiConfig,
    /// Upper bound for one analysis or chat request
    pub analysis_timeout: Duration,
    /// Most recent recordings supplied as chat context
    pub chat_context: usize,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            gemini: GeminiConfig::default(),
            analysis_timeout: Duration::from_secs(120),
            chat_context: 5,
        }
    }
}

pub fn default_db_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("voice-notes")
        .join("voicenotes.db")
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary variable source
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let mut config = Self::default();

        if let Some(path) = var(DB_PATH_VAR) {
            config.db_path = PathBuf::from(path);
        }
        config.gemini.api_key = var(API_KEY_VAR).or_else(|| var(API_KEY_FALLBACK_VAR));
        if let Some(model) = var(MODEL_VAR) {
            config.gemini.model = model;
        }
        if let Some(base_url) = var(BASE_URL_VAR) {
            config.gemini.base_url = base_url;
        }
        if let Some(secs) = var(TIMEOUT_VAR) {
            let secs: u64 = parse(TIMEOUT_VAR, &secs)?;
            config.analysis_timeout = Duration::from_secs(secs);
        }
        if let Some(limit) = var(CHAT_CONTEXT_VAR) {
            config.chat_context = parse(CHAT_CONTEXT_VAR, &limit)?;
        }

        config.gemini.timeout_secs = config.analysis_timeout.as_secs();
        Ok(config)
    }
}

fn parse<T>(key: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .with_context(|| format!("invalid value for {}: {:?}", key, value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(vars: &[(&str, &str)]) -> Result<AppConfig> {
        let vars: HashMap<String, String> = vars.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert!(config.db_path.ends_with("voice-notes/voicenotes.db"));
        assert_eq!(config.gemini.api_key, None);
        assert_eq!(config.gemini.model, "gemini-3-flash-preview");
        assert_eq!(config.analysis_timeout, Duration::from_secs(120));
        assert_eq!(config.gemini.timeout_secs, 120);
        assert_eq!(config.chat_context, 5);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[
            (DB_PATH_VAR, "/tmp/notes.db"),
            (API_KEY_FALLBACK_VAR, "fallback"),
            (MODEL_VAR, "gemini-pro"),
            (TIMEOUT_VAR, "30"),
            (CHAT_CONTEXT_VAR, "2"),
        ])
        .unwrap();

        assert_eq!(config.db_path, PathBuf::from("/tmp/notes.db"));
        assert_eq!(config.gemini.api_key.as_deref(), Some("fallback"));
        assert_eq!(config.gemini.model, "gemini-pro");
        assert_eq!(config.analysis_timeout, Duration::from_secs(30));
        assert_eq!(config.gemini.timeout_secs, 30);
        assert_eq!(config.chat_context, 2);
    }

    #[test]
    fn test_primary_key_wins_and_blank_is_unset() {
        let config = config_from(&[(API_KEY_VAR, "primary"), (API_KEY_FALLBACK_VAR, "fallback")]).unwrap();
        assert_eq!(config.gemini.api_key.as_deref(), Some("primary"));

        let config = config_from(&[(API_KEY_VAR, "  ")]).unwrap();
        assert_eq!(config.gemini.api_key, None);
    }

    #[test]
    fn test_invalid_number_is_an_error() {
        let err = config_from(&[(TIMEOUT_VAR, "soon")]).unwrap_err();
        assert!(err.to_string().contains(TIMEOUT_VAR));
    }
}
