// VoiceNotes - notebooks of recorded classes with AI transcription and chat
//
// Core modules:
// - Persistent store for notebooks and recordings (SQLite)
// - Capture controller for one microphone session at a time
// - Analysis gateway to the generative-AI service
// - Coordinator driving the three in response to user actions

use anyhow::{Context, Result};
use std::sync::Arc;

pub mod audio;
pub mod chat;
pub mod config;
pub mod coordinator;
pub mod database;
pub mod error;
pub mod llm_engine;
pub mod logging;

#[cfg(test)]
mod test_support;

use audio::CaptureDevice;
use config::AppConfig;
use coordinator::{Coordinator, LogNotifier};
use database::DatabaseManager;
use llm_engine::{AnalysisGateway, GeminiProvider};

pub use error::{AppError, AppResult};

#[cfg(feature = "microphone")]
fn capture_device() -> Arc<dyn CaptureDevice> {
    Arc::new(audio::Microphone::default())
}

#[cfg(not(feature = "microphone"))]
fn capture_device() -> Arc<dyn CaptureDevice> {
    Arc::new(audio::NoCaptureDevice)
}

/// Wire the core together from configuration
pub fn build_coordinator(config: &AppConfig) -> Result<Coordinator> {
    let store = DatabaseManager::initialize(&config.db_path)
        .with_context(|| format!("failed to open database at {}", config.db_path.display()))?;

    let provider = GeminiProvider::new(config.gemini.clone()).context("failed to create Gemini provider")?;
    if config.gemini.api_key.is_none() {
        log::warn!("No Gemini API key configured; analysis and chat will fail");
    }

    let gateway = AnalysisGateway::new(Arc::new(provider))
        .with_timeout(config.analysis_timeout)
        .with_context_limit(config.chat_context);

    Ok(Coordinator::new(
        Arc::new(store),
        capture_device(),
        gateway,
        Arc::new(LogNotifier),
    ))
}

// ============== Main App Entry ==============

pub async fn run() -> Result<()> {
    logging::init();

    let config = AppConfig::from_env()?;
    log::info!("VoiceNotes starting with database {}", config.db_path.display());

    let coordinator = build_coordinator(&config)?;
    let notebooks = coordinator.load_notebooks().await?;

    if notebooks.is_empty() {
        println!("No notebooks yet.");
    }
    for notebook in &notebooks {
        coordinator.select_notebook(&notebook.id).await?;
        let recordings = coordinator.recordings();
        let total: u64 = recordings.iter().map(|r| u64::from(r.duration)).sum();
        println!(
            "{}  {} recording(s), {} total",
            notebook.name,
            recordings.len(),
            audio::format_elapsed(total)
        );
    }

    let store = Arc::clone(coordinator.store());
    drop(coordinator);
    match Arc::try_unwrap(store) {
        Ok(store) => store.close().context("failed to close database")?,
        Err(_) => log::warn!("Database still shared at shutdown; leaving it to drop"),
    }

    log::info!("VoiceNotes finished");
    Ok(())
}
