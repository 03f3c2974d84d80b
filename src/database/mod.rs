// Database module for VoiceNotes
// Provides SQLite persistence for notebooks and their recordings

pub mod errors;
pub mod manager;
pub mod migrations;
pub mod models;
pub mod notebooks_repo;
pub mod recordings_repo;

pub use errors::StorageError;
pub use manager::DatabaseManager;
pub use models::*;
