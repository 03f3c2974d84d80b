//! Storage error taxonomy

use thiserror::Error;

/// Failure of a Persistent Store operation
#[derive(Debug, Error)]
pub enum StorageError {
    /// The store could not be opened or is no longer reachable
    #[error("storage unavailable: {0}")]
    Unavailable(String),
    /// A single read failed
    #[error("failed to read {what}")]
    Read {
        what: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// A single write failed
    #[error("failed to write {what}")]
    Write {
        what: &'static str,
        #[source]
        source: rusqlite::Error,
    },
    /// A new recording referenced a notebook that is not in the store
    #[error("notebook {0} does not exist")]
    MissingNotebook(String),
}

/// `anyhow::Context`-style helpers for rusqlite results
pub(crate) trait StorageResultExt<T> {
    fn read_context(self, what: &'static str) -> Result<T, StorageError>;
    fn write_context(self, what: &'static str) -> Result<T, StorageError>;
}

impl<T> StorageResultExt<T> for rusqlite::Result<T> {
    fn read_context(self, what: &'static str) -> Result<T, StorageError> {
        self.map_err(|source| StorageError::Read { what, source })
    }

    fn write_context(self, what: &'static str) -> Result<T, StorageError> {
        self.map_err(|source| StorageError::Write { what, source })
    }
}
