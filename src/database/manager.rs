// Database Manager for VoiceNotes
// Handles the SQLite connection and provides access to repositories

use rusqlite::{Connection, Transaction, TransactionBehavior};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use super::errors::{StorageError, StorageResultExt};
use super::migrations;

/// How long a statement waits on a lock held by another connection
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Database manager that owns the SQLite connection
pub struct DatabaseManager {
    conn: Mutex<Connection>,
    db_path: PathBuf,
}

impl DatabaseManager {
    /// Open (or create) the database at `db_path` and bring its schema up to date.
    ///
    /// Re-opening an existing database leaves its rows untouched.
    pub fn initialize(db_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let db_path = db_path.as_ref().to_path_buf();

        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StorageError::Unavailable(format!(
                    "failed to create database directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let conn = Connection::open(&db_path).map_err(|e| {
            StorageError::Unavailable(format!("failed to open {}: {}", db_path.display(), e))
        })?;

        conn.busy_timeout(BUSY_TIMEOUT)
            .map_err(|e| StorageError::Unavailable(format!("failed to set busy timeout: {}", e)))?;

        migrations::run_migrations(&conn)
            .map_err(|e| StorageError::Unavailable(format!("{:#}", e)))?;

        log::info!("Database initialized at: {:?}", db_path);

        Ok(Self {
            conn: Mutex::new(conn),
            db_path,
        })
    }

    /// Execute a function with access to the database connection
    pub fn with_connection<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Connection) -> Result<T, StorageError>,
    {
        let conn = self
            .conn
            .lock()
            .map_err(|e| StorageError::Unavailable(format!("database connection lock poisoned: {}", e)))?;
        f(&conn)
    }

    /// Execute a function inside one immediate transaction.
    ///
    /// The transaction commits only if `f` succeeds; any error rolls back
    /// every statement `f` issued.
    pub fn with_transaction<F, T>(&self, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&Transaction<'_>) -> Result<T, StorageError>,
    {
        self.with_connection(|conn| {
            let tx = Transaction::new_unchecked(conn, TransactionBehavior::Immediate)
                .write_context("transaction start")?;
            let value = f(&tx)?;
            tx.commit().write_context("transaction commit")?;
            Ok(value)
        })
    }

    /// Run a storage call on the blocking thread pool
    pub async fn run_blocking<F, T>(self: &Arc<Self>, f: F) -> Result<T, StorageError>
    where
        F: FnOnce(&DatabaseManager) -> Result<T, StorageError> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(self);
        tokio::task::spawn_blocking(move || f(&db))
            .await
            .map_err(|e| StorageError::Unavailable(format!("storage task failed: {}", e)))?
    }

    /// Get the database path
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    /// Close the connection, flushing any pending state
    pub fn close(self) -> Result<(), StorageError> {
        let conn = self
            .conn
            .into_inner()
            .map_err(|e| StorageError::Unavailable(format!("database connection lock poisoned: {}", e)))?;
        conn.close()
            .map_err(|(_, e)| StorageError::Unavailable(format!("failed to close database: {}", e)))?;
        log::info!("Database closed: {:?}", self.db_path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_database_creation() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("nested").join("test.db");

        let manager = DatabaseManager::initialize(&db_path).unwrap();
        assert!(db_path.exists());

        manager.with_connection(|conn| {
            let count: i32 = conn
                .query_row("SELECT COUNT(*) FROM notebooks", [], |row| row.get(0))
                .read_context("notebook count")?;
            assert_eq!(count, 0);
            Ok(())
        }).unwrap();
        manager.close().unwrap();
    }

    #[test]
    fn test_reopen_keeps_existing_rows() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");

        let manager = DatabaseManager::initialize(&db_path).unwrap();
        manager.with_connection(|conn| {
            conn.execute(
                "INSERT INTO notebooks (id, name, color, created_at) VALUES ('n1', 'Biology', '#111', 1)",
                [],
            ).write_context("notebook")?;
            Ok(())
        }).unwrap();
        manager.close().unwrap();

        let reopened = DatabaseManager::initialize(&db_path).unwrap();
        let names: Vec<String> = reopened.with_connection(|conn| {
            let mut stmt = conn.prepare("SELECT name FROM notebooks").read_context("notebooks")?;
            let rows = stmt.query_map([], |row| row.get(0)).read_context("notebooks")?;
            rows.collect::<rusqlite::Result<Vec<_>>>().read_context("notebooks")
        }).unwrap();
        assert_eq!(names, vec!["Biology".to_string()]);
    }

    #[test]
    fn test_unopenable_path_is_unavailable() {
        let dir = tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let result = DatabaseManager::initialize(blocker.join("test.db"));
        assert!(matches!(result, Err(StorageError::Unavailable(_))));
    }

    #[test]
    fn test_failed_transaction_rolls_back() {
        let dir = tempdir().unwrap();
        let manager = DatabaseManager::initialize(dir.path().join("test.db")).unwrap();

        let result: Result<(), StorageError> = manager.with_transaction(|tx| {
            tx.execute(
                "INSERT INTO notebooks (id, name, color, created_at) VALUES ('n1', 'Biology', '#111', 1)",
                [],
            ).write_context("notebook")?;
            tx.execute("INSERT INTO missing_table VALUES (1)", [])
                .write_context("missing table")?;
            Ok(())
        });
        assert!(matches!(result, Err(StorageError::Write { what: "missing table", .. })));

        let count: i32 = manager.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM notebooks", [], |row| row.get(0))
                .read_context("notebook count")
        }).unwrap();
        assert_eq!(count, 0);
    }
}
