// Notebooks repository for VoiceNotes
// Handles CRUD operations for notebooks, including the cascading delete

use rusqlite::{params, Connection};

use super::errors::{StorageError, StorageResultExt};
use super::models::Notebook;
use super::DatabaseManager;

impl DatabaseManager {
    /// Get all notebooks (order unspecified)
    pub fn list_notebooks(&self) -> Result<Vec<Notebook>, StorageError> {
        self.with_connection(list_notebooks_impl)
    }

    /// Insert or replace a notebook by id
    pub fn put_notebook(&self, notebook: &Notebook) -> Result<(), StorageError> {
        self.with_connection(|conn| put_notebook_impl(conn, notebook))
    }

    /// Delete a notebook together with every recording it owns.
    ///
    /// Both deletes run in one transaction, so readers observe either the
    /// notebook with all its recordings or neither. Returns the number of
    /// recordings removed; an unknown id removes nothing.
    pub fn delete_notebook(&self, id: &str) -> Result<usize, StorageError> {
        self.with_transaction(|tx| delete_notebook_impl(tx, id))
    }
}

fn list_notebooks_impl(conn: &Connection) -> Result<Vec<Notebook>, StorageError> {
    let mut stmt = conn
        .prepare("SELECT id, name, color, created_at FROM notebooks")
        .read_context("notebooks")?;

    let notebooks = stmt
        .query_map([], |row| {
            Ok(Notebook {
                id: row.get(0)?,
                name: row.get(1)?,
                color: row.get(2)?,
                created_at: row.get(3)?,
            })
        })
        .read_context("notebooks")?;

    notebooks
        .collect::<rusqlite::Result<Vec<_>>>()
        .read_context("notebook row")
}

fn put_notebook_impl(conn: &Connection, notebook: &Notebook) -> Result<(), StorageError> {
    conn.execute(
        r#"
        INSERT INTO notebooks (id, name, color, created_at)
        VALUES (?1, ?2, ?3, ?4)
        ON CONFLICT(id) DO UPDATE SET
            name = excluded.name,
            color = excluded.color,
            created_at = excluded.created_at
        "#,
        params![notebook.id, notebook.name, notebook.color, notebook.created_at],
    )
    .write_context("notebook")?;

    Ok(())
}

fn delete_notebook_impl(conn: &Connection, id: &str) -> Result<usize, StorageError> {
    let removed = conn
        .execute("DELETE FROM recordings WHERE notebook_id = ?", params![id])
        .write_context("notebook recordings")?;

    conn.execute("DELETE FROM notebooks WHERE id = ?", params![id])
        .write_context("notebook")?;

    log::debug!("Deleted notebook {} and {} recordings", id, removed);
    Ok(removed)
}
