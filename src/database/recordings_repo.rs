// Recordings repository for VoiceNotes
// Handles CRUD operations for recordings

use bytes::Bytes;
use rusqlite::{params, Connection, Row};

use super::errors::{StorageError, StorageResultExt};
use super::models::Recording;
use super::DatabaseManager;

const RECORDING_COLUMNS: &str = "id, notebook_id, title, audio, sample_rate, channels, \
     duration_seconds, transcription, summary, created_at";

impl DatabaseManager {
    /// Get a recording by ID
    pub fn get_recording(&self, id: &str) -> Result<Option<Recording>, StorageError> {
        self.with_connection(|conn| get_recording_impl(conn, id))
    }

    /// Get every recording of a notebook, most recent first
    pub fn list_recordings_by_notebook(&self, notebook_id: &str) -> Result<Vec<Recording>, StorageError> {
        self.with_connection(|conn| list_recordings_by_notebook_impl(conn, notebook_id))
    }

    /// Insert a recording, or replace the fields of an existing one.
    ///
    /// The audio payload is only written on insert; replacing an existing
    /// recording keeps its stored audio.
    pub fn put_recording(&self, recording: &Recording) -> Result<(), StorageError> {
        self.with_connection(|conn| put_recording_impl(conn, recording))
    }

    /// Insert a freshly finalized recording, provided its notebook still
    /// exists. Fails with `MissingNotebook` otherwise.
    pub fn insert_recording(&self, recording: &Recording) -> Result<(), StorageError> {
        self.with_connection(|conn| insert_recording_impl(conn, recording))
    }

    /// Attach analysis results to an existing recording.
    ///
    /// Only updates a row that is still present; returns `false` when the
    /// recording is gone, so a late analysis never recreates it.
    pub fn attach_analysis(
        &self,
        id: &str,
        summary: Option<&str>,
        transcription: Option<&str>,
    ) -> Result<bool, StorageError> {
        self.with_connection(|conn| attach_analysis_impl(conn, id, summary, transcription))
    }

    /// Delete a recording; unknown ids are ignored
    pub fn delete_recording(&self, id: &str) -> Result<(), StorageError> {
        self.with_connection(|conn| delete_recording_impl(conn, id))
    }
}

fn recording_from_row(row: &Row<'_>) -> rusqlite::Result<Recording> {
    Ok(Recording {
        id: row.get(0)?,
        notebook_id: row.get(1)?,
        title: row.get(2)?,
        audio: Bytes::from(row.get::<_, Vec<u8>>(3)?),
        sample_rate: row.get(4)?,
        channels: row.get(5)?,
        duration: row.get(6)?,
        transcription: row.get(7)?,
        summary: row.get(8)?,
        created_at: row.get(9)?,
    })
}

fn get_recording_impl(conn: &Connection, id: &str) -> Result<Option<Recording>, StorageError> {
    let mut stmt = conn
        .prepare(&format!("SELECT {} FROM recordings WHERE id = ?", RECORDING_COLUMNS))
        .read_context("recording")?;

    match stmt.query_row(params![id], recording_from_row) {
        Ok(recording) => Ok(Some(recording)),
        Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
        Err(source) => Err(StorageError::Read { what: "recording", source }),
    }
}

fn list_recordings_by_notebook_impl(
    conn: &Connection,
    notebook_id: &str,
) -> Result<Vec<Recording>, StorageError> {
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM recordings WHERE notebook_id = ? ORDER BY created_at DESC",
            RECORDING_COLUMNS
        ))
        .read_context("notebook recordings")?;

    let recordings = stmt
        .query_map(params![notebook_id], recording_from_row)
        .read_context("notebook recordings")?;

    recordings
        .collect::<rusqlite::Result<Vec<_>>>()
        .read_context("recording row")
}

fn put_recording_impl(conn: &Connection, recording: &Recording) -> Result<(), StorageError> {
    conn.execute(
        r#"
        INSERT INTO recordings (
            id, notebook_id, title, audio, sample_rate, channels,
            duration_seconds, transcription, summary, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        ON CONFLICT(id) DO UPDATE SET
            notebook_id = excluded.notebook_id,
            title = excluded.title,
            duration_seconds = excluded.duration_seconds,
            transcription = excluded.transcription,
            summary = excluded.summary,
            created_at = excluded.created_at
        "#,
        params![
            recording.id,
            recording.notebook_id,
            recording.title,
            recording.audio.as_ref(),
            recording.sample_rate,
            recording.channels,
            recording.duration,
            recording.transcription,
            recording.summary,
            recording.created_at,
        ],
    )
    .write_context("recording")?;

    Ok(())
}

fn insert_recording_impl(conn: &Connection, recording: &Recording) -> Result<(), StorageError> {
    let inserted = conn
        .execute(
            r#"
            INSERT INTO recordings (
                id, notebook_id, title, audio, sample_rate, channels,
                duration_seconds, transcription, summary, created_at
            )
            SELECT ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10
            WHERE EXISTS (SELECT 1 FROM notebooks WHERE id = ?2)
            "#,
            params![
                recording.id,
                recording.notebook_id,
                recording.title,
                recording.audio.as_ref(),
                recording.sample_rate,
                recording.channels,
                recording.duration,
                recording.transcription,
                recording.summary,
                recording.created_at,
            ],
        )
        .write_context("recording")?;

    if inserted == 0 {
        return Err(StorageError::MissingNotebook(recording.notebook_id.clone()));
    }
    Ok(())
}

fn attach_analysis_impl(
    conn: &Connection,
    id: &str,
    summary: Option<&str>,
    transcription: Option<&str>,
) -> Result<bool, StorageError> {
    let updated = conn
        .execute(
            "UPDATE recordings SET summary = ?1, transcription = ?2 WHERE id = ?3",
            params![summary, transcription, id],
        )
        .write_context("recording analysis")?;
    Ok(updated > 0)
}

fn delete_recording_impl(conn: &Connection, id: &str) -> Result<(), StorageError> {
    conn.execute("DELETE FROM recordings WHERE id = ?", params![id])
        .write_context("recording")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::models::Notebook;
    use tempfile::{tempdir, TempDir};

    fn create_test_db() -> (TempDir, DatabaseManager) {
        let dir = tempdir().unwrap();
        let db = DatabaseManager::initialize(dir.path().join("test.db")).unwrap();
        (dir, db)
    }

    fn recording(id: &str, created_at: i64) -> Recording {
        Recording {
            id: id.to_string(),
            notebook_id: "n1".to_string(),
            title: "X".to_string(),
            audio: Bytes::from_static(&[1, 0, 2, 0, 3, 0]),
            sample_rate: 16000,
            channels: 1,
            duration: 10,
            transcription: None,
            summary: None,
            created_at,
        }
    }

    #[test]
    fn test_most_recent_first() {
        let (_dir, db) = create_test_db();

        db.put_recording(&recording("a", 100)).unwrap();
        db.put_recording(&recording("b", 300)).unwrap();
        db.put_recording(&recording("c", 200)).unwrap();

        let created: Vec<i64> = db
            .list_recordings_by_notebook("n1")
            .unwrap()
            .iter()
            .map(|r| r.created_at)
            .collect();
        assert_eq!(created, vec![300, 200, 100]);
    }

    #[test]
    fn test_round_trip_preserves_payload() {
        let (_dir, db) = create_test_db();
        let original = recording("r1", 100);
        db.put_recording(&original).unwrap();

        assert_eq!(db.get_recording("r1").unwrap(), Some(original));
        assert_eq!(db.get_recording("missing").unwrap(), None);
    }

    #[test]
    fn test_summary_attaches_without_losing_fields() {
        let (_dir, db) = create_test_db();
        let original = recording("r2", 100);
        db.put_recording(&original).unwrap();

        db.put_recording(&original.with_summary("Summary text")).unwrap();

        let stored = db.get_recording("r2").unwrap().unwrap();
        assert_eq!(stored.summary.as_deref(), Some("Summary text"));
        assert_eq!(stored.title, "X");
        assert_eq!(stored.duration, 10);
        assert_eq!(stored.audio, original.audio);
        assert_eq!(Recording { summary: None, ..stored }, original);
    }

    #[test]
    fn test_audio_is_write_once() {
        let (_dir, db) = create_test_db();
        let original = recording("r1", 100);
        db.put_recording(&original).unwrap();

        let tampered = Recording {
            audio: Bytes::from_static(b"overwritten"),
            ..original.clone()
        };
        db.put_recording(&tampered).unwrap();

        let stored = db.get_recording("r1").unwrap().unwrap();
        assert_eq!(stored.audio, original.audio);
    }

    #[test]
    fn test_insert_requires_existing_notebook() {
        let (_dir, db) = create_test_db();

        let result = db.insert_recording(&recording("r1", 100));
        assert!(matches!(result, Err(StorageError::MissingNotebook(id)) if id == "n1"));
        assert_eq!(db.get_recording("r1").unwrap(), None);

        db.put_notebook(&Notebook {
            id: "n1".to_string(),
            name: "Biology".to_string(),
            color: "#111".to_string(),
            created_at: 1,
        })
        .unwrap();
        db.insert_recording(&recording("r1", 100)).unwrap();
        assert_eq!(db.get_recording("r1").unwrap(), Some(recording("r1", 100)));
    }

    #[test]
    fn test_attach_analysis_never_recreates_deleted_recording() {
        let (_dir, db) = create_test_db();
        let original = recording("r1", 100);
        db.put_recording(&original).unwrap();

        assert!(db.attach_analysis("r1", Some("Summary text"), None).unwrap());
        let stored = db.get_recording("r1").unwrap().unwrap();
        assert_eq!(stored, original.with_summary("Summary text"));

        db.delete_recording("r1").unwrap();
        assert!(!db.attach_analysis("r1", Some("Late summary"), None).unwrap());
        assert!(db.list_recordings_by_notebook("n1").unwrap().is_empty());
    }

    #[test]
    fn test_delete_missing_recording_is_noop() {
        let (_dir, db) = create_test_db();
        db.put_recording(&recording("r1", 100)).unwrap();

        db.delete_recording("missing").unwrap();
        assert_eq!(db.list_recordings_by_notebook("n1").unwrap().len(), 1);

        db.delete_recording("r1").unwrap();
        assert!(db.list_recordings_by_notebook("n1").unwrap().is_empty());
    }
}
