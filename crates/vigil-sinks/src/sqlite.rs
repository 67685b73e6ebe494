//! SQLite store sink.

use crate::{ChangeSink, SinkError};
use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::{params, Connection};
use std::path::Path;
use vigil_types::ChangeEvent;

const CREATE_TABLE: &str = "CREATE TABLE IF NOT EXISTS FileChanges (
    ChangeType  TEXT NOT NULL,
    FilePath    TEXT NOT NULL,
    ProcessInfo TEXT NOT NULL,
    NetworkInfo TEXT NOT NULL,
    Timestamp   TEXT NOT NULL
)";

const INSERT_CHANGE: &str = "INSERT INTO FileChanges \
    (ChangeType, FilePath, ProcessInfo, NetworkInfo, Timestamp) \
    VALUES (?1, ?2, ?3, ?4, ?5)";

/// Store sink inserting one `FileChanges` row per accepted event.
///
/// Inserts are short; the connection is guarded by a mutex rather than a
/// per-write connection.
pub struct SqliteSink {
    id: String,
    conn: Mutex<Connection>,
}

impl SqliteSink {
    /// Open (creating if needed) the database and ensure the schema.
    pub fn open(path: &Path) -> Result<Self, SinkError> {
        let conn = Connection::open(path)?;
        conn.execute(CREATE_TABLE, [])?;
        Ok(Self {
            id: format!("sqlite:{}", path.display()),
            conn: Mutex::new(conn),
        })
    }
}

#[async_trait]
impl ChangeSink for SqliteSink {
    fn id(&self) -> &str {
        &self.id
    }

    async fn write(&self, event: &ChangeEvent) -> Result<(), SinkError> {
        let conn = self.conn.lock();
        conn.execute(
            INSERT_CHANGE,
            params![
                event.kind.to_string(),
                event.path.to_string_lossy().into_owned(),
                event.process_info(),
                event.network_info(),
                event.observed_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }
}
