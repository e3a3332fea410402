//! SQLite-backed audit log of served content.
//!
//! Records are only ever appended. There is no update or delete path; the
//! only way history disappears is an explicit `ProvisionMode::Reset`.

use super::schema::{ProvisionMode, DROP_FILES, FILES_SCHEMA};
use crate::error::{ContentGateError, Result};
use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

/// Row to append for one served content file
#[derive(Debug, Clone, Copy)]
pub struct NewAuditRecord<'a> {
    /// Content category
    pub kind: &'a str,
    /// Version label
    pub version: &'a str,
    /// SHA-256 of `content`, lowercase hex
    pub hash: &'a str,
    /// Raw bytes read from disk
    pub content: &'a [u8],
}

/// Stored audit row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditRecord {
    /// Row id
    pub id: i64,
    /// Content category
    pub kind: String,
    /// Version label
    pub version: String,
    /// Digest computed at read time
    pub hash: String,
    /// Bytes that were read
    pub content: Vec<u8>,
    /// Insertion time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

impl AuditRecord {
    /// Listing form without the content bytes
    pub fn summary(&self) -> AuditSummary {
        AuditSummary {
            id: self.id,
            kind: self.kind.clone(),
            version: self.version.clone(),
            hash: self.hash.clone(),
            size: self.content.len() as u64,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Audit row as exposed over the API and CLI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuditSummary {
    /// Row id
    pub id: i64,
    /// Content category
    #[serde(rename = "type")]
    pub kind: String,
    /// Version label
    pub version: String,
    /// Digest computed at read time
    pub hash: String,
    /// Content length in bytes
    pub size: u64,
    /// Insertion time
    pub created_at: DateTime<Utc>,
    /// Last modification time
    pub updated_at: DateTime<Utc>,
}

/// Destination for audit records.
///
/// The handler depends on this seam rather than on SQLite directly.
pub trait AuditSink: Send + Sync {
    /// Append one record, returning its id. Must not return until the
    /// record is committed.
    fn append(&self, record: &NewAuditRecord<'_>) -> Result<i64>;
}

/// SQLite audit store.
#[derive(Clone)]
pub struct AuditStore {
    conn: Arc<Mutex<Connection>>,
}

impl AuditStore {
    /// Open a file-backed store. The schema is not touched until
    /// [`AuditStore::provision`] runs.
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::init_connection(&conn);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create an in-memory store (for testing).
    pub fn memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Create store from an existing connection.
    pub fn from_connection(conn: Connection) -> Result<Self> {
        Self::init_connection(&conn);
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    fn init_connection(conn: &Connection) {
        // WAL mode for file-backed DBs (no-op for in-memory)
        let _ = conn.execute_batch("PRAGMA journal_mode = WAL");
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| ContentGateError::Persistence("audit store lock poisoned".to_string()))
    }

    /// Prepare the `files` table.
    pub fn provision(&self, mode: ProvisionMode) -> Result<()> {
        let conn = self.lock()?;

        if mode == ProvisionMode::Reset {
            tracing::warn!("Dropping table 'files'; existing audit history is discarded");
            conn.execute(DROP_FILES, [])?;
        }

        tracing::debug!("Creating table 'files' if missing");
        conn.execute_batch(FILES_SCHEMA)?;
        tracing::info!(?mode, "Table 'files' ensured to exist");
        Ok(())
    }

    /// Number of stored records
    pub fn count(&self) -> Result<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM files", [], |row| row.get(0))?;
        Ok(n as u64)
    }

    /// Number of stored records for one content key
    pub fn count_for(&self, kind: &str, version: &str) -> Result<u64> {
        let conn = self.lock()?;
        let n: i64 = conn.query_row(
            "SELECT COUNT(*) FROM files WHERE type = ?1 AND version = ?2",
            params![kind, version],
            |row| row.get(0),
        )?;
        Ok(n as u64)
    }

    /// Fetch a record by id
    pub fn get(&self, id: i64) -> Result<Option<AuditRecord>> {
        let conn = self.lock()?;
        let record = conn
            .query_row(
                "SELECT id, type, version, hash, content, created_at, updated_at
                 FROM files WHERE id = ?1",
                params![id],
                row_to_record,
            )
            .optional()?;
        Ok(record)
    }

    /// Most recent records first
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditRecord>> {
        self.recent_for(None, None, limit)
    }

    /// Most recent records first, optionally filtered by type and version
    pub fn recent_for(
        &self,
        kind: Option<&str>,
        version: Option<&str>,
        limit: usize,
    ) -> Result<Vec<AuditRecord>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, type, version, hash, content, created_at, updated_at
             FROM files
             WHERE (?1 IS NULL OR type = ?1) AND (?2 IS NULL OR version = ?2)
             ORDER BY id DESC
             LIMIT ?3",
        )?;

        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = stmt.query_map(params![kind, version, limit], row_to_record)?;

        let mut out = Vec::new();
        for r in rows {
            out.push(r?);
        }
        Ok(out)
    }
}

impl AuditSink for AuditStore {
    fn append(&self, record: &NewAuditRecord<'_>) -> Result<i64> {
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO files (type, version, hash, content) VALUES (?1, ?2, ?3, ?4)",
            params![record.kind, record.version, record.hash, record.content],
        )?;
        Ok(conn.last_insert_rowid())
    }
}

fn row_to_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<AuditRecord> {
    Ok(AuditRecord {
        id: row.get(0)?,
        kind: row.get(1)?,
        version: row.get(2)?,
        hash: row.get(3)?,
        content: row.get(4)?,
        created_at: parse_timestamp(5, row.get(5)?)?,
        updated_at: parse_timestamp(6, row.get(6)?)?,
    })
}

fn parse_timestamp(idx: usize, raw: String) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(&raw)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}
