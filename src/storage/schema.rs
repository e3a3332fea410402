//! SQLite schema for the content audit log.
//!
//! Tables:
//! - `files`: append-only record of every content file served

use serde::{Deserialize, Serialize};

/// Name of the audit table
pub const FILES_TABLE: &str = "files";

/// DDL for the audit table. Idempotent.
pub const FILES_SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS files (
    id          INTEGER PRIMARY KEY AUTOINCREMENT,
    type        TEXT NOT NULL,
    version     TEXT NOT NULL,
    hash        TEXT NOT NULL,
    content     BLOB NOT NULL,
    created_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now')),
    updated_at  TEXT NOT NULL DEFAULT (strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))
);

CREATE INDEX IF NOT EXISTS idx_files_type_version
    ON files(type, version);
"#;

/// Drops the audit table and its history.
pub const DROP_FILES: &str = "DROP TABLE IF EXISTS files";

/// How the audit table is prepared at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionMode {
    /// Create the table if missing, keep existing history
    #[default]
    Preserve,
    /// Drop and recreate the table, discarding all history
    Reset,
}
