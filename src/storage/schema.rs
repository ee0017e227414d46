//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Sumi-Harvest database.

/// Current schema version, stored in `PRAGMA user_version`
pub const SCHEMA_VERSION: u32 = 1;

/// SQL schema for the database
///
/// `url` is the primary key: a second insert for the same URL is rejected by the
/// constraint rather than producing a duplicate row.
pub const SCHEMA_SQL: &str = r#"
-- One row per fetched URL
CREATE TABLE IF NOT EXISTS records (
    url TEXT PRIMARY KEY NOT NULL,
    content BLOB NOT NULL,
    status_code INTEGER,
    content_type TEXT,
    fetched_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_records_status ON records(status_code);
"#;

/// Initializes the database schema
///
/// Safe to call on every open; all statements are `IF NOT EXISTS`.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    conn.pragma_update(None, "user_version", SCHEMA_VERSION)?;
    Ok(())
}
