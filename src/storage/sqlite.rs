//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::harvest::FetchedPage;
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::Record;
use crate::HarvestError;
use chrono::Utc;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// True only for a violated primary key or unique index
///
/// NOT NULL, CHECK and foreign key failures share the same primary code and
/// must not be reported as duplicates.
fn is_duplicate_key(error: &rusqlite::Error) -> bool {
    match error {
        rusqlite::Error::SqliteFailure(err, _) => {
            err.code == ErrorCode::ConstraintViolation
                && matches!(
                    err.extended_code,
                    ffi::SQLITE_CONSTRAINT_PRIMARYKEY | ffi::SQLITE_CONSTRAINT_UNIQUE
                )
        }
        _ => false,
    }
}

/// SQLite storage backend
///
/// The connection sits behind a mutex, so concurrent workers are serialized
/// at the store and every transaction covers exactly one URL.
pub struct SqliteStorage {
    conn: Mutex<Connection>,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(HarvestError)` - Failed to open database
    pub fn new(path: &Path) -> Result<Self, HarvestError> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> Result<Self, HarvestError> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> StorageResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

impl Storage for SqliteStorage {
    // ===== Gateway =====

    fn exists(&self, url: &str) -> StorageResult<bool> {
        let conn = self.lock()?;
        let found: Option<i64> = conn
            .query_row(
                "SELECT 1 FROM records WHERE url = ?1 LIMIT 1",
                params![url],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn save(&self, page: &FetchedPage) -> StorageResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let now = Utc::now().to_rfc3339();
        let inserted = tx.execute(
            "INSERT INTO records (url, content, status_code, content_type, fetched_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                page.url,
                page.body,
                page.status_code,
                page.content_type,
                now
            ],
        );

        // Dropping `tx` without commit rolls the insert back
        match inserted {
            Ok(_) => {}
            Err(e) if is_duplicate_key(&e) => {
                return Err(StorageError::AlreadyExists(page.url.clone()));
            }
            Err(e) => return Err(e.into()),
        }

        tx.commit()?;
        Ok(())
    }

    // ===== Queries =====

    fn get_record(&self, url: &str) -> StorageResult<Option<Record>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT url, content, status_code, content_type, fetched_at
             FROM records WHERE url = ?1",
        )?;

        let record = stmt
            .query_row(params![url], |row| {
                Ok(Record {
                    url: row.get(0)?,
                    content: row.get(1)?,
                    status_code: row.get(2)?,
                    content_type: row.get(3)?,
                    fetched_at: row.get(4)?,
                })
            })
            .optional()?;

        Ok(record)
    }

    // ===== Statistics =====

    fn count_records(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM records", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn total_content_bytes(&self) -> StorageResult<u64> {
        let conn = self.lock()?;
        let total: i64 = conn.query_row(
            "SELECT COALESCE(SUM(LENGTH(content)), 0) FROM records",
            [],
            |row| row.get(0),
        )?;
        Ok(total as u64)
    }

    fn status_breakdown(&self) -> StorageResult<Vec<(Option<u16>, u64)>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT status_code, COUNT(*) AS count FROM records
             GROUP BY status_code ORDER BY count DESC, status_code ASC",
        )?;

        let rows = stmt
            .query_map([], |row| {
                Ok((row.get::<_, Option<u16>>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }
}
