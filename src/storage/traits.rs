//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::harvest::FetchedPage;
use crate::storage::Record;
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// A record for this URL is already stored
    #[error("Record already exists: {0}")]
    AlreadyExists(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StorageError {
    /// Returns true if repeating the same operation may succeed
    ///
    /// Duplicate keys and a poisoned lock are permanent; busy/locked databases
    /// and other SQLite errors are worth another attempt.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::AlreadyExists(_) | Self::LockPoisoned => false,
            Self::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => !matches!(
                err.code,
                ErrorCode::ConstraintViolation
                    | ErrorCode::ReadOnly
                    | ErrorCode::NotADatabase
                    | ErrorCode::TooBig
            ),
            Self::Sqlite(_) | Self::Database(_) => true,
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// One handle is shared by every worker, so all methods take `&self` and
/// implementations serialize access internally.
pub trait Storage: Send + Sync {
    // ===== Gateway =====

    /// Checks whether a record for `url` is stored
    ///
    /// A failed query is returned as `Err`, never as `Ok(false)`.
    fn exists(&self, url: &str) -> StorageResult<bool>;

    /// Inserts a record for a fetched page inside a single transaction
    ///
    /// # Returns
    ///
    /// * `Ok(())` - The record was committed
    /// * `Err(StorageError::AlreadyExists)` - The URL is already stored
    /// * `Err(_)` - The transaction was rolled back
    fn save(&self, page: &FetchedPage) -> StorageResult<()>;

    // ===== Queries =====

    /// Gets a stored record by URL
    fn get_record(&self, url: &str) -> StorageResult<Option<Record>>;

    // ===== Statistics =====

    /// Counts stored records
    fn count_records(&self) -> StorageResult<u64>;

    /// Sums the size of all stored bodies in bytes
    fn total_content_bytes(&self) -> StorageResult<u64>;

    /// Gets record counts grouped by HTTP status code
    fn status_breakdown(&self) -> StorageResult<Vec<(Option<u16>, u64)>>;
}
