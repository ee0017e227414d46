//! Storage module for persisting fetched content
//!
//! This module handles all database operations for the harvester, including:
//! - SQLite database initialization and schema management
//! - Existence checks used to skip already-stored URLs
//! - Transactional inserts of fetched bodies
//! - Statistics queries for reporting

mod schema;
mod sqlite;
mod traits;

pub use schema::SCHEMA_VERSION;
pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::HarvestError;
use std::path::Path;

/// Initializes or opens a storage database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
///
/// # Returns
///
/// * `Ok(SqliteStorage)` - Successfully initialized storage
/// * `Err(HarvestError)` - Failed to initialize storage
pub fn open_storage(path: &Path) -> Result<SqliteStorage, HarvestError> {
    SqliteStorage::new(path)
}

/// A persisted `(url, content)` pair with its fetch metadata
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    pub url: String,
    pub content: Vec<u8>,
    pub status_code: Option<u16>,
    pub content_type: Option<String>,
    pub fetched_at: String,
}

impl Record {
    /// Returns the body as text, replacing invalid UTF-8 sequences
    pub fn content_lossy(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.content)
    }
}
