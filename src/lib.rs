//! Sumi-Harvest: a bulk URL fetcher with a durable local store
//!
//! This crate reads a list of URLs, fetches each one with bounded concurrency and
//! persists every body into SQLite, skipping URLs that are already stored and
//! retrying failed saves with a configurable delay.

pub mod config;
pub mod harvest;
pub mod output;
pub mod storage;

use thiserror::Error;

/// Main error type for Sumi-Harvest operations
///
/// Only setup failures surface through this type. Errors for a single URL are
/// contained inside the worker that processed it and reported as an
/// [`harvest::Outcome`].
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Failed to open input {path}: {source}")]
    Input {
        path: String,
        source: std::io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Worker task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Sumi-Harvest operations
pub type Result<T> = std::result::Result<T, HarvestError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::Config;
pub use harvest::{Dispatcher, HarvestContext, Outcome, RunSummary};
pub use storage::{SqliteStorage, Storage};
