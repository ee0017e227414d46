//! Configuration module for Sumi-Harvest
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; a missing file section falls back to defaults.
//!
//! # Example
//!
//! ```no_run
//! use sumi_harvest::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("harvest.toml")).unwrap();
//! println!("Harvesting with concurrency {}", config.harvest.concurrency);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    default_concurrency, BackoffKind, Config, ExistsErrorPolicy, FetcherConfig, HarvestConfig,
    InputConfig, OutputConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
pub use validation::validate;
