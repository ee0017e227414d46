//! Output module for run summaries and store statistics
//!
//! Everything here is informational and written to stdout; diagnostics for
//! individual URLs go through `tracing` instead.

pub mod stats;

pub use stats::{
    format_bytes, load_statistics, print_run_summary, print_statistics, StoreStatistics,
};
