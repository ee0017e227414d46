//! Statistics reporting for runs and for the store
//!
//! This module provides functionality for printing the totals of a finished
//! run and for extracting and displaying statistics from the storage layer.

use crate::harvest::RunSummary;
use crate::storage::Storage;
use crate::HarvestError;

/// Store statistics summary
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreStatistics {
    /// Total number of stored records
    pub total_records: u64,

    /// Sum of all body sizes in bytes
    pub total_bytes: u64,

    /// Record counts by HTTP status code, most common first
    pub by_status: Vec<(Option<u16>, u64)>,
}

/// Loads statistics from storage
///
/// # Arguments
///
/// * `storage` - The storage backend to query
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(HarvestError)` - Failed to query statistics
pub fn load_statistics(storage: &dyn Storage) -> Result<StoreStatistics, HarvestError> {
    Ok(StoreStatistics {
        total_records: storage.count_records()?,
        total_bytes: storage.total_content_bytes()?,
        by_status: storage.status_breakdown()?,
    })
}

/// Prints store statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    println!("=== Store Statistics ===\n");

    println!("Overview:");
    println!("  Records stored: {}", stats.total_records);
    println!("  Content size: {}", format_bytes(stats.total_bytes));
    println!();

    if !stats.by_status.is_empty() {
        println!("Records by Status:");
        for (status, count) in &stats.by_status {
            let percentage = if stats.total_records > 0 {
                (*count as f64 / stats.total_records as f64) * 100.0
            } else {
                0.0
            };
            let label = status
                .map(|s| s.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            println!("  {}: {} ({:.1}%)", label, count, percentage);
        }
    }
}

/// Prints the totals of a finished run to stdout
pub fn print_run_summary(summary: &RunSummary) {
    println!("=== Harvest Summary ===\n");

    println!("Input:");
    println!("  URLs enqueued: {}", summary.enqueued);
    println!("  Invalid lines: {}", summary.invalid);
    println!();

    println!("Outcomes:");
    println!("  Saved: {}", summary.saved);
    println!("  Skipped (already stored): {}", summary.skipped);
    println!("  Duplicates: {}", summary.duplicates);
    if summary.deferred > 0 {
        println!("  Deferred: {}", summary.deferred);
    }
    println!("  Fetch failures: {}", summary.fetch_failed);
    println!("  Save failures: {}", summary.save_failed);
    if summary.exists_check_failed > 0 {
        println!("  Existence check errors: {}", summary.exists_check_failed);
    }
    println!();

    let rate = if summary.elapsed.as_secs_f64() > 0.0 {
        summary.processed() as f64 / summary.elapsed.as_secs_f64()
    } else {
        0.0
    };
    println!(
        "Completed {} URLs in {:.2?} ({:.2} URLs/sec, peak {} in flight)",
        summary.processed(),
        summary.elapsed,
        rate,
        summary.peak_in_flight
    );
}

/// Formats a byte count with a binary unit suffix
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KiB", "MiB", "GiB", "TiB"];

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    if unit == 0 {
        format!("{} B", bytes)
    } else {
        format!("{:.1} {}", value, UNITS[unit])
    }
}
