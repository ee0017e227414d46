//! Per-URL outcomes and run-wide counters

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

/// Terminal result of processing one URL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    // ===== Success =====
    /// Fetched and committed to the store
    Saved,

    // ===== Skips =====
    /// Already present in the store; nothing fetched
    Skipped,

    /// Existence check failed and the policy says to leave the URL alone
    Deferred,

    /// Another worker stored the same URL between our check and our save
    Duplicate,

    // ===== Failures =====
    /// Network or HTTP failure; the URL is abandoned for this run
    FetchFailed,

    /// Save failed on every allowed attempt
    SaveFailed,
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Saved)
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, Self::Skipped | Self::Deferred | Self::Duplicate)
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Self::FetchFailed | Self::SaveFailed)
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Saved => "saved",
            Self::Skipped => "skipped",
            Self::Deferred => "deferred",
            Self::Duplicate => "duplicate",
            Self::FetchFailed => "fetch_failed",
            Self::SaveFailed => "save_failed",
        };
        write!(f, "{}", s)
    }
}

/// Lock-free counters shared by the feeder and every worker of one run
#[derive(Debug, Default)]
pub struct HarvestCounters {
    enqueued: AtomicU64,
    invalid: AtomicU64,
    saved: AtomicU64,
    skipped: AtomicU64,
    deferred: AtomicU64,
    duplicates: AtomicU64,
    fetch_failed: AtomicU64,
    save_failed: AtomicU64,
    exists_check_failed: AtomicU64,
    in_flight: AtomicUsize,
    peak_in_flight: AtomicUsize,
}

impl HarvestCounters {
    pub fn record_enqueued(&self) {
        self.enqueued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid(&self) {
        self.invalid.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_exists_check_failed(&self) {
        self.exists_check_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record(&self, outcome: Outcome) {
        let counter = match outcome {
            Outcome::Saved => &self.saved,
            Outcome::Skipped => &self.skipped,
            Outcome::Deferred => &self.deferred,
            Outcome::Duplicate => &self.duplicates,
            Outcome::FetchFailed => &self.fetch_failed,
            Outcome::SaveFailed => &self.save_failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Marks one URL as in flight until the returned guard is dropped
    pub fn enter(&self) -> InFlightGuard<'_> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak_in_flight.fetch_max(now, Ordering::SeqCst);
        InFlightGuard { counters: self }
    }

    /// Current number of in-flight URLs
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Takes a point-in-time copy of every counter
    pub fn summary(&self, elapsed: Duration) -> RunSummary {
        RunSummary {
            enqueued: self.enqueued.load(Ordering::Relaxed),
            invalid: self.invalid.load(Ordering::Relaxed),
            saved: self.saved.load(Ordering::Relaxed),
            skipped: self.skipped.load(Ordering::Relaxed),
            deferred: self.deferred.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            fetch_failed: self.fetch_failed.load(Ordering::Relaxed),
            save_failed: self.save_failed.load(Ordering::Relaxed),
            exists_check_failed: self.exists_check_failed.load(Ordering::Relaxed),
            peak_in_flight: self.peak_in_flight.load(Ordering::SeqCst),
            elapsed,
        }
    }
}

/// Decrements the in-flight count on drop
pub struct InFlightGuard<'a> {
    counters: &'a HarvestCounters,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.counters.in_flight.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// URLs handed to workers
    pub enqueued: u64,

    /// Input lines rejected before enqueue
    pub invalid: u64,

    pub saved: u64,
    pub skipped: u64,
    pub deferred: u64,
    pub duplicates: u64,
    pub fetch_failed: u64,
    pub save_failed: u64,

    /// Existence checks that errored (the URL may still have been processed)
    pub exists_check_failed: u64,

    /// Highest number of URLs in flight at once
    pub peak_in_flight: usize,

    pub elapsed: Duration,
}

impl RunSummary {
    /// Number of URLs that reached a terminal outcome
    pub fn processed(&self) -> u64 {
        self.saved
            + self.skipped
            + self.deferred
            + self.duplicates
            + self.fetch_failed
            + self.save_failed
    }

    /// Number of URLs that ended in an error
    pub fn failed(&self) -> u64 {
        self.fetch_failed + self.save_failed
    }
}
