//! Counters and structural snapshots of the cache.

use std::sync::atomic::{AtomicU64, Ordering};

use super::dict_infos::GotAllState;
use super::ref_terms::RefTermStatus;

/// Activity counters, updated lock-free across all subsystems.
#[derive(Debug, Default)]
pub struct CacheStats {
    /// Lookups answered from cached state without waiting.
    pub hits: AtomicU64,
    /// Lookups that started a backing query.
    pub misses: AtomicU64,
    /// Lookups that joined a query already in flight.
    pub coalesced: AtomicU64,
    /// Backing queries issued, across all subsystems.
    pub queries: AtomicU64,
    /// Match lookups answered empty by prefix prediction.
    pub predicted_empty: AtomicU64,
    /// Backing queries that reported failure.
    pub query_failures: AtomicU64,
    /// Match entries removed by the size cap.
    pub evictions: AtomicU64,
    /// Match entries removed because they outlived the maximum age.
    pub expirations: AtomicU64,
    /// Whole-cache clears, explicit or idle-triggered.
    pub clears: AtomicU64,
}

impl CacheStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current snapshot of all counters.
    pub fn snapshot(&self) -> CacheStatsSnapshot {
        CacheStatsSnapshot {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            coalesced: self.coalesced.load(Ordering::Relaxed),
            queries: self.queries.load(Ordering::Relaxed),
            predicted_empty: self.predicted_empty.load(Ordering::Relaxed),
            query_failures: self.query_failures.load(Ordering::Relaxed),
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            clears: self.clears.load(Ordering::Relaxed),
        }
    }
}

/// Snapshot of activity counters at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStatsSnapshot {
    pub hits: u64,
    pub misses: u64,
    pub coalesced: u64,
    pub queries: u64,
    pub predicted_empty: u64,
    pub query_failures: u64,
    pub evictions: u64,
    pub expirations: u64,
    pub clears: u64,
}

impl CacheStatsSnapshot {
    /// Share of lookups that avoided a backing query (0.0 to 1.0). Coalesced
    /// and predicted lookups count as avoided.
    pub fn hit_rate(&self) -> f64 {
        let avoided = self.hits + self.coalesced + self.predicted_empty;
        let total = avoided + self.misses;
        if total == 0 {
            0.0
        } else {
            avoided as f64 / total as f64
        }
    }
}

/// What each subsystem currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSnapshot {
    /// Cached match-object results.
    pub match_entries: usize,
    /// Match-object keys with a query in flight.
    pub match_queries_in_flight: usize,
    /// Strings recorded as predicting empty results.
    pub empty_prefixes: usize,
    pub ref_terms: RefTermStatus,
    /// Dictinfo records known to exist.
    pub dict_infos: usize,
    /// Dictinfo ids known not to exist.
    pub dict_info_tombstones: usize,
    /// Dictinfo ids with a by-id query in flight.
    pub dict_info_ids_in_flight: usize,
    pub dict_info_fetch_all: GotAllState,
    /// Dictinfo requests waiting for a query.
    pub dict_info_waiting: usize,
    /// Fixed terms with a preload in flight.
    pub fixed_terms_in_flight: usize,
    /// Fixed terms a completed preload could not resolve.
    pub fixed_terms_missing: usize,
    /// Preload requests waiting for a query.
    pub fixed_term_waiting: usize,
}
