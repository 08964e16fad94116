//! Cache subsystems and the substrate they share.
//!
//! Four subsystems, each with its own consistency rules:
//!
//! - [`match_objects`]: memoized string lookups with coalescing of identical
//!   concurrent calls, LRU eviction, TTL expiry and empty-prefix prediction.
//! - [`ref_terms`]: one lazily filled collection, filtered per request.
//! - [`dict_infos`]: per-id metadata records with tombstones, where fetch-all
//!   and fetch-by-id requests observe each other's in-flight progress.
//! - [`fixed_terms`]: deduplication of bulk preloads against a resolved-items
//!   cache owned by the source.
//!
//! # Design
//!
//! Each subsystem is a plain state machine. Callers take its lock, perform a
//! synchronous transition and release the lock before any await. Transitions
//! return what must happen next (answer now, wait on a channel, launch a
//! query); the facade carries that out. Completions travel over oneshot
//! channels, so resolving a waiter never runs its continuation inline.

pub mod dict_infos;
pub mod dispatch;
pub mod empties;
pub mod eviction;
pub mod fixed_terms;
pub mod idle_timer;
pub mod match_objects;
pub mod ref_terms;
pub mod stats;

pub use dict_infos::GotAllState;
pub use ref_terms::RefTermStatus;
pub use stats::{CacheSnapshot, CacheStats, CacheStatsSnapshot};

use std::sync::{Mutex, MutexGuard, PoisonError};

/// Locks a subsystem. State transitions never panic halfway, so a poisoned
/// lock still guards consistent state.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}
