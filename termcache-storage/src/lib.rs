//! termcache Storage - Caching Layer
//!
//! Wraps any [`DictionarySource`] in a transparent cache that coalesces
//! concurrent identical requests, serves partial results while the rest is
//! still being fetched, and bounds memory through eviction and expiry.
//!
//! The coordination logic lives in [`cache`]; [`CachedDictionary`] is the
//! public facade exposing the source's operations cache-accelerated.

pub mod cache;
pub mod cached_dictionary;

pub use cache::{CacheSnapshot, CacheStats, CacheStatsSnapshot, GotAllState, RefTermStatus};
pub use cached_dictionary::CachedDictionary;

// Re-export core types for convenience
pub use termcache_core::{
    CacheError, CacheOptions, CacheResult, DictInfo, DictInfoOptions, DictInfoSort,
    DictionarySource, FixedTermRef, Items, Match, MatchOptions, MatchType, RefTermOptions,
};
