//! The backing-source contract the cache layer wraps.

use async_trait::async_trait;
use std::fmt::{Debug, Display};

use crate::{DictInfo, DictInfoOptions, FixedTermRef, Items, Match, MatchOptions, RefTermOptions};

/// A latency-bearing term dictionary.
///
/// The cache layer composes with any implementer and forwards its errors
/// untouched, so `Error` must be cloneable: one failed query may be reported
/// to many coalesced callers.
///
/// # Implementation Requirements
///
/// - `query_ref_terms` returns the full collection already sorted.
/// - `query_dict_infos` treats an absent `filter` as "all dictionaries" and an
///   explicit `filter.id` as an id selection; it honours `page`, `per_page`
///   and `sort`.
/// - `query_preload` populates a resolved fixed-terms cache owned by the
///   source, which `has_preloaded` reads.
#[async_trait]
pub trait DictionarySource: Send + Sync + 'static {
    /// Opaque failure signal of a query.
    type Error: Clone + Debug + Display + Send + Sync + 'static;

    /// Full string lookup: entry matches plus any refTerm, number or fixed
    /// term matches the source adds.
    async fn query_matches(
        &self,
        s: &str,
        options: &MatchOptions,
    ) -> Result<Items<Match>, Self::Error>;

    /// Lookup restricted to dictionary entries.
    async fn query_entry_matches(
        &self,
        s: &str,
        options: &MatchOptions,
    ) -> Result<Items<Match>, Self::Error>;

    /// Reference terms, filtered and paginated per `options`.
    async fn query_ref_terms(&self, options: &RefTermOptions)
        -> Result<Items<String>, Self::Error>;

    /// Dictionary metadata records.
    async fn query_dict_infos(
        &self,
        options: &DictInfoOptions,
    ) -> Result<Items<DictInfo>, Self::Error>;

    /// Bulk-load fixed terms into the source's own resolved-items cache.
    async fn query_preload(
        &self,
        items: &[FixedTermRef],
        options: &MatchOptions,
    ) -> Result<(), Self::Error>;

    /// Whether the source's resolved-items cache holds `item`.
    fn has_preloaded(&self, item: &FixedTermRef) -> bool;
}
