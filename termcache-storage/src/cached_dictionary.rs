//! The cache-accelerated dictionary facade.

use std::sync::{Arc, Mutex};

use termcache_core::{
    CacheError, CacheOptions, CacheResult, DictInfo, DictInfoOptions, DictionarySource,
    FixedTermRef, Items, Match, MatchOptions, RefTermOptions,
};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::cache::dict_infos::{DictInfoCache, DictInfoLookup, DictInfoQuery, Selection};
use crate::cache::dispatch::{await_outcome, deferred};
use crate::cache::fixed_terms::{FixedTermCache, PreloadLookup};
use crate::cache::idle_timer::IdleTimer;
use crate::cache::match_objects::{MatchLookup, MatchObjectCache};
use crate::cache::ref_terms::{RefTermCache, RefTermLookup};
use crate::cache::{lock, CacheSnapshot, CacheStats, CacheStatsSnapshot};

/// A [`DictionarySource`] wrapped in a transparent cache.
///
/// Offers the source's lookups with the same results and errors, while:
///
/// - issuing at most one backing query per distinct in-flight request,
///   sharing its outcome with every caller that asked meanwhile;
/// - memoizing string lookups under a size cap (LRU) and a maximum age;
/// - predicting empty results for extensions of strings that matched nothing;
/// - serving refTerm and dictinfo requests from locally held collections.
///
/// Every operation completes asynchronously, cache hit or not. Backing
/// queries run as spawned tasks, so the handle must be used inside a tokio
/// runtime; a caller dropping its future never strands the other callers
/// waiting on the same query.
///
/// Handles are cheap to clone and share one cache.
///
/// # Example
///
/// ```ignore
/// let dict = CachedDictionary::new(source, CacheOptions::new().with_max_items(1000));
/// let first = dict.get_matches_for_string("a", &MatchOptions::new()).await?;
/// let again = dict.get_matches_for_string("a", &MatchOptions::new()).await?; // no query
/// ```
pub struct CachedDictionary<S: DictionarySource> {
    inner: Arc<Inner<S>>,
}

impl<S: DictionarySource> Clone for CachedDictionary<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<S: DictionarySource> {
    source: S,
    options: CacheOptions,
    matches: Mutex<MatchObjectCache<S::Error>>,
    ref_terms: Mutex<RefTermCache<S::Error>>,
    dict_infos: Mutex<DictInfoCache<S::Error>>,
    fixed_terms: Mutex<FixedTermCache<S::Error>>,
    idle_timer: Mutex<IdleTimer>,
    stats: CacheStats,
}

impl<S: DictionarySource> Inner<S> {
    fn clear(&self) {
        lock(&self.matches).clear();
        lock(&self.ref_terms).clear();
        lock(&self.dict_infos).clear();
        lock(&self.fixed_terms).clear();
        CacheStats::bump(&self.stats.clears);
    }

    fn record_query(&self) {
        CacheStats::bump(&self.stats.queries);
    }

    fn note_failure<T>(&self, query: &'static str, outcome: &Result<T, S::Error>) {
        if let Err(err) = outcome {
            CacheStats::bump(&self.stats.query_failures);
            warn!(query, error = %err, "Backing query failed");
        }
    }
}

impl<S: DictionarySource> CachedDictionary<S> {
    pub fn new(source: S, options: CacheOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                matches: Mutex::new(MatchObjectCache::new(&options)),
                ref_terms: Mutex::new(RefTermCache::new()),
                dict_infos: Mutex::new(DictInfoCache::new()),
                fixed_terms: Mutex::new(FixedTermCache::new()),
                idle_timer: Mutex::new(IdleTimer::new()),
                stats: CacheStats::new(),
                source,
                options,
            }),
        }
    }

    /// The wrapped source.
    pub fn source(&self) -> &S {
        &self.inner.source
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// Activity counters since construction.
    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner.stats.snapshot()
    }

    /// What every subsystem currently holds.
    pub fn snapshot(&self) -> CacheSnapshot {
        let (match_entries, match_queries_in_flight, empty_prefixes) = {
            let matches = lock(&self.inner.matches);
            (matches.entry_count(), matches.in_flight(), matches.empty_prefixes())
        };
        let ref_terms = lock(&self.inner.ref_terms).status();
        let dict_infos = lock(&self.inner.dict_infos);
        let fixed_terms = lock(&self.inner.fixed_terms);
        CacheSnapshot {
            match_entries,
            match_queries_in_flight,
            empty_prefixes,
            ref_terms,
            dict_infos: dict_infos.found_count(),
            dict_info_tombstones: dict_infos.tombstone_count(),
            dict_info_ids_in_flight: dict_infos.queried_count(),
            dict_info_fetch_all: dict_infos.got_all(),
            dict_info_waiting: dict_infos.waiting(),
            fixed_terms_in_flight: fixed_terms.in_flight(),
            fixed_terms_missing: fixed_terms.missing(),
            fixed_term_waiting: fixed_terms.waiting(),
        }
    }

    /// Resets every subsystem to empty.
    ///
    /// Requests already waiting on a query keep waiting and receive its
    /// outcome, and that outcome is stored as usual when it lands. The
    /// source's own fixed-terms cache is left alone.
    pub fn clear_cache(&self) {
        self.inner.clear();
        info!("Cache cleared");
    }

    // ========================================================================
    // MATCH OBJECTS
    // ========================================================================

    /// Matches for a search string, memoized per string and options.
    pub async fn get_matches_for_string(
        &self,
        s: &str,
        options: &MatchOptions,
    ) -> CacheResult<Items<Match>, S::Error> {
        self.restart_idle_timer();

        let key = options.cache_key_for(s);
        let options_key = options.cache_key();
        let (lookup, expired) =
            lock(&self.inner.matches).lookup(&key, s, &options_key, Instant::now());
        if expired {
            CacheStats::bump(&self.inner.stats.expirations);
        }

        match lookup {
            MatchLookup::Hit(items) => {
                CacheStats::bump(&self.inner.stats.hits);
                debug!(str = %s, count = items.len(), "Match cache hit");
                deferred(Ok(items)).await
            }
            MatchLookup::PredictedEmpty => {
                CacheStats::bump(&self.inner.stats.predicted_empty);
                debug!(str = %s, "Match result predicted empty");
                deferred(Ok(Items::empty())).await
            }
            MatchLookup::Joined(pending) => {
                CacheStats::bump(&self.inner.stats.coalesced);
                debug!(str = %s, "Joined in-flight match query");
                await_outcome(pending).await
            }
            MatchLookup::Launch(pending) => {
                CacheStats::bump(&self.inner.stats.misses);
                self.spawn_match_query(key, s.to_string(), options.clone(), options_key);
                await_outcome(pending).await
            }
        }
    }

    fn spawn_match_query(&self, key: String, s: String, options: MatchOptions, options_key: String) {
        let inner = Arc::clone(&self.inner);
        inner.record_query();
        debug!(str = %s, "Launching match query");

        tokio::spawn(async move {
            let outcome = inner.source.query_matches(&s, &options).await;
            inner.note_failure("matches", &outcome);
            let done = lock(&inner.matches).complete(&key, &s, &options_key, outcome, Instant::now());
            if let Some(evicted) = done.evicted {
                CacheStats::bump(&inner.stats.evictions);
                debug!(key = %evicted, "Evicted least recently used match entry");
            }
            debug!(str = %s, resolved = done.resolved, "Match query completed");
        });
    }

    /// Entry matches for a search string. Shares empty-prefix prediction with
    /// [`get_matches_for_string`](Self::get_matches_for_string) but is not
    /// memoized.
    pub async fn get_entry_matches_for_string(
        &self,
        s: &str,
        options: &MatchOptions,
    ) -> CacheResult<Items<Match>, S::Error> {
        let options_key = options.cache_key();
        let predicted = lock(&self.inner.matches).predicts_empty(s, &options_key);
        if predicted {
            CacheStats::bump(&self.inner.stats.predicted_empty);
            debug!(str = %s, "Entry match result predicted empty");
            return deferred(Ok(Items::empty())).await;
        }

        CacheStats::bump(&self.inner.stats.misses);
        self.inner.record_query();
        let outcome = self.inner.source.query_entry_matches(s, options).await;
        self.inner.note_failure("entry matches", &outcome);
        lock(&self.inner.matches).note_outcome(s, &options_key, &outcome);
        deferred(outcome.map_err(CacheError::Query)).await
    }

    fn restart_idle_timer(&self) {
        if !self.inner.options.expires() {
            return;
        }
        let weak = Arc::downgrade(&self.inner);
        lock(&self.inner.idle_timer).restart(self.inner.options.max_age, async move {
            if let Some(inner) = weak.upgrade() {
                inner.clear();
                info!("Idle timeout cleared the cache");
            }
        });
    }

    // ========================================================================
    // REFTERMS
    // ========================================================================

    /// RefTerms selected from the full collection, which is fetched once.
    pub async fn get_ref_terms(
        &self,
        options: &RefTermOptions,
    ) -> CacheResult<Items<String>, S::Error> {
        let lookup = lock(&self.inner.ref_terms).request(options);
        match lookup {
            RefTermLookup::Ready(items) => {
                CacheStats::bump(&self.inner.stats.hits);
                deferred(Ok(items)).await
            }
            RefTermLookup::Wait { pending, launch } => {
                if launch {
                    CacheStats::bump(&self.inner.stats.misses);
                    self.spawn_ref_term_fill();
                } else {
                    CacheStats::bump(&self.inner.stats.coalesced);
                }
                await_outcome(pending).await
            }
        }
    }

    fn spawn_ref_term_fill(&self) {
        let inner = Arc::clone(&self.inner);
        inner.record_query();
        debug!("Filling refTerm cache");

        tokio::spawn(async move {
            let outcome = inner.source.query_ref_terms(&RefTermOptions::default()).await;
            inner.note_failure("refTerms", &outcome);
            let resolved = lock(&inner.ref_terms).complete(outcome);
            debug!(resolved, "RefTerm fill completed");
        });
    }

    // ========================================================================
    // DICTINFOS
    // ========================================================================

    /// Dictionary metadata, selected by id list, by other filters, or all.
    ///
    /// Id and fetch-all requests are answered from cached records where
    /// possible. Requests with other filters go to the source unchanged; the
    /// records they return are cached.
    pub async fn get_dict_infos(
        &self,
        options: &DictInfoOptions,
    ) -> CacheResult<Items<DictInfo>, S::Error> {
        let selection = Selection::of(options);
        if selection == Selection::Passthrough {
            return self.passthrough_dict_infos(options).await;
        }

        let lookup = {
            let mut cache = lock(&self.inner.dict_infos);
            match selection {
                Selection::Ids(ids) => cache.request_ids(ids, options),
                _ => cache.request_all(options),
            }
        };

        match lookup {
            DictInfoLookup::Ready(items) => {
                CacheStats::bump(&self.inner.stats.hits);
                deferred(Ok(items)).await
            }
            DictInfoLookup::Wait { pending, query } => {
                match query {
                    Some(query) => {
                        CacheStats::bump(&self.inner.stats.misses);
                        self.spawn_dict_info_query(query);
                    }
                    None => CacheStats::bump(&self.inner.stats.coalesced),
                }
                await_outcome(pending).await
            }
        }
    }

    async fn passthrough_dict_infos(
        &self,
        options: &DictInfoOptions,
    ) -> CacheResult<Items<DictInfo>, S::Error> {
        CacheStats::bump(&self.inner.stats.misses);
        self.inner.record_query();
        debug!("Passing filtered dictInfo query to source");

        let outcome = self.inner.source.query_dict_infos(options).await;
        self.inner.note_failure("dictInfos", &outcome);
        if let Ok(items) = &outcome {
            lock(&self.inner.dict_infos).store(&items.items);
        }
        deferred(outcome.map_err(CacheError::Query)).await
    }

    fn spawn_dict_info_query(&self, query: DictInfoQuery) {
        let inner = Arc::clone(&self.inner);
        inner.record_query();
        debug!(?query, "Launching dictInfo query");

        tokio::spawn(async move {
            let outcome = inner.source.query_dict_infos(&query.options()).await;
            inner.note_failure("dictInfos", &outcome);
            let answered = lock(&inner.dict_infos).complete(&query, outcome);
            debug!(?query, answered, "DictInfo query completed");
        });
    }

    // ========================================================================
    // FIXED TERMS
    // ========================================================================

    /// Preloads fixed terms into the source's own cache, requesting each
    /// reference at most once. References the source already holds, or that
    /// an earlier preload could not resolve, are skipped.
    pub async fn load_fixed_terms(
        &self,
        items: &[FixedTermRef],
        options: &MatchOptions,
    ) -> CacheResult<(), S::Error> {
        let source = &self.inner.source;
        let lookup = lock(&self.inner.fixed_terms).request(items, |item| source.has_preloaded(item));

        match lookup {
            PreloadLookup::Ready => {
                CacheStats::bump(&self.inner.stats.hits);
                deferred(Ok(())).await
            }
            PreloadLookup::Wait { pending, query } => {
                match query {
                    Some(query) => {
                        CacheStats::bump(&self.inner.stats.misses);
                        self.spawn_preload(query, options.clone());
                    }
                    None => CacheStats::bump(&self.inner.stats.coalesced),
                }
                await_outcome(pending).await
            }
        }
    }

    fn spawn_preload(&self, items: Vec<FixedTermRef>, options: MatchOptions) {
        let inner = Arc::clone(&self.inner);
        inner.record_query();
        debug!(count = items.len(), "Launching fixed-term preload");

        tokio::spawn(async move {
            let outcome = inner.source.query_preload(&items, &options).await;
            inner.note_failure("preload", &outcome);
            let source = &inner.source;
            let answered = lock(&inner.fixed_terms).complete(&items, outcome, |item| {
                source.has_preloaded(item)
            });
            debug!(answered, "Fixed-term preload completed");
        });
    }
}
