//! termcache Test Utilities
//!
//! Shared test infrastructure for the termcache workspace:
//! - An in-memory [`MockDictionary`] with simulated latency, error injection
//!   and per-operation call recording
//! - Test fixtures with a small, fixed data set
//! - Proptest generators
//! - Async helpers for driving a paused tokio clock

// Re-export core types for convenience
pub use termcache_core::{
    CacheError, CacheOptions, CacheResult, DictInfo, DictInfoOptions, DictInfoSort,
    DictionarySource, FixedTermRef, Items, Match, MatchOptions, MatchType, RefTermOptions,
};

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use termcache_core::paginate;
use thiserror::Error;

// ============================================================================
// MOCK DICTIONARY
// ============================================================================

/// Failure reported by [`MockDictionary`] when an error was injected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("mock query failed: {0}")]
pub struct MockError(pub String);

/// The backing operations, for call counting and error injection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MockOp {
    Matches,
    EntryMatches,
    RefTerms,
    DictInfos,
    Preload,
}

/// One dictionary entry: a concept id with its terms, the first preferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MockEntry {
    pub id: String,
    pub dict_id: String,
    pub terms: Vec<String>,
}

impl MockEntry {
    pub fn new(id: &str, dict_id: &str, terms: &[&str]) -> Self {
        Self {
            id: id.to_string(),
            dict_id: dict_id.to_string(),
            terms: terms.iter().map(|t| t.to_string()).collect(),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    calls: HashMap<MockOp, usize>,
    fail_next: HashSet<MockOp>,
    delay_next: HashMap<MockOp, Duration>,
    dict_info_queries: Vec<DictInfoOptions>,
    preload_queries: Vec<Vec<FixedTermRef>>,
    match_queries: Vec<String>,
    fixed_terms: HashMap<String, Match>,
}

/// In-memory dictionary source.
///
/// Every query sleeps for the configured latency on the tokio clock, so tests
/// with a paused clock can reproduce exact concurrent timelines. Errors are
/// injected one call at a time with [`fail_next`](Self::fail_next).
#[derive(Debug)]
pub struct MockDictionary {
    dict_infos: Vec<DictInfo>,
    entries: Vec<MockEntry>,
    ref_terms: Vec<String>,
    delay: Duration,
    state: Mutex<MockState>,
}

impl MockDictionary {
    pub fn new(dict_infos: Vec<DictInfo>, entries: Vec<MockEntry>, ref_terms: Vec<String>) -> Self {
        let mut ref_terms = ref_terms;
        ref_terms.sort();
        Self {
            dict_infos,
            entries,
            ref_terms,
            delay: Duration::ZERO,
            state: Mutex::new(MockState::default()),
        }
    }

    /// The fixture data set with no latency.
    pub fn standard() -> Self {
        Self::new(fixtures::dict_infos(), fixtures::entries(), fixtures::ref_terms())
    }

    /// Sets the latency of every query.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Makes the next call of `op` fail.
    pub fn fail_next(&self, op: MockOp) {
        self.state().fail_next.insert(op);
    }

    /// Overrides the latency of the next call of `op`.
    pub fn delay_next(&self, op: MockOp, delay: Duration) {
        self.state().delay_next.insert(op, delay);
    }

    /// Number of calls of `op` so far.
    pub fn calls(&self, op: MockOp) -> usize {
        self.state().calls.get(&op).copied().unwrap_or(0)
    }

    /// Calls across all operations.
    pub fn total_calls(&self) -> usize {
        self.state().calls.values().sum()
    }

    pub fn reset_calls(&self) {
        let mut state = self.state();
        state.calls.clear();
        state.dict_info_queries.clear();
        state.preload_queries.clear();
        state.match_queries.clear();
    }

    /// Options of every dictinfo query, in call order.
    pub fn dict_info_queries(&self) -> Vec<DictInfoOptions> {
        self.state().dict_info_queries.clone()
    }

    /// Id lists of every by-id dictinfo query, in call order.
    pub fn dict_info_id_queries(&self) -> Vec<Vec<String>> {
        self.state()
            .dict_info_queries
            .iter()
            .filter_map(|o| o.ids().map(<[String]>::to_vec))
            .collect()
    }

    /// References of every preload query, in call order.
    pub fn preload_queries(&self) -> Vec<Vec<FixedTermRef>> {
        self.state().preload_queries.clone()
    }

    /// Search strings of every full match query, in call order.
    pub fn match_queries(&self) -> Vec<String> {
        self.state().match_queries.clone()
    }

    /// Size of the resolved fixed-terms cache.
    pub fn fixed_terms_len(&self) -> usize {
        self.state().fixed_terms.len()
    }

    /// Starts a call: records it and returns its latency and whether it fails.
    fn begin(&self, op: MockOp) -> (Duration, bool) {
        let mut state = self.state();
        *state.calls.entry(op).or_insert(0) += 1;
        let delay = state.delay_next.remove(&op).unwrap_or(self.delay);
        let fail = state.fail_next.remove(&op);
        (delay, fail)
    }

    async fn respond<T>(&self, op: MockOp, answer: impl FnOnce() -> T) -> Result<T, MockError> {
        let (delay, fail) = self.begin(op);
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        if fail {
            return Err(MockError("ERR".to_string()));
        }
        Ok(answer())
    }

    fn entry_matches(&self, s: &str, options: &MatchOptions) -> Vec<Match> {
        if s.is_empty() {
            return Vec::new();
        }
        let dict_ids = options.filter.as_ref().and_then(|f| f.dict_id.as_ref());
        let mut matches: Vec<Match> = self
            .entries
            .iter()
            .filter(|e| dict_ids.map_or(true, |ids| ids.contains(&e.dict_id)))
            .filter_map(|e| {
                let prefix = e.terms.iter().find(|t| t.starts_with(s));
                let (term, match_type) = match prefix {
                    Some(term) => (term, MatchType::Prefix),
                    None => (e.terms.iter().find(|t| t.contains(s))?, MatchType::Infix),
                };
                Some(Match {
                    id: e.id.clone(),
                    dict_id: e.dict_id.clone(),
                    str: term.clone(),
                    match_type,
                    descr: None,
                })
            })
            .collect();
        matches.sort_by(|a, b| {
            (a.match_type != MatchType::Prefix, &a.str, &a.id)
                .cmp(&(b.match_type != MatchType::Prefix, &b.str, &b.id))
        });
        paginate(matches, options.page, options.per_page)
    }

    fn ref_term_match(&self, s: &str) -> Option<Match> {
        self.ref_terms.iter().any(|t| t == s).then(|| Match {
            id: String::new(),
            dict_id: String::new(),
            str: s.to_string(),
            match_type: MatchType::RefTerm,
            descr: None,
        })
    }

    fn resolve_fixed_term(&self, item: &FixedTermRef) -> Option<Match> {
        let entry = self.entries.iter().find(|e| e.id == item.id)?;
        let term = match &item.str {
            Some(s) => entry.terms.iter().find(|t| *t == s)?,
            None => entry.terms.first()?,
        };
        Some(Match {
            id: entry.id.clone(),
            dict_id: entry.dict_id.clone(),
            str: term.clone(),
            match_type: MatchType::Fixed,
            descr: None,
        })
    }
}

#[async_trait]
impl DictionarySource for MockDictionary {
    type Error = MockError;

    async fn query_matches(&self, s: &str, options: &MatchOptions) -> Result<Items<Match>, MockError> {
        self.state().match_queries.push(s.to_string());
        self.respond(MockOp::Matches, || {
            let mut items: Vec<Match> = self.ref_term_match(s).into_iter().collect();
            items.extend(self.entry_matches(s, options));
            Items::new(items)
        })
        .await
    }

    async fn query_entry_matches(
        &self,
        s: &str,
        options: &MatchOptions,
    ) -> Result<Items<Match>, MockError> {
        self.respond(MockOp::EntryMatches, || Items::new(self.entry_matches(s, options)))
            .await
    }

    async fn query_ref_terms(&self, options: &RefTermOptions) -> Result<Items<String>, MockError> {
        self.respond(MockOp::RefTerms, || Items::new(options.select(&self.ref_terms)))
            .await
    }

    async fn query_dict_infos(&self, options: &DictInfoOptions) -> Result<Items<DictInfo>, MockError> {
        self.state().dict_info_queries.push(options.clone());
        self.respond(MockOp::DictInfos, || {
            let filter = options.filter.as_ref();
            let ids = filter.and_then(|f| f.id.as_ref());
            let names = filter.and_then(|f| f.name.as_ref());
            let selected = self
                .dict_infos
                .iter()
                .filter(|d| ids.map_or(true, |ids| ids.contains(&d.id)))
                .filter(|d| names.map_or(true, |names| names.contains(&d.name)))
                .cloned()
                .collect();
            Items::new(options.arrange(selected))
        })
        .await
    }

    async fn query_preload(&self, items: &[FixedTermRef], _options: &MatchOptions) -> Result<(), MockError> {
        self.state().preload_queries.push(items.to_vec());
        let resolved = self
            .respond(MockOp::Preload, || {
                items
                    .iter()
                    .filter_map(|item| Some((item.cache_key(), self.resolve_fixed_term(item)?)))
                    .collect::<Vec<_>>()
            })
            .await?;
        self.state().fixed_terms.extend(resolved);
        Ok(())
    }

    fn has_preloaded(&self, item: &FixedTermRef) -> bool {
        self.state().fixed_terms.contains_key(&item.cache_key())
    }
}

// ============================================================================
// TEST FIXTURES
// ============================================================================

pub mod fixtures {
    //! The fixed data set behind [`MockDictionary::standard`].

    use super::*;

    /// Dictionaries A to E. D and E have names that sort before their ids do.
    pub fn dict_infos() -> Vec<DictInfo> {
        vec![
            DictInfo::new("A", "Name 1"),
            DictInfo::new("B", "Name 2"),
            DictInfo::new("C", "Name 3"),
            DictInfo::new("D", "Name Z"),
            DictInfo::new("E", "Name Y"),
        ]
    }

    /// `"a"` prefix-matches two entries, `"ax"` matches nothing and `"c"`
    /// only infix-matches.
    pub fn entries() -> Vec<MockEntry> {
        vec![
            MockEntry::new("A:01", "A", &["a", "aaa"]),
            MockEntry::new("A:02", "A", &["ab"]),
            MockEntry::new("B:01", "B", &["bc"]),
            MockEntry::new("B:02", "B", &["bcd", "x"]),
        ]
    }

    pub fn ref_terms() -> Vec<String> {
        vec!["it".to_string(), "that".to_string(), "this".to_string()]
    }

    /// Fixed-term references, the last of which the source cannot resolve.
    pub fn fixed_terms() -> Vec<FixedTermRef> {
        vec![
            FixedTermRef::new("A:01"),
            FixedTermRef::new("A:02"),
            FixedTermRef::with_str("B:02", "x"),
            FixedTermRef::new("B:01"),
            FixedTermRef::new("x:99"),
        ]
    }

    pub fn all_dict_ids() -> Vec<String> {
        dict_infos().into_iter().map(|d| d.id).collect()
    }
}

// ============================================================================
// PROPTEST GENERATORS
// ============================================================================

pub mod generators {
    //! Proptest strategies for search strings and configurations.

    use super::*;
    use proptest::prelude::*;

    /// Short strings over a small alphabet, so that generated sequences
    /// revisit keys often.
    pub fn arb_search_string() -> impl Strategy<Value = String> {
        "[abcx]{0,3}"
    }

    pub fn arb_access_sequence() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(arb_search_string(), 1..40)
    }

    pub fn arb_cache_options() -> impl Strategy<Value = CacheOptions> {
        (0usize..6, any::<bool>()).prop_map(|(max_items, predict)| {
            CacheOptions::new()
                .with_max_items(max_items)
                .with_predict_empties(predict)
        })
    }
}

// ============================================================================
// ASYNC HELPERS
// ============================================================================

/// Lets every ready task run, without advancing a paused clock.
pub async fn settle() {
    for _ in 0..32 {
        tokio::task::yield_now().await;
    }
}

/// Installs a tracing subscriber honouring `RUST_LOG`, writing through the
/// test harness. Safe to call from every test.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Ids of dictinfo results, in result order.
pub fn dict_ids(items: &Items<DictInfo>) -> Vec<&str> {
    items.items.iter().map(|d| d.id.as_str()).collect()
}

/// Strings of match results, in result order.
pub fn match_strs(items: &Items<Match>) -> Vec<&str> {
    items.items.iter().map(|m| m.str.as_str()).collect()
}

// ============================================================================
// TESTS
// ============================================================================
