//! Match-object cache: memoized string lookups.
//!
//! Keys combine the search string with its normalized options. Identical
//! concurrent lookups share one backing query; results are stored on success
//! only, so a failure is reported to every joined caller and the next lookup
//! tries again.

use std::collections::HashMap;

use termcache_core::{CacheOptions, Items, Match};
use tokio::time::{Duration, Instant};
use tracing::debug;

use super::dispatch::{self, Completion, Pending};
use super::empties::EmptyPrefixIndex;
use super::eviction::{evict_oldest, CacheEntry};

/// Outcome of looking a key up.
#[derive(Debug)]
pub enum MatchLookup<E> {
    /// A fresh entry; its access time has been refreshed.
    Hit(Items<Match>),
    /// A query for this key is in flight; the caller was queued behind it.
    Joined(Pending<Items<Match>, E>),
    /// A shorter string under the same options yielded nothing.
    PredictedEmpty,
    /// Nothing usable; the caller is queued and must launch the query.
    Launch(Pending<Items<Match>, E>),
}

/// Bookkeeping changes made while storing a completed query.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct MatchCompletion {
    pub resolved: usize,
    pub evicted: Option<String>,
}

#[derive(Debug)]
pub struct MatchObjectCache<E> {
    entries: HashMap<String, CacheEntry<Items<Match>>>,
    waiters: HashMap<String, Vec<Completion<Items<Match>, E>>>,
    empties: EmptyPrefixIndex,
    capacity: Option<usize>,
    max_age: Duration,
    predict_empties: bool,
    next_seq: u64,
}

impl<E: Clone> MatchObjectCache<E> {
    pub fn new(options: &CacheOptions) -> Self {
        Self {
            entries: HashMap::new(),
            waiters: HashMap::new(),
            empties: EmptyPrefixIndex::new(),
            capacity: options.is_bounded().then_some(options.max_items),
            max_age: options.max_age,
            predict_empties: options.predict_empties,
            next_seq: 0,
        }
    }

    fn stamp(&mut self) -> u64 {
        self.next_seq += 1;
        self.next_seq
    }

    /// Resolves a lookup of `s` under `options_key`, stored at `key`.
    ///
    /// Returns the lookup and whether a stale entry was dropped on the way.
    pub fn lookup(
        &mut self,
        key: &str,
        s: &str,
        options_key: &str,
        now: Instant,
    ) -> (MatchLookup<E>, bool) {
        let mut expired = false;
        if let Some(entry) = self.entries.get(key) {
            if entry.is_expired(now, self.max_age) {
                self.entries.remove(key);
                expired = true;
                debug!(key = %key, "Match entry expired");
            } else {
                let seq = self.stamp();
                if let Some(entry) = self.entries.get_mut(key) {
                    entry.touch(now, seq);
                    return (MatchLookup::Hit(entry.value().clone()), false);
                }
            }
        }

        if let Some(queue) = self.waiters.get_mut(key) {
            let (completion, pending) = dispatch::channel();
            queue.push(completion);
            return (MatchLookup::Joined(pending), expired);
        }

        if self.predicts_empty(s, options_key) {
            return (MatchLookup::PredictedEmpty, expired);
        }

        let (completion, pending) = dispatch::channel();
        self.waiters.insert(key.to_string(), vec![completion]);
        (MatchLookup::Launch(pending), expired)
    }

    /// Whether prediction is enabled and answers `s` empty.
    pub fn predicts_empty(&self, s: &str, options_key: &str) -> bool {
        self.predict_empties && self.empties.predicts_empty(options_key, s)
    }

    /// Records `s` as yielding nothing if `outcome` is an empty success.
    pub fn note_outcome(&mut self, s: &str, options_key: &str, outcome: &Result<Items<Match>, E>) {
        if self.predict_empties && matches!(outcome, Ok(items) if items.is_empty()) {
            self.empties.record(options_key, s);
        }
    }

    /// Stores a finished query and answers everyone queued on `key`.
    pub fn complete(
        &mut self,
        key: &str,
        s: &str,
        options_key: &str,
        outcome: Result<Items<Match>, E>,
        now: Instant,
    ) -> MatchCompletion {
        let mut result = MatchCompletion::default();

        self.note_outcome(s, options_key, &outcome);
        if let Ok(items) = &outcome {
            let seq = self.stamp();
            self.entries
                .insert(key.to_string(), CacheEntry::new(items.clone(), now, seq));
            if self.capacity.is_some_and(|cap| self.entries.len() > cap) {
                result.evicted = evict_oldest(&mut self.entries).map(|(evicted, _)| evicted);
            }
        }

        let queue = self.waiters.remove(key).unwrap_or_default();
        result.resolved = dispatch::resolve_all(queue, &outcome);
        result
    }

    /// Drops stored results and prediction state. Queued callers are kept and
    /// still receive their query's outcome.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.empties.clear();
    }

    pub fn entry_count(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn in_flight(&self) -> usize {
        self.waiters.len()
    }

    pub fn empty_prefixes(&self) -> usize {
        self.empties.len()
    }
}
