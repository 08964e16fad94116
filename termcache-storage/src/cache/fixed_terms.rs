//! Fixed-term preload deduplication.
//!
//! The source owns the cache of resolved fixed terms; this layer only tracks
//! which references are being loaded right now and which a completed load
//! could not resolve, so that each reference is requested from the source at
//! most once.

use std::collections::{HashMap, HashSet};

use termcache_core::FixedTermRef;

use super::dispatch::{self, Completion, Pending};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FixedTermMark {
    InFlight,
    /// A completed preload did not resolve it.
    Missing,
}

#[derive(Debug)]
struct PendingPreload<E> {
    awaited: HashSet<String>,
    completion: Completion<(), E>,
}

#[derive(Debug)]
pub enum PreloadLookup<E> {
    /// Every reference is already resolved or known missing.
    Ready,
    Wait {
        pending: Pending<(), E>,
        /// References the caller must preload now.
        query: Option<Vec<FixedTermRef>>,
    },
}

#[derive(Debug)]
pub struct FixedTermCache<E> {
    marks: HashMap<String, FixedTermMark>,
    pending: Vec<PendingPreload<E>>,
}

impl<E: Clone> Default for FixedTermCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> FixedTermCache<E> {
    pub fn new() -> Self {
        Self {
            marks: HashMap::new(),
            pending: Vec::new(),
        }
    }

    /// Partitions `items` into those to drop, await and query. `is_loaded`
    /// consults the source's resolved-items cache.
    pub fn request<F>(&mut self, items: &[FixedTermRef], is_loaded: F) -> PreloadLookup<E>
    where
        F: Fn(&FixedTermRef) -> bool,
    {
        let mut seen = HashSet::new();
        let mut awaited = HashSet::new();
        let mut fresh = Vec::new();

        for item in items {
            let key = item.cache_key();
            if !seen.insert(key.clone()) || is_loaded(item) {
                continue;
            }
            match self.marks.get(&key) {
                Some(FixedTermMark::Missing) => {}
                Some(FixedTermMark::InFlight) => {
                    awaited.insert(key);
                }
                None => {
                    awaited.insert(key);
                    fresh.push(item.clone());
                }
            }
        }

        if awaited.is_empty() {
            return PreloadLookup::Ready;
        }

        for item in &fresh {
            self.marks.insert(item.cache_key(), FixedTermMark::InFlight);
        }

        let (completion, pending) = dispatch::channel();
        self.pending.push(PendingPreload { awaited, completion });
        PreloadLookup::Wait {
            pending,
            query: (!fresh.is_empty()).then_some(fresh),
        }
    }

    /// Applies a finished preload of `queried`. Returns how many waiting
    /// requests were answered.
    pub fn complete<F>(&mut self, queried: &[FixedTermRef], outcome: Result<(), E>, is_loaded: F) -> usize
    where
        F: Fn(&FixedTermRef) -> bool,
    {
        let mut keys = HashSet::new();
        for item in queried {
            let key = item.cache_key();
            if outcome.is_ok() && !is_loaded(item) {
                self.marks.insert(key.clone(), FixedTermMark::Missing);
            } else {
                self.marks.remove(&key);
            }
            keys.insert(key);
        }

        let mut answered = 0;
        for mut request in std::mem::take(&mut self.pending) {
            if request.awaited.is_disjoint(&keys) {
                self.pending.push(request);
                continue;
            }
            if let Err(err) = &outcome {
                dispatch::resolve(request.completion, Err(err.clone()));
                answered += 1;
                continue;
            }
            request.awaited.retain(|key| !keys.contains(key));
            if request.awaited.is_empty() {
                dispatch::resolve(request.completion, Ok(()));
                answered += 1;
            } else {
                self.pending.push(request);
            }
        }
        answered
    }

    /// Forgets references known missing. Loads in flight are kept.
    pub fn clear(&mut self) {
        self.marks.retain(|_, mark| *mark == FixedTermMark::InFlight);
    }

    pub fn in_flight(&self) -> usize {
        self.marks
            .values()
            .filter(|m| **m == FixedTermMark::InFlight)
            .count()
    }

    pub fn missing(&self) -> usize {
        self.marks.len() - self.in_flight()
    }

    pub fn waiting(&self) -> usize {
        self.pending.len()
    }
}
