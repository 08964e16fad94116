//! RefTerm cache: the whole refTerm collection, fetched once and filtered
//! locally per request.

use std::sync::Arc;

use termcache_core::{Items, RefTermOptions};

use super::dispatch::{self, Completion, Pending};

/// Public view of the fill state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefTermStatus {
    Unfilled,
    Filling,
    /// Filled with this many terms.
    Filled(usize),
}

#[derive(Debug)]
enum FillState {
    Unfilled,
    Filling,
    Filled(Arc<Vec<String>>),
}

#[derive(Debug)]
pub enum RefTermLookup<E> {
    Ready(Items<String>),
    /// Queued until the fill completes; `launch` asks the caller to start it.
    Wait {
        pending: Pending<Items<String>, E>,
        launch: bool,
    },
}

#[derive(Debug)]
pub struct RefTermCache<E> {
    state: FillState,
    queue: Vec<(RefTermOptions, Completion<Items<String>, E>)>,
}

impl<E: Clone> Default for RefTermCache<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: Clone> RefTermCache<E> {
    pub fn new() -> Self {
        Self {
            state: FillState::Unfilled,
            queue: Vec::new(),
        }
    }

    pub fn request(&mut self, options: &RefTermOptions) -> RefTermLookup<E> {
        if let FillState::Filled(all) = &self.state {
            return RefTermLookup::Ready(Items::new(options.select(all)));
        }
        let launch = matches!(self.state, FillState::Unfilled);
        if launch {
            self.state = FillState::Filling;
        }
        let (completion, pending) = dispatch::channel();
        self.queue.push((options.clone(), completion));
        RefTermLookup::Wait { pending, launch }
    }

    /// Applies the fill outcome and answers every queued request with its
    /// own selection. A failure leaves the cache unfilled.
    pub fn complete(&mut self, outcome: Result<Items<String>, E>) -> usize {
        let queue = std::mem::take(&mut self.queue);
        let resolved = queue.len();
        match outcome {
            Ok(items) => {
                let all = Arc::new(items.into_inner());
                for (options, completion) in queue {
                    dispatch::resolve(completion, Ok(Items::new(options.select(&all))));
                }
                self.state = FillState::Filled(all);
            }
            Err(err) => {
                self.state = FillState::Unfilled;
                for (_, completion) in queue {
                    dispatch::resolve(completion, Err(err.clone()));
                }
            }
        }
        resolved
    }

    /// Forgets a completed fill. A fill in flight is kept and will repopulate
    /// the cache when it lands.
    pub fn clear(&mut self) {
        if matches!(self.state, FillState::Filled(_)) {
            self.state = FillState::Unfilled;
        }
    }

    pub fn status(&self) -> RefTermStatus {
        match &self.state {
            FillState::Unfilled => RefTermStatus::Unfilled,
            FillState::Filling => RefTermStatus::Filling,
            FillState::Filled(all) => RefTermStatus::Filled(all.len()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms() -> Items<String> {
        Items::new(vec!["it".to_string(), "that".to_string(), "this".to_string()])
    }

    fn wait(lookup: RefTermLookup<String>) -> (Pending<Items<String>, String>, bool) {
        match lookup {
            RefTermLookup::Wait { pending, launch } => (pending, launch),
            RefTermLookup::Ready(items) => panic!("unexpected ready: {:?}", items),
        }
    }

    #[tokio::test]
    async fn test_fill_once_and_select_per_request() {
        let mut cache = RefTermCache::<String>::new();
        let (all, launch) = wait(cache.request(&RefTermOptions::new()));
        assert!(launch);
        let (filtered, launch) = wait(cache.request(&RefTermOptions::new().with_strs(["this", "it"])));
        assert!(!launch);
        assert_eq!(cache.status(), RefTermStatus::Filling);

        assert_eq!(cache.complete(Ok(terms())), 2);
        assert_eq!(all.await.expect("sent"), Ok(terms()));
        assert_eq!(
            filtered.await.expect("sent").map(Items::into_inner),
            Ok(vec!["it".to_string(), "this".to_string()])
        );

        match cache.request(&RefTermOptions::new().with_page(2, 2)) {
            RefTermLookup::Ready(items) => assert_eq!(items.into_inner(), vec!["this".to_string()]),
            RefTermLookup::Wait { .. } => panic!("expected ready"),
        }
        assert_eq!(cache.status(), RefTermStatus::Filled(3));
    }

    #[tokio::test]
    async fn test_failure_resets_to_unfilled() {
        let mut cache = RefTermCache::<String>::new();
        let (pending, _) = wait(cache.request(&RefTermOptions::new()));
        cache.complete(Err("ERR".to_string()));
        assert_eq!(pending.await.expect("sent"), Err("ERR".to_string()));
        assert_eq!(cache.status(), RefTermStatus::Unfilled);

        let (_pending, launch) = wait(cache.request(&RefTermOptions::new()));
        assert!(launch);
    }

    #[test]
    fn test_clear_keeps_fill_in_flight() {
        let mut cache = RefTermCache::<String>::new();
        let _waiting = wait(cache.request(&RefTermOptions::new()));
        cache.clear();
        assert_eq!(cache.status(), RefTermStatus::Filling);

        cache.complete(Ok(terms()));
        cache.clear();
        assert_eq!(cache.status(), RefTermStatus::Unfilled);
    }
}
