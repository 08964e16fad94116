//! Oldest-entry eviction over a timestamped map.

use std::collections::HashMap;
use std::hash::Hash;
use tokio::time::{Duration, Instant};

/// Values that remember when they were last accessed.
pub trait Timestamped {
    /// Ordering key of the last access; smaller is older. The sequence number
    /// breaks ties between accesses that share an instant.
    fn access_order(&self) -> (Instant, u64);
}

/// A cached value plus its last-access stamp.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    value: V,
    last_accessed: Instant,
    seq: u64,
}

impl<V> CacheEntry<V> {
    pub fn new(value: V, now: Instant, seq: u64) -> Self {
        Self {
            value,
            last_accessed: now,
            seq,
        }
    }

    pub fn value(&self) -> &V {
        &self.value
    }

    pub fn last_accessed(&self) -> Instant {
        self.last_accessed
    }

    /// Records a read.
    pub fn touch(&mut self, now: Instant, seq: u64) {
        self.last_accessed = now;
        self.seq = seq;
    }

    /// An entry expires once `max_age` has passed since its last access.
    /// A zero `max_age` never expires.
    pub fn is_expired(&self, now: Instant, max_age: Duration) -> bool {
        !max_age.is_zero() && now.saturating_duration_since(self.last_accessed) >= max_age
    }
}

impl<V> Timestamped for CacheEntry<V> {
    fn access_order(&self) -> (Instant, u64) {
        (self.last_accessed, self.seq)
    }
}

/// Removes and returns the least recently accessed entry.
pub fn evict_oldest<K, V>(map: &mut HashMap<K, V>) -> Option<(K, V)>
where
    K: Eq + Hash + Clone,
    V: Timestamped,
{
    let oldest = map
        .iter()
        .min_by_key(|(_, entry)| entry.access_order())
        .map(|(key, _)| key.clone())?;
    map.remove_entry(&oldest)
}
