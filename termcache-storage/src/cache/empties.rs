//! Empty-prefix prediction.
//!
//! Lookups match by prefix or infix, so a string that produced no matches
//! predicts that every extension of it produces none either, under the same
//! options. The index is a heuristic: sources that return matches for a
//! longer string but not for its prefix will see false negatives.

use std::collections::HashMap;

/// Strings known to yield no matches, grouped by normalized options key.
#[derive(Debug, Default)]
pub struct EmptyPrefixIndex {
    by_options: HashMap<String, Vec<String>>,
}

impl EmptyPrefixIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remembers that `s` yielded nothing under `options_key`. The empty
    /// string is never recorded, as it would predict every lookup empty.
    pub fn record(&mut self, options_key: &str, s: &str) {
        if s.is_empty() {
            return;
        }
        let known = self.by_options.entry(options_key.to_string()).or_default();
        if !known.iter().any(|k| k == s) {
            known.push(s.to_string());
        }
    }

    /// Whether some recorded string under `options_key` is a prefix of `s`.
    pub fn predicts_empty(&self, options_key: &str, s: &str) -> bool {
        self.by_options
            .get(options_key)
            .is_some_and(|known| known.iter().any(|k| s.starts_with(k.as_str())))
    }

    /// Number of recorded strings across all options.
    pub fn len(&self) -> usize {
        self.by_options.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        self.by_options.clear();
    }
}
