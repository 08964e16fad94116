//! termcache Core - Data Types
//!
//! Plain data structures shared by every termcache crate: the records a term
//! dictionary returns, the option objects that select them, configuration,
//! errors, and the [`DictionarySource`] trait that a backing source implements.
//! This crate contains no caching logic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub mod config;
pub mod error;
pub mod options;
pub mod source;

pub use config::{CacheOptions, DEFAULT_PREDICT_EMPTIES};
pub use error::{CacheError, CacheResult, ConfigError};
pub use options::{
    paginate, DictInfoFilter, DictInfoOptions, DictInfoSort, MatchFilter, MatchOptions,
    MatchSort, RefTermFilter, RefTermOptions,
};
pub use source::DictionarySource;

// ============================================================================
// RESULT ENVELOPE
// ============================================================================

/// The `{ items: [...] }` envelope every lookup operation returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Items<T> {
    pub items: Vec<T>,
}

impl<T> Items<T> {
    pub fn new(items: Vec<T>) -> Self {
        Self { items }
    }

    pub fn empty() -> Self {
        Self { items: Vec::new() }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn into_inner(self) -> Vec<T> {
        self.items
    }
}

impl<T> Default for Items<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<T> From<Vec<T>> for Items<T> {
    fn from(items: Vec<T>) -> Self {
        Self::new(items)
    }
}

// ============================================================================
// MATCH OBJECTS
// ============================================================================

/// How a match relates to the search string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchType {
    /// A term starts with the search string.
    #[serde(rename = "S")]
    Prefix,
    /// A term contains the search string elsewhere.
    #[serde(rename = "T")]
    Infix,
    /// A preloaded fixed term.
    #[serde(rename = "F")]
    Fixed,
    /// A reference term matched literally.
    #[serde(rename = "R")]
    RefTerm,
    /// The search string parsed as a number.
    #[serde(rename = "N")]
    Number,
}

/// One match-object returned for a string lookup.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub dict_id: String,
    pub str: String,
    #[serde(rename = "type")]
    pub match_type: MatchType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descr: Option<String>,
}

// ============================================================================
// DICTIONARY METADATA
// ============================================================================

/// Metadata record describing one dictionary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DictInfo {
    pub id: String,
    pub name: String,
    /// Source-specific fields carried through untouched.
    #[serde(default, flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl DictInfo {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            extra: BTreeMap::new(),
        }
    }
}

// ============================================================================
// FIXED TERMS
// ============================================================================

/// Reference to a term that should be preloaded: a concept id, optionally
/// narrowed to one of its term strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FixedTermRef {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str: Option<String>,
}

impl FixedTermRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            str: None,
        }
    }

    pub fn with_str(id: impl Into<String>, s: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            str: Some(s.into()),
        }
    }

    /// Identity key of this reference. The same id with a different (or no)
    /// term string is a different fixed term.
    pub fn cache_key(&self) -> String {
        format!("{}\n{}", self.id, self.str.as_deref().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_term_key_distinguishes_str() {
        let bare = FixedTermRef::new("B:02");
        let with_x = FixedTermRef::with_str("B:02", "x");
        assert_ne!(bare.cache_key(), with_x.cache_key());
        assert_eq!(with_x.cache_key(), FixedTermRef::with_str("B:02", "x").cache_key());
    }

    #[test]
    fn test_match_serializes_type_letter() {
        let m = Match {
            id: "A:01".to_string(),
            dict_id: "A".to_string(),
            str: "a".to_string(),
            match_type: MatchType::Prefix,
            descr: None,
        };
        let json = serde_json::to_value(&m).expect("match serializes");
        assert_eq!(json["type"], "S");
        assert_eq!(json["dictId"], "A");
        assert!(json.get("descr").is_none());
    }

    #[test]
    fn test_dict_info_keeps_extra_fields() {
        let json = r#"{"id":"A","name":"Name 1","abbrev":"N1"}"#;
        let di: DictInfo = serde_json::from_str(json).expect("dictinfo parses");
        assert_eq!(di.id, "A");
        assert_eq!(di.extra.get("abbrev"), Some(&serde_json::json!("N1")));
    }

    #[test]
    fn test_items_envelope() {
        let items: Items<String> = vec!["it".to_string()].into();
        assert_eq!(items.len(), 1);
        assert!(!items.is_empty());
        assert!(Items::<String>::empty().is_empty());
    }
}
