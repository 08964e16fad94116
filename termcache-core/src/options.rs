//! Option objects for the lookup operations, plus the pagination and sorting
//! rules that both the backing source and the cache apply to them.

use crate::DictInfo;
use serde::{Deserialize, Serialize};

// ============================================================================
// PAGINATION
// ============================================================================

/// Applies `page`/`per_page` to a list. Pages are 1-based; without `per_page`
/// the whole list is returned and `page` is ignored.
pub fn paginate<T>(items: Vec<T>, page: Option<u32>, per_page: Option<u32>) -> Vec<T> {
    let Some(per_page) = per_page.filter(|n| *n > 0) else {
        return items;
    };
    let page = page.unwrap_or(1).max(1);
    let skip = (page as usize - 1).saturating_mul(per_page as usize);
    items
        .into_iter()
        .skip(skip)
        .take(per_page as usize)
        .collect()
}

// ============================================================================
// MATCH OPTIONS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dict_id: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchSort {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dict_id: Option<Vec<String>>,
}

/// Options for a string lookup. Serialized form doubles as the normalized
/// cache key, so unset fields are skipped.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<MatchFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<MatchSort>,
    /// Extra fields the source should attach to each match.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub z: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl MatchOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_dict_ids<I, S>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(MatchFilter {
            dict_id: Some(ids.into_iter().map(Into::into).collect()),
        });
        self
    }

    pub fn with_z(mut self, z: serde_json::Value) -> Self {
        self.z = Some(z);
        self
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    /// Normalized key for these options alone.
    pub fn cache_key(&self) -> String {
        // Plain data without non-string map keys always serializes.
        serde_json::to_string(self).unwrap_or_default()
    }

    /// Key for a search string under these options. Encoded as a JSON pair
    /// so no string/options combination can collide with another.
    pub fn cache_key_for(&self, s: &str) -> String {
        serde_json::to_string(&(s, self)).unwrap_or_default()
    }
}

// ============================================================================
// REFTERM OPTIONS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RefTermFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub str: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefTermOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<RefTermFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl RefTermOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_strs<I, S>(mut self, strs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.filter = Some(RefTermFilter {
            str: Some(strs.into_iter().map(Into::into).collect()),
        });
        self
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    /// Selects from an already sorted collection: keeps the collection's
    /// order, drops terms not named by `filter.str`, then paginates.
    pub fn select(&self, all: &[String]) -> Vec<String> {
        let wanted = self.filter.as_ref().and_then(|f| f.str.as_ref());
        let selected = all
            .iter()
            .filter(|term| wanted.map_or(true, |w| w.contains(term)))
            .cloned()
            .collect();
        paginate(selected, self.page, self.per_page)
    }
}

// ============================================================================
// DICTINFO OPTIONS
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DictInfoFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Vec<String>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DictInfoSort {
    #[default]
    Id,
    Name,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DictInfoOptions {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<DictInfoFilter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<DictInfoSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
}

impl DictInfoOptions {
    /// Options selecting every dictionary.
    pub fn all() -> Self {
        Self::default()
    }

    /// Options selecting dictionaries by id.
    pub fn by_ids<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filter: Some(DictInfoFilter {
                id: Some(ids.into_iter().map(Into::into).collect()),
                name: None,
            }),
            ..Self::default()
        }
    }

    /// Options selecting dictionaries by name.
    pub fn by_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filter: Some(DictInfoFilter {
                id: None,
                name: Some(names.into_iter().map(Into::into).collect()),
            }),
            ..Self::default()
        }
    }

    pub fn with_sort(mut self, sort: DictInfoSort) -> Self {
        self.sort = Some(sort);
        self
    }

    pub fn with_page(mut self, page: u32, per_page: u32) -> Self {
        self.page = Some(page);
        self.per_page = Some(per_page);
        self
    }

    /// The explicit id list, if this request selects by id.
    pub fn ids(&self) -> Option<&[String]> {
        self.filter.as_ref()?.id.as_deref()
    }

    /// Sorts by the requested key (ties on name fall back to id) and applies
    /// pagination.
    pub fn arrange(&self, mut items: Vec<DictInfo>) -> Vec<DictInfo> {
        match self.sort.unwrap_or_default() {
            DictInfoSort::Id => items.sort_by(|a, b| a.id.cmp(&b.id)),
            DictInfoSort::Name => {
                items.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.cmp(&b.id)))
            }
        }
        paginate(items, self.page, self.per_page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_paginate_pages_are_one_based() {
        let items = vec![1, 2, 3, 4, 5];
        assert_eq!(paginate(items.clone(), Some(3), Some(2)), vec![5]);
        assert_eq!(paginate(items.clone(), Some(1), Some(2)), vec![1, 2]);
        assert_eq!(paginate(items.clone(), None, Some(2)), vec![1, 2]);
        assert_eq!(paginate(items.clone(), Some(4), None), items);
        assert!(paginate(items, Some(9), Some(2)).is_empty());
    }

    #[test]
    fn test_match_cache_key_is_deterministic() {
        let a = MatchOptions::new().with_dict_ids(["A"]);
        let b = MatchOptions::new().with_dict_ids(["A"]);
        assert_eq!(a.cache_key_for("x"), b.cache_key_for("x"));
        assert_ne!(a.cache_key_for("x"), a.cache_key_for("xy"));
        assert_ne!(a.cache_key(), MatchOptions::new().cache_key());
        assert_eq!(MatchOptions::new().cache_key(), "{}");
    }

    #[test]
    fn test_ref_term_select_keeps_collection_order() {
        let all = strs(&["it", "that", "this"]);
        let opts = RefTermOptions::new().with_strs(["this", "it"]);
        assert_eq!(opts.select(&all), strs(&["it", "this"]));
        assert_eq!(RefTermOptions::new().with_page(2, 1).select(&all), strs(&["that"]));
        assert_eq!(RefTermOptions::new().select(&all), all);
    }

    #[test]
    fn test_dict_info_arrange_by_name() {
        let items = vec![
            DictInfo::new("E", "Name Y"),
            DictInfo::new("D", "Name Z"),
        ];
        let by_name = DictInfoOptions::all().with_sort(DictInfoSort::Name);
        let ids: Vec<_> = by_name.arrange(items.clone()).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, strs(&["E", "D"]));

        let ids: Vec<_> = DictInfoOptions::all().arrange(items).into_iter().map(|d| d.id).collect();
        assert_eq!(ids, strs(&["D", "E"]));
    }

    mod properties {
        use super::super::paginate;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn prop_pages_partition_the_list(len in 0usize..50, per_page in 1u32..8) {
                let items: Vec<usize> = (0..len).collect();
                let pages = len.div_ceil(per_page as usize).max(1) as u32;
                let mut joined = Vec::new();
                for page in 1..=pages {
                    let chunk = paginate(items.clone(), Some(page), Some(per_page));
                    prop_assert!(chunk.len() <= per_page as usize);
                    joined.extend(chunk);
                }
                prop_assert_eq!(joined, items);
            }
        }
    }

    #[test]
    fn test_dict_info_options_serialize_camel_case() {
        let opts = DictInfoOptions::by_ids(["A"]).with_page(2, 10);
        let json = serde_json::to_value(&opts).expect("options serialize");
        assert_eq!(json["perPage"], 10);
        assert_eq!(json["filter"]["id"][0], "A");
        assert_eq!(opts.ids(), Some(&strs(&["A"])[..]));
    }
}
