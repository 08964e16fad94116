//! Property tests for the match-object cache.

use std::collections::VecDeque;

use proptest::prelude::*;
use termcache_storage::{CacheOptions, CachedDictionary, Items, Match, MatchOptions};
use termcache_test_utils::generators::{arb_access_sequence, arb_cache_options};
use termcache_test_utils::{MockDictionary, MockOp};

fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime builds")
}

/// Replays `sequence` and returns each result with the final query count.
fn replay(options: CacheOptions, sequence: &[String]) -> (Vec<Items<Match>>, usize, Vec<usize>) {
    runtime().block_on(async {
        let dict = CachedDictionary::new(MockDictionary::standard(), options);
        let mut results = Vec::new();
        let mut sizes = Vec::new();
        for s in sequence {
            let res = dict
                .get_matches_for_string(s, &MatchOptions::new())
                .await
                .expect("lookup succeeds");
            results.push(res);
            sizes.push(dict.snapshot().match_entries);
        }
        (results, dict.source().calls(MockOp::Matches), sizes)
    })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_size_cap_and_lru_order(max_items in 1usize..5, sequence in arb_access_sequence()) {
        let options = CacheOptions::new()
            .with_max_items(max_items)
            .with_predict_empties(false);
        let (_, queries, sizes) = replay(options, &sequence);

        prop_assert!(sizes.iter().all(|n| *n <= max_items));

        // Least-recently-used model of the cache.
        let mut model: VecDeque<&String> = VecDeque::new();
        let mut misses = 0;
        for s in &sequence {
            if let Some(pos) = model.iter().position(|k| *k == s) {
                model.remove(pos);
            } else {
                misses += 1;
                if model.len() == max_items {
                    model.pop_front();
                }
            }
            model.push_back(s);
        }
        prop_assert_eq!(queries, misses);
    }

    #[test]
    fn prop_prediction_never_changes_results(
        options in arb_cache_options(),
        sequence in arb_access_sequence(),
    ) {
        let predicted = replay(options.clone().with_predict_empties(true), &sequence);
        let plain = replay(options.with_predict_empties(false), &sequence);

        prop_assert_eq!(&predicted.0, &plain.0);
        prop_assert!(predicted.1 <= plain.1);
    }
}
