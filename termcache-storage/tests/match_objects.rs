//! Match-object lookups through the public facade.

use std::time::Duration;

use termcache_storage::{CacheError, CacheOptions, CacheResult, CachedDictionary, Items, Match, MatchOptions};
use termcache_test_utils::{match_strs, settle, MockDictionary, MockError, MockOp};
use tokio::task::JoinHandle;
use tokio::time::sleep;

type Dict = CachedDictionary<MockDictionary>;

const LATENCY: Duration = Duration::from_millis(100);

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn dict(options: CacheOptions) -> Dict {
    CachedDictionary::new(MockDictionary::standard().with_delay(LATENCY), options)
}

fn spawn_lookup(dict: &Dict, s: &str, options: MatchOptions) -> JoinHandle<CacheResult<Items<Match>, MockError>> {
    let dict = dict.clone();
    let s = s.to_string();
    tokio::spawn(async move { dict.get_matches_for_string(&s, &options).await })
}

async fn lookup(dict: &Dict, s: &str) -> Items<Match> {
    dict.get_matches_for_string(s, &MatchOptions::new())
        .await
        .expect("lookup succeeds")
}

#[tokio::test(start_paused = true)]
async fn test_second_identical_call_is_served_from_cache() {
    let dict = dict(CacheOptions::default());

    let first = lookup(&dict, "a").await;
    assert_eq!(match_strs(&first), vec!["a", "ab"]);
    assert_eq!(dict.source().calls(MockOp::Matches), 1);

    let second = lookup(&dict, "a").await;
    assert_eq!(second, first);
    assert_eq!(dict.source().calls(MockOp::Matches), 1);
    assert_eq!(dict.stats().hits, 1);
}

#[tokio::test(start_paused = true)]
async fn test_different_string_or_options_query_independently() {
    let dict = dict(CacheOptions::default());

    lookup(&dict, "a").await;
    let ab = lookup(&dict, "ab").await;
    assert_eq!(match_strs(&ab), vec!["ab"]);
    assert_eq!(dict.source().calls(MockOp::Matches), 2);

    let only_b = dict
        .get_matches_for_string("a", &MatchOptions::new().with_dict_ids(["B"]))
        .await
        .expect("lookup succeeds");
    assert!(only_b.is_empty());
    assert_eq!(dict.source().calls(MockOp::Matches), 3);
    assert_eq!(dict.snapshot().match_entries, 3);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cache_forces_a_new_query() {
    let dict = dict(CacheOptions::default());
    lookup(&dict, "a").await;

    dict.clear_cache();
    assert_eq!(dict.snapshot().match_entries, 0);

    lookup(&dict, "a").await;
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
}

#[tokio::test(start_paused = true)]
async fn test_max_items_evicts_least_recently_used() {
    let dict = dict(CacheOptions::new().with_max_items(1));

    lookup(&dict, "a").await;
    lookup(&dict, "b").await;
    assert_eq!(dict.snapshot().match_entries, 1);
    assert_eq!(dict.stats().evictions, 1);

    lookup(&dict, "b").await;
    assert_eq!(dict.source().calls(MockOp::Matches), 2);

    lookup(&dict, "a").await;
    assert_eq!(dict.source().calls(MockOp::Matches), 3);
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_identical_calls_share_one_query() {
    let dict = dict(CacheOptions::default());

    let call1 = spawn_lookup(&dict, "a", MatchOptions::new());
    settle().await;
    sleep(ms(99)).await;

    let call2 = spawn_lookup(&dict, "a", MatchOptions::new());
    let call3 = spawn_lookup(&dict, "a", MatchOptions::new().with_dict_ids(["A"]));
    settle().await;
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
    assert!(!call1.is_finished());

    // 101ms after call 1: calls 1 and 2 are answered by the same query.
    sleep(ms(2)).await;
    settle().await;
    assert!(call1.is_finished());
    assert!(call2.is_finished());
    assert!(!call3.is_finished());

    let res1 = call1.await.expect("task").expect("ok");
    let res2 = call2.await.expect("task").expect("ok");
    assert_eq!(res1, res2);
    assert_eq!(match_strs(&res1), vec!["a", "ab"]);

    sleep(ms(100)).await;
    let res3 = call3.await.expect("task").expect("ok");
    assert_eq!(match_strs(&res3), vec!["a", "ab"]);
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
    assert_eq!(dict.stats().coalesced, 1);
}

#[tokio::test(start_paused = true)]
async fn test_error_reaches_every_joined_caller_and_is_not_cached() {
    let dict = dict(CacheOptions::default());
    dict.source().fail_next(MockOp::Matches);

    let call1 = spawn_lookup(&dict, "a", MatchOptions::new());
    settle().await;
    sleep(ms(50)).await;
    let call2 = spawn_lookup(&dict, "a", MatchOptions::new());
    settle().await;

    let expected = Err(CacheError::Query(MockError("ERR".to_string())));
    assert_eq!(call1.await.expect("task"), expected);
    assert_eq!(call2.await.expect("task"), expected);
    assert_eq!(dict.source().calls(MockOp::Matches), 1);
    assert_eq!(dict.snapshot().match_entries, 0);
    assert_eq!(dict.stats().query_failures, 1);

    let retried = lookup(&dict, "a").await;
    assert_eq!(retried.len(), 2);
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
}

#[tokio::test(start_paused = true)]
async fn test_empty_result_predicts_longer_strings() {
    let dict = dict(CacheOptions::default());

    assert!(lookup(&dict, "ax").await.is_empty());
    assert_eq!(dict.source().calls(MockOp::Matches), 1);

    assert!(lookup(&dict, "axy").await.is_empty());
    assert_eq!(dict.source().calls(MockOp::Matches), 1);
    assert_eq!(dict.stats().predicted_empty, 1);
    // Predicted results are not stored.
    assert_eq!(dict.snapshot().match_entries, 1);

    assert_eq!(lookup(&dict, "a").await.len(), 2);
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
}

#[tokio::test(start_paused = true)]
async fn test_prediction_is_scoped_to_options() {
    let dict = dict(CacheOptions::default());
    lookup(&dict, "ax").await;

    let res = dict
        .get_matches_for_string("axy", &MatchOptions::new().with_dict_ids(["A"]))
        .await
        .expect("lookup succeeds");
    assert!(res.is_empty());
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
}

#[tokio::test(start_paused = true)]
async fn test_disabled_prediction_changes_only_query_count() {
    let dict = dict(CacheOptions::new().with_predict_empties(false));

    assert!(lookup(&dict, "ax").await.is_empty());
    assert!(lookup(&dict, "axy").await.is_empty());
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
    assert_eq!(dict.snapshot().empty_prefixes, 0);
}

#[tokio::test(start_paused = true)]
async fn test_empty_search_string_predicts_nothing() {
    let dict = dict(CacheOptions::default());

    assert!(lookup(&dict, "").await.is_empty());
    assert_eq!(dict.snapshot().empty_prefixes, 0);

    assert_eq!(lookup(&dict, "a").await.len(), 2);
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
}

#[tokio::test(start_paused = true)]
async fn test_clear_cache_forgets_empty_prefixes() {
    let dict = dict(CacheOptions::default());
    lookup(&dict, "ax").await;

    dict.clear_cache();
    lookup(&dict, "axy").await;
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
}

#[tokio::test(start_paused = true)]
async fn test_entry_matches_share_prediction_but_are_not_memoized() {
    let dict = dict(CacheOptions::default());

    let res = dict
        .get_entry_matches_for_string("ax", &MatchOptions::new())
        .await
        .expect("lookup succeeds");
    assert!(res.is_empty());
    assert_eq!(dict.source().calls(MockOp::EntryMatches), 1);

    // The empty entry result predicts full lookups too.
    assert!(lookup(&dict, "axy").await.is_empty());
    assert_eq!(dict.source().calls(MockOp::Matches), 0);

    let res = dict
        .get_entry_matches_for_string("axe", &MatchOptions::new())
        .await
        .expect("lookup succeeds");
    assert!(res.is_empty());
    assert_eq!(dict.source().calls(MockOp::EntryMatches), 1);

    for _ in 0..2 {
        let res = dict
            .get_entry_matches_for_string("a", &MatchOptions::new())
            .await
            .expect("lookup succeeds");
        assert_eq!(match_strs(&res), vec!["a", "ab"]);
    }
    assert_eq!(dict.source().calls(MockOp::EntryMatches), 3);
}

#[tokio::test(start_paused = true)]
async fn test_entry_match_errors_pass_through() {
    let dict = dict(CacheOptions::default());
    dict.source().fail_next(MockOp::EntryMatches);

    let res = dict
        .get_entry_matches_for_string("a", &MatchOptions::new())
        .await;
    assert_eq!(res, Err(CacheError::Query(MockError("ERR".to_string()))));
}

// ============================================================================
// EXPIRY
// ============================================================================

fn expiring_dict() -> Dict {
    CachedDictionary::new(
        MockDictionary::standard(),
        CacheOptions::new().with_max_age(ms(2000)),
    )
}

#[tokio::test(start_paused = true)]
async fn test_entry_readable_just_before_max_age() {
    let dict = expiring_dict();
    lookup(&dict, "a").await;

    sleep(ms(1999)).await;
    lookup(&dict, "a").await;
    assert_eq!(dict.source().calls(MockOp::Matches), 1);

    // The read refreshed the entry and restarted the idle timer.
    sleep(ms(1999)).await;
    lookup(&dict, "a").await;
    assert_eq!(dict.source().calls(MockOp::Matches), 1);
}

#[tokio::test(start_paused = true)]
async fn test_entry_gone_after_max_age() {
    let dict = expiring_dict();
    lookup(&dict, "a").await;

    sleep(ms(2001)).await;
    assert_eq!(dict.snapshot().match_entries, 0);
    assert_eq!(dict.stats().clears, 1);

    lookup(&dict, "a").await;
    assert_eq!(dict.source().calls(MockOp::Matches), 2);
}

#[tokio::test(start_paused = true)]
async fn test_idle_timer_clears_every_subsystem() {
    let dict = expiring_dict();
    lookup(&dict, "a").await;
    dict.get_ref_terms(&Default::default()).await.expect("ok");
    dict.get_dict_infos(&Default::default()).await.expect("ok");

    sleep(ms(2001)).await;
    let snapshot = dict.snapshot();
    assert_eq!(snapshot.match_entries, 0);
    assert_eq!(snapshot.ref_terms, termcache_storage::RefTermStatus::Unfilled);
    assert_eq!(snapshot.dict_infos, 0);
}

#[tokio::test(start_paused = true)]
async fn test_no_max_age_never_expires() {
    let dict = CachedDictionary::new(MockDictionary::standard(), CacheOptions::default());
    lookup(&dict, "a").await;

    sleep(Duration::from_secs(3600)).await;
    lookup(&dict, "a").await;
    assert_eq!(dict.source().calls(MockOp::Matches), 1);
}
