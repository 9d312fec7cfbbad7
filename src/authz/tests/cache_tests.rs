//! Policy cache tests
//!
//! Concurrent access patterns and first-writer-wins semantics.

use cretoai_policy_resolver::{Binding, Policy, PolicyCache};
use std::sync::Arc;
use tokio::task::JoinSet;

fn policy(role: &str) -> Arc<Policy> {
    Arc::new(Policy::new().with_binding(Binding::new(role)))
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stores_distinct_keys() {
    let cache = Arc::new(PolicyCache::new());
    let mut join_set = JoinSet::new();

    for i in 0..100 {
        let cache = Arc::clone(&cache);
        join_set.spawn(async move {
            cache.store(format!("docs/d{}", i), policy("roles/viewer"));
        });
    }

    while let Some(result) = join_set.join_next().await {
        result.unwrap();
    }

    assert_eq!(cache.len(), 100);
    for i in 0..100 {
        assert!(cache.contains(&format!("docs/d{}", i)));
    }
    assert_eq!(cache.stats().stores, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_stores_same_key() {
    let cache = Arc::new(PolicyCache::new());
    let mut join_set = JoinSet::new();

    for i in 0..50 {
        let cache = Arc::clone(&cache);
        join_set.spawn(async move { cache.store("docs/shared", policy(&format!("roles/r{}", i))) });
    }

    let mut winners = Vec::new();
    while let Some(result) = join_set.join_next().await {
        winners.push(result.unwrap());
    }

    // every writer observes the same entry
    let cached = cache.lookup("docs/shared").unwrap();
    assert!(winners.iter().all(|w| Arc::ptr_eq(w, &cached)));

    let stats = cache.stats();
    assert_eq!(cache.len(), 1);
    assert_eq!(stats.stores, 1);
    assert_eq!(stats.redundant_stores, 49);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_reads_during_writes() {
    let cache = Arc::new(PolicyCache::new());
    cache.store("docs/stable", policy("roles/owner"));

    let mut join_set = JoinSet::new();
    for i in 0..50 {
        let cache = Arc::clone(&cache);
        join_set.spawn(async move {
            cache.store(format!("docs/new{}", i), policy("roles/viewer"));
            cache.lookup("docs/stable").is_some()
        });
    }

    while let Some(result) = join_set.join_next().await {
        assert!(result.unwrap());
    }

    let stats = cache.stats();
    assert_eq!(stats.hits, 50);
    assert_eq!(stats.entries, 51);
    assert_eq!(stats.hit_rate(), 1.0);
}
