//! Conformance test suite for [`Datastore`] implementations.
//!
//! Async check functions that validate whether a backend satisfies the
//! [`Datastore`] contract. Every backend can run the same suite to show it
//! behaves like the reference [`MemoryDatastore`](crate::MemoryDatastore).
//!
//! Each check uses its own key namespace, so they can share one backend.
//!
//! # Usage
//!
//! Enable the `testutil` feature and call each check with a backend:
//!
//! ```no_run
//! use inferadb_common_datastore::{MemoryDatastore, conformance};
//!
//! #[tokio::test]
//! async fn crud_get_missing_is_not_found() {
//!     conformance::crud_get_missing_is_not_found(&MemoryDatastore::new()).await;
//! }
//! ```
//!
//! # Check Categories
//!
//! | Category | Checks | Contract aspect |
//! |----------|--------|-----------------|
//! | CRUD | 6 | put/get/has/delete semantics |
//! | Query | 5 | prefix, filters, orders, paging, keys-only |
//! | Bulk | 4 | put_many/get_many/delete_many laziness and failure |
//! | Batch | 3 | commit ordering, re-commit, abort |
//! | Concurrent | 2 | Thread-safety under parallel access |

use std::sync::Arc;

use bytes::Bytes;
use futures::{StreamExt, TryStreamExt, stream};
use tokio_util::sync::CancellationToken;

use crate::{
    AbortSignal, Datastore, Key, Pair,
    assert_aborted, assert_not_found,
    batch::BatchOperation,
    query::{self, Query},
};

fn key_strings(pairs: &[Pair]) -> Vec<&str> {
    pairs.iter().map(|p| p.key.as_str()).collect()
}

// ============================================================================
// CRUD: put/get/has/delete semantics (6 checks)
// ============================================================================

/// `get` on a missing key fails with `NotFound`.
pub async fn crud_get_missing_is_not_found<D: Datastore>(store: &D) {
    let result = store.get(&Key::new("/crud/missing")).await;
    assert_not_found!(result);
}

/// `has` on a missing key is `Ok(false)`, not an error.
pub async fn crud_has_missing_is_false<D: Datastore>(store: &D) {
    let result = store.has(&Key::new("/crud/absent")).await;
    assert!(matches!(result, Ok(false)), "has on missing key should be Ok(false): {result:?}");
}

/// `put` then `get` round-trips the value.
pub async fn crud_put_then_get_returns_value<D: Datastore>(store: &D) {
    let key = Key::new("/crud/k1");
    store.put(&key, Bytes::from("v1")).await.expect("put should succeed");
    assert_eq!(store.get(&key).await.expect("get should succeed"), Bytes::from("v1"));
    assert!(store.has(&key).await.expect("has"));
}

/// `put` on an existing key overwrites the value.
pub async fn crud_put_overwrites_existing<D: Datastore>(store: &D) {
    let key = Key::new("/crud/k2");
    store.put(&key, Bytes::from("original")).await.expect("put");
    store.put(&key, Bytes::from("updated")).await.expect("overwrite");
    assert_eq!(store.get(&key).await.expect("get"), Bytes::from("updated"));
}

/// `delete` removes a key, and deleting it again is a no-op.
pub async fn crud_delete_is_idempotent<D: Datastore>(store: &D) {
    let key = Key::new("/crud/k3");
    store.put(&key, Bytes::from("v")).await.expect("put");
    store.delete(&key).await.expect("first delete");
    store.delete(&key).await.expect("second delete should be a no-op");
    assert!(!store.has(&key).await.expect("has after delete"));
}

/// Keys that normalize to the same canonical form address the same value.
pub async fn crud_normalized_keys_are_equal<D: Datastore>(store: &D) {
    store.put(&Key::new("crud//norm/"), Bytes::from("n")).await.expect("put");
    assert_eq!(store.get(&Key::new("/crud/norm")).await.expect("get"), Bytes::from("n"));
}

// ============================================================================
// Query: prefix, filters, orders, paging, keys-only (5 checks)
// ============================================================================

async fn seed_query_namespace<D: Datastore>(store: &D, ns: &str, count: usize) {
    for i in 0..count {
        let key = Key::new(format!("/{ns}/{i:02}"));
        store.put(&key, Bytes::from(format!("v{i}"))).await.expect("seed put");
    }
}

/// A prefix query returns exactly the keys under that prefix.
pub async fn query_prefix_selects_namespace<D: Datastore>(store: &D) {
    seed_query_namespace(store, "qprefix", 4).await;
    store.put(&Key::new("/qprefixed"), Bytes::new()).await.expect("put sibling");

    let found: Vec<Pair> =
        store.query(&Query::new().with_prefix("/qprefix/")).try_collect().await.expect("query");
    assert_eq!(found.len(), 4, "prefix query should not match siblings: {found:?}");
    assert!(found.iter().all(|p| p.key.as_str().starts_with("/qprefix/")));
}

/// Filters combine with logical AND.
pub async fn query_filters_are_anded<D: Datastore>(store: &D) {
    seed_query_namespace(store, "qfilter", 6).await;
    let q = Query::new()
        .with_prefix("/qfilter/")
        .with_filter(|p| p.key.name() >= "02")
        .with_filter(|p| p.key.name() <= "04");
    let mut found: Vec<Pair> = store.query(&q).try_collect().await.expect("query");
    found.sort_by(|a, b| a.key.cmp(&b.key));
    assert_eq!(key_strings(&found), vec!["/qfilter/02", "/qfilter/03", "/qfilter/04"]);
}

/// Orders determine output order regardless of storage order.
pub async fn query_order_is_applied<D: Datastore>(store: &D) {
    seed_query_namespace(store, "qorder", 3).await;
    let q = Query::new().with_prefix("/qorder/").with_order(query::descending_by_key());
    let found: Vec<Pair> = store.query(&q).try_collect().await.expect("query");
    assert_eq!(key_strings(&found), vec!["/qorder/02", "/qorder/01", "/qorder/00"]);
}

/// Offset and limit page through the ordered, filtered result.
pub async fn query_offset_and_limit_page<D: Datastore>(store: &D) {
    seed_query_namespace(store, "qpage", 10).await;
    let q = Query::new()
        .with_prefix("/qpage/")
        .with_order(query::ascending_by_key())
        .with_offset(2)
        .with_limit(3);
    let found: Vec<Pair> = store.query(&q).try_collect().await.expect("query");
    assert_eq!(key_strings(&found), vec!["/qpage/02", "/qpage/03", "/qpage/04"]);

    let past_end: Vec<Pair> =
        store.query(&q.clone().with_offset(10)).try_collect().await.expect("query past end");
    assert!(past_end.is_empty());
}

/// Keys-only queries return empty values and `query_keys` returns bare keys.
pub async fn query_keys_only_strips_values<D: Datastore>(store: &D) {
    seed_query_namespace(store, "qkeys", 2).await;
    let q = Query::new().with_prefix("/qkeys/").with_keys_only(true);
    let found: Vec<Pair> = store.query(&q).try_collect().await.expect("query");
    assert_eq!(found.len(), 2);
    assert!(found.iter().all(|p| p.value.is_empty()), "keys-only should strip values");

    let keys: Vec<Key> = store.query_keys(&q).try_collect().await.expect("query_keys");
    assert_eq!(keys.len(), 2);
}

// ============================================================================
// Bulk: put_many/get_many/delete_many (4 checks)
// ============================================================================

/// `put_many` stores every pair and re-yields them in arrival order.
pub async fn bulk_put_many_yields_in_order<D: Datastore>(store: &D) {
    let pairs: Vec<Pair> =
        (0..5).map(|i| Pair::new(Key::new(format!("/bulk/put/{i}")), Bytes::from("v"))).collect();
    let yielded: Vec<Pair> = store
        .put_many(stream::iter(pairs.clone()), AbortSignal::none())
        .try_collect()
        .await
        .expect("put_many");
    assert_eq!(yielded, pairs);
    for pair in &pairs {
        assert!(store.has(&pair.key).await.expect("has"), "{} should be stored", pair.key);
    }
}

/// `get_many` yields values in key order and fails at the first missing key.
pub async fn bulk_get_many_fails_on_missing<D: Datastore>(store: &D) {
    let present = Key::new("/bulk/get/present");
    store.put(&present, Bytes::from("p")).await.expect("put");
    let keys = vec![present.clone(), Key::new("/bulk/get/absent"), present];

    let out: Vec<_> = store.get_many(stream::iter(keys), AbortSignal::none()).collect().await;
    assert_eq!(out.len(), 2, "stream should end after the failure: {out:?}");
    assert_eq!(out[0].as_ref().expect("first value"), &Bytes::from("p"));
    assert_not_found!(&out[1]);
}

/// `delete_many` removes every key and re-yields it.
pub async fn bulk_delete_many_removes_keys<D: Datastore>(store: &D) {
    let keys: Vec<Key> = (0..3).map(|i| Key::new(format!("/bulk/del/{i}"))).collect();
    for key in &keys {
        store.put(key, Bytes::from("v")).await.expect("put");
    }
    let deleted: Vec<Key> = store
        .delete_many(stream::iter(keys.clone()), AbortSignal::none())
        .try_collect()
        .await
        .expect("delete_many");
    assert_eq!(deleted, keys);
    for key in &keys {
        assert!(!store.has(key).await.expect("has"));
    }
}

/// An abort signal fired mid-stream stops `put_many`; earlier puts survive.
pub async fn bulk_abort_keeps_completed_items<D: Datastore>(store: &D) {
    let token = CancellationToken::new();
    let pairs: Vec<Pair> =
        (0..4).map(|i| Pair::new(Key::new(format!("/bulk/abort/{i}")), Bytes::from("v"))).collect();

    let mut out = store.put_many(stream::iter(pairs.clone()), AbortSignal::from(token.clone()));
    out.next().await.expect("first item").expect("first put");
    token.cancel();
    let aborted = out.next().await.expect("aborted item");
    assert_aborted!(aborted);
    assert!(out.next().await.is_none(), "stream should end after abort");

    assert!(store.has(&pairs[0].key).await.expect("has"), "completed put must stay applied");
    assert!(!store.has(&pairs[1].key).await.expect("has"));
}

// ============================================================================
// Batch: commit ordering, re-commit, abort (3 checks)
// ============================================================================

/// Operations apply in insertion order: put, delete, put leaves the last value.
pub async fn batch_last_operation_wins<D: Datastore>(store: &D) {
    let key = Key::new("/batch/order");
    let mut batch = store.batch();
    batch.put(key.clone(), "1").delete(key.clone()).put(key.clone(), "2");
    batch.commit(AbortSignal::none()).await.expect("commit");
    assert_eq!(store.get(&key).await.expect("get"), Bytes::from("2"));
}

/// A committed batch cannot be committed again.
pub async fn batch_recommit_fails_without_effect<D: Datastore>(store: &D) {
    let key = Key::new("/batch/recommit");
    let mut batch = store.batch();
    batch.put(key.clone(), "first");
    batch.commit(AbortSignal::none()).await.expect("first commit");

    store.delete(&key).await.expect("delete");
    batch.put(key.clone(), "second");
    let err = batch.commit(AbortSignal::none()).await.expect_err("second commit must fail");
    assert_eq!(err.applied, 0);
    assert!(!store.has(&key).await.expect("has"), "failed re-commit must not write");
}

/// Committing with a fired abort signal applies nothing.
pub async fn batch_abort_before_commit<D: Datastore>(store: &D) {
    let token = CancellationToken::new();
    token.cancel();
    let ops = vec![BatchOperation::Put { key: Key::new("/batch/aborted"), value: Bytes::new() }];
    let err = store.commit_batch(ops, token.into()).await.expect_err("aborted commit");
    assert_eq!(err.applied, 0);
    assert!(err.source.is_aborted());
    assert!(!store.has(&Key::new("/batch/aborted")).await.expect("has"));
}

// ============================================================================
// Concurrent access: thread-safety under parallel access (2 checks)
// ============================================================================

/// Concurrent puts to different keys all succeed.
///
/// # Panics
///
/// Panics if any spawned task panics or any put fails.
pub async fn concurrent_puts_to_different_keys<D: Datastore + 'static>(store: Arc<D>) {
    let mut handles = Vec::new();
    for i in 0u32..20 {
        let store = Arc::clone(&store);
        handles.push(tokio::spawn(async move {
            let key = Key::new(format!("/conc/put/{i}"));
            store.put(&key, Bytes::from(i.to_string())).await
        }));
    }
    for handle in handles {
        handle.await.expect("task join").expect("concurrent put");
    }
    for i in 0u32..20 {
        let val = store.get(&Key::new(format!("/conc/put/{i}"))).await.expect("get");
        assert_eq!(val, Bytes::from(i.to_string()));
    }
}

/// Concurrent reads of the same key all return the same value.
pub async fn concurrent_reads_return_consistent_value<D: Datastore + 'static>(store: Arc<D>) {
    let key = Key::new("/conc/read");
    store.put(&key, Bytes::from("stable")).await.expect("put");

    let mut handles = Vec::new();
    for _ in 0..20 {
        let store = Arc::clone(&store);
        let key = key.clone();
        handles.push(tokio::spawn(async move { store.get(&key).await }));
    }
    for handle in handles {
        let val = handle.await.expect("task join").expect("concurrent get");
        assert_eq!(val, Bytes::from("stable"));
    }
}

// ============================================================================
// Convenience runner: run all conformance checks against a single backend
// ============================================================================

/// Run the full conformance suite against the given datastore.
///
/// ```no_run
/// use std::sync::Arc;
/// use inferadb_common_datastore::{MemoryDatastore, conformance};
///
/// #[tokio::test]
/// async fn memory_datastore_conformance() {
///     conformance::run_all(Arc::new(MemoryDatastore::new())).await;
/// }
/// ```
pub async fn run_all<D: Datastore + 'static>(store: Arc<D>) {
    // CRUD
    crud_get_missing_is_not_found(store.as_ref()).await;
    crud_has_missing_is_false(store.as_ref()).await;
    crud_put_then_get_returns_value(store.as_ref()).await;
    crud_put_overwrites_existing(store.as_ref()).await;
    crud_delete_is_idempotent(store.as_ref()).await;
    crud_normalized_keys_are_equal(store.as_ref()).await;

    // Query
    query_prefix_selects_namespace(store.as_ref()).await;
    query_filters_are_anded(store.as_ref()).await;
    query_order_is_applied(store.as_ref()).await;
    query_offset_and_limit_page(store.as_ref()).await;
    query_keys_only_strips_values(store.as_ref()).await;

    // Bulk
    bulk_put_many_yields_in_order(store.as_ref()).await;
    bulk_get_many_fails_on_missing(store.as_ref()).await;
    bulk_delete_many_removes_keys(store.as_ref()).await;
    bulk_abort_keeps_completed_items(store.as_ref()).await;

    // Batch
    batch_last_operation_wins(store.as_ref()).await;
    batch_recommit_fails_without_effect(store.as_ref()).await;
    batch_abort_before_commit(store.as_ref()).await;

    // Concurrent
    concurrent_puts_to_different_keys(Arc::clone(&store)).await;
    concurrent_reads_return_consistent_value(Arc::clone(&store)).await;
}
