//! Query descriptors and the engine that executes them.
//!
//! A [`Query`] only describes what to return. [`execute`] lowers it onto a
//! backend's raw pair stream as a fixed pipeline of
//! [sequence utilities](crate::stream):
//!
//! | Stage | Utility | Skipped when |
//! |-------|---------|--------------|
//! | 1. prefix | [`filter`] | no prefix |
//! | 2. filters (AND) | [`filter`] | no filters |
//! | 3. orders | [`try_sort_all`] per order | no orders |
//! | 4. offset | [`filter`] with a counter | offset absent or zero |
//! | 5. limit | [`take`] | no limit |
//! | 6. keys-only | [`map`] | flag unset |
//!
//! Every stage but the orders is lazy. Each order drains everything that
//! survived the filters, so memory use grows with the filtered result size.
//!
//! Errors from the raw stream pass through every stage untouched, and the
//! pipeline ends right after the first one.
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use futures::{StreamExt, TryStreamExt, stream};
//! use inferadb_common_datastore::{Key, Pair, query::{self, Query}};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let pairs = ["/b", "/a/x", "/a/y"].map(|k| Ok(Pair::new(Key::new(k), Bytes::new())));
//! let query = Query::new().with_prefix("/a/").with_order(query::ascending_by_key()).with_limit(1);
//!
//! let found: Vec<Pair> = query::execute(stream::iter(pairs).boxed(), &query).try_collect().await?;
//! assert_eq!(found[0].key, Key::new("/a/x"));
//! # Ok::<(), inferadb_common_datastore::DatastoreError>(())
//! # }).unwrap();
//! ```

use std::{fmt, sync::Arc};

use tracing::trace;

use crate::{
    stream::{filter, map, stop_after_error, take, try_sort_all},
    types::{Pair, PairStream},
};

/// Predicate a pair must satisfy to be returned.
pub type Filter = Arc<dyn Fn(&Pair) -> bool + Send + Sync>;

/// Reordering of the complete surviving result set.
pub type Order = Arc<dyn Fn(Vec<Pair>) -> Vec<Pair> + Send + Sync>;

/// Declarative description of a datastore query.
///
/// Built with the consuming `with_*` methods. The engine only ever borrows
/// a query, so the same descriptor can be executed any number of times.
#[derive(Clone, Default)]
pub struct Query {
    prefix: Option<String>,
    filters: Vec<Filter>,
    orders: Vec<Order>,
    offset: Option<usize>,
    limit: Option<usize>,
    keys_only: bool,
}

impl Query {
    /// Creates a query that returns every pair.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Only returns pairs whose canonical key string starts with `prefix`.
    ///
    /// This is a plain string prefix: `/a` also matches `/ab`. Use `/a/` to
    /// restrict the result to descendants of `/a`.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Adds a filter. A pair must pass every filter to be returned.
    #[must_use]
    pub fn with_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&Pair) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(f));
        self
    }

    /// Adds an order. Orders apply in the sequence they were added.
    #[must_use]
    pub fn with_order<F>(mut self, f: F) -> Self
    where
        F: Fn(Vec<Pair>) -> Vec<Pair> + Send + Sync + 'static,
    {
        self.orders.push(Arc::new(f));
        self
    }

    /// Skips the first `offset` pairs that survive filtering and ordering.
    #[must_use]
    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Returns at most `limit` pairs.
    #[must_use]
    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Strips values from the returned pairs.
    #[must_use]
    pub fn with_keys_only(mut self, keys_only: bool) -> Self {
        self.keys_only = keys_only;
        self
    }

    /// Returns the key prefix, if any.
    #[must_use]
    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Returns the filters in application order.
    #[must_use]
    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Returns the orders in application order.
    #[must_use]
    pub fn orders(&self) -> &[Order] {
        &self.orders
    }

    /// Returns the offset, if any.
    #[must_use]
    pub fn offset(&self) -> Option<usize> {
        self.offset
    }

    /// Returns the limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<usize> {
        self.limit
    }

    /// Returns `true` if values are stripped from results.
    #[must_use]
    pub fn is_keys_only(&self) -> bool {
        self.keys_only
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("prefix", &self.prefix)
            .field("filters", &self.filters.len())
            .field("orders", &self.orders.len())
            .field("offset", &self.offset)
            .field("limit", &self.limit)
            .field("keys_only", &self.keys_only)
            .finish()
    }
}

/// Order that sorts pairs ascending by [`Key`](crate::Key) ordering.
#[must_use]
pub fn ascending_by_key() -> impl Fn(Vec<Pair>) -> Vec<Pair> + Send + Sync + 'static {
    |mut pairs: Vec<Pair>| {
        pairs.sort_by(|a, b| a.key.cmp(&b.key));
        pairs
    }
}

/// Order that sorts pairs descending by [`Key`](crate::Key) ordering.
#[must_use]
pub fn descending_by_key() -> impl Fn(Vec<Pair>) -> Vec<Pair> + Send + Sync + 'static {
    |mut pairs: Vec<Pair>| {
        pairs.sort_by(|a, b| b.key.cmp(&a.key));
        pairs
    }
}

/// Runs `query` over a backend's raw pair stream.
///
/// Returns a fresh lazy stream on every call; `query` is never modified.
pub fn execute<'a>(source: PairStream<'a>, query: &Query) -> PairStream<'a> {
    trace!(?query, "executing query");

    let mut it = stop_after_error(source);

    if let Some(prefix) = query.prefix.clone() {
        it = filter(it, move |item| match item {
            Ok(pair) => pair.key.as_str().starts_with(prefix.as_str()),
            Err(_) => true,
        });
    }

    if !query.filters.is_empty() {
        let filters = query.filters.clone();
        it = filter(it, move |item| match item {
            Ok(pair) => filters.iter().all(|f| f(pair)),
            Err(_) => true,
        });
    }

    for order in &query.orders {
        let order = Arc::clone(order);
        it = try_sort_all(it, move |pairs| order(pairs));
    }

    if let Some(offset) = query.offset.filter(|offset| *offset > 0) {
        let mut skipped = 0usize;
        it = filter(it, move |item| {
            if item.is_err() || skipped >= offset {
                return true;
            }
            skipped += 1;
            false
        });
    }

    if let Some(limit) = query.limit {
        it = take(it, limit);
    }

    if query.keys_only {
        it = map(it, |item| item.map(Pair::without_value));
    }

    it
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use bytes::Bytes;
    use futures::{StreamExt, TryStreamExt, stream};

    use super::*;
    use crate::{DatastoreError, Key};

    fn source(pairs: Vec<Pair>) -> PairStream<'static> {
        stream::iter(pairs.into_iter().map(Ok)).boxed()
    }

    /// Ten sequential keys; six of them live under `/users/`.
    fn dataset() -> Vec<Pair> {
        (0..10)
            .map(|i| {
                let ns = if i % 5 < 3 { "users" } else { "groups" };
                Pair::new(Key::new(format!("/{ns}/{i:02}")), Bytes::from(format!("v{i}")))
            })
            .collect()
    }

    async fn run(query: &Query) -> Vec<Pair> {
        execute(source(dataset()), query).try_collect().await.unwrap()
    }

    fn key_strings(pairs: &[Pair]) -> Vec<&str> {
        pairs.iter().map(|p| p.key.as_str()).collect()
    }

    #[tokio::test]
    async fn test_empty_query_returns_everything_in_source_order() {
        let out = run(&Query::new()).await;
        assert_eq!(out, dataset());
    }

    #[tokio::test]
    async fn test_prefix_then_offset_and_limit_select_positions_two_to_four() {
        let filtered_sorted = run(&Query::new().with_prefix("/users/").with_order(ascending_by_key())).await;
        assert_eq!(filtered_sorted.len(), 6);

        let query = Query::new()
            .with_prefix("/users/")
            .with_order(ascending_by_key())
            .with_offset(2)
            .with_limit(3);
        let page = run(&query).await;
        assert_eq!(page, filtered_sorted[2..5].to_vec());
        assert_eq!(key_strings(&page), vec!["/users/02", "/users/05", "/users/06"]);
    }

    #[tokio::test]
    async fn test_prefix_is_a_string_prefix() {
        let pairs = vec![
            Pair::new(Key::new("/a"), Bytes::new()),
            Pair::new(Key::new("/ab"), Bytes::new()),
            Pair::new(Key::new("/a/b"), Bytes::new()),
        ];
        let out: Vec<Pair> =
            execute(source(pairs.clone()), &Query::new().with_prefix("/a")).try_collect().await.unwrap();
        assert_eq!(out.len(), 3);
        let out: Vec<Pair> =
            execute(source(pairs), &Query::new().with_prefix("/a/")).try_collect().await.unwrap();
        assert_eq!(key_strings(&out), vec!["/a/b"]);
    }

    #[tokio::test]
    async fn test_filters_are_anded_and_short_circuit() {
        let second_calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&second_calls);
        let query = Query::new()
            .with_filter(|p| p.key.as_str().starts_with("/users/"))
            .with_filter(move |p| {
                counter.fetch_add(1, Ordering::SeqCst);
                p.value != Bytes::from("v0")
            });
        let out = run(&query).await;
        assert_eq!(key_strings(&out), vec!["/users/01", "/users/02", "/users/05", "/users/06", "/users/07"]);
        // The second filter only sees pairs that passed the first.
        assert_eq!(second_calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_orders_apply_in_sequence() {
        let query = Query::new().with_order(ascending_by_key()).with_order(|mut pairs| {
            pairs.truncate(3);
            pairs
        });
        let out = run(&query).await;
        assert_eq!(key_strings(&out), vec!["/users/00", "/users/01", "/users/02"]);

        let out = run(&Query::new().with_order(descending_by_key()).with_limit(2)).await;
        assert_eq!(key_strings(&out), vec!["/groups/09", "/groups/08"]);
    }

    #[tokio::test]
    async fn test_key_order_helpers_plug_into_with_order() {
        let asc = Query::new().with_order(ascending_by_key());
        let desc = Query::new().with_order(descending_by_key());
        assert_eq!(asc.orders().len(), 1);
        assert_eq!(desc.orders().len(), 1);

        let forward = run(&asc).await;
        let mut backward = run(&desc).await;
        assert_eq!(forward.len(), dataset().len());
        backward.reverse();
        assert_eq!(key_strings(&forward), key_strings(&backward));

        let stored = Arc::clone(&asc.orders()[0]);
        let sorted =
            stored(vec![Pair::new(Key::new("/b"), Bytes::new()), Pair::new(Key::new("/a"), Bytes::new())]);
        assert_eq!(key_strings(&sorted), vec!["/a", "/b"]);
    }

    #[tokio::test]
    async fn test_offset_past_end_and_zero_limit_are_empty() {
        assert!(run(&Query::new().with_offset(50)).await.is_empty());
        assert!(run(&Query::new().with_limit(0)).await.is_empty());
        assert_eq!(run(&Query::new().with_offset(0)).await.len(), 10);
    }

    #[tokio::test]
    async fn test_keys_only_strips_values() {
        let out = run(&Query::new().with_keys_only(true).with_limit(2)).await;
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|p| p.value.is_empty()));
        assert_eq!(out[0].key, Key::new("/users/00"));
    }

    #[tokio::test]
    async fn test_query_is_re_executable() {
        let query = Query::new().with_prefix("/groups/").with_offset(1);
        let first = run(&query).await;
        let second = run(&query).await;
        assert_eq!(first, second);
        assert_eq!(query.prefix(), Some("/groups/"));
        assert_eq!(query.offset(), Some(1));
    }

    #[tokio::test]
    async fn test_errors_pass_through_and_end_the_stream() {
        let items = vec![
            Ok(Pair::new(Key::new("/users/00"), Bytes::new())),
            Ok(Pair::new(Key::new("/groups/01"), Bytes::new())),
            Err(DatastoreError::read_failed("disk on fire")),
            Ok(Pair::new(Key::new("/users/02"), Bytes::new())),
        ];
        let query = Query::new().with_prefix("/users/").with_offset(1);
        let out: Vec<_> = execute(stream::iter(items).boxed(), &query).collect().await;
        assert_eq!(out.len(), 1);
        assert!(matches!(out[0], Err(DatastoreError::ReadFailed { .. })));
    }

    #[tokio::test]
    async fn test_error_before_order_skips_sorting() {
        let items = vec![
            Ok(Pair::new(Key::new("/b"), Bytes::new())),
            Err(DatastoreError::read_failed("truncated")),
        ];
        let out: Vec<_> =
            execute(stream::iter(items).boxed(), &Query::new().with_order(ascending_by_key()))
                .collect()
                .await;
        assert_eq!(out.len(), 1);
        assert!(out[0].is_err());
    }

    #[test]
    fn test_debug_reports_counts() {
        let query = Query::new().with_filter(|_| true).with_limit(4);
        let rendered = format!("{query:?}");
        assert!(rendered.contains("filters: 1"), "{rendered}");
        assert!(rendered.contains("limit: Some(4)"), "{rendered}");
    }
}
