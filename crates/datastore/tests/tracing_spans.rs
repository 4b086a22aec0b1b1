//! Integration test verifying that `#[instrument]` annotations produce
//! the expected spans on `MemoryDatastore` operations.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use bytes::Bytes;
use inferadb_common_datastore::{AbortSignal, Datastore, Key, MemoryDatastore};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names as they are created
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
    }
}

/// Installs a collector for the current thread and returns the recorded names.
fn collect() -> (Arc<Mutex<Vec<String>>>, tracing::subscriber::DefaultGuard) {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    let subscriber = tracing_subscriber::registry().with(collector);
    (spans, tracing::subscriber::set_default(subscriber))
}

fn assert_span(spans: &Arc<Mutex<Vec<String>>>, name: &str) {
    let recorded = spans.lock().expect("lock poisoned");
    assert!(recorded.iter().any(|s| s == name), "expected a '{name}' span, got: {recorded:?}");
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn memory_datastore_put_creates_span() {
    let (spans, _guard) = collect();
    let store = MemoryDatastore::new();
    store.put(&Key::new("/k"), Bytes::from("v")).await.expect("put should succeed");
    assert_span(&spans, "put");
}

#[tokio::test]
async fn memory_datastore_get_creates_span() {
    let (spans, _guard) = collect();
    let store = MemoryDatastore::new();
    let _ = store.get(&Key::new("/missing")).await;
    assert_span(&spans, "get");
}

#[tokio::test]
async fn memory_datastore_has_creates_span() {
    let (spans, _guard) = collect();
    let store = MemoryDatastore::new();
    store.has(&Key::new("/k")).await.expect("has should succeed");
    assert_span(&spans, "has");
}

#[tokio::test]
async fn memory_datastore_delete_creates_span() {
    let (spans, _guard) = collect();
    let store = MemoryDatastore::new();
    store.delete(&Key::new("/k")).await.expect("delete should succeed");
    assert_span(&spans, "delete");
}

#[tokio::test]
async fn memory_datastore_commit_batch_creates_span() {
    let (spans, _guard) = collect();
    let store = MemoryDatastore::new();
    let mut batch = store.batch();
    batch.put(Key::new("/k"), "v");
    batch.commit(AbortSignal::none()).await.expect("commit should succeed");
    assert_span(&spans, "commit_batch");
}
