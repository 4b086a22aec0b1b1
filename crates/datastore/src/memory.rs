//! In-memory datastore implementation.
//!
//! This module provides [`MemoryDatastore`], an in-memory implementation of
//! [`Datastore`] suitable for testing, development and as the reference
//! against which other backends are checked.
//!
//! # Features
//!
//! - **Thread-safe**: Uses [`parking_lot::RwLock`] for concurrent access
//! - **Ordered storage**: Pairs live in a [`BTreeMap`] keyed by canonical key
//!   string, so prefix queries become range scans
//! - **Atomic batches**: [`commit_batch`](Datastore::commit_batch) applies every
//!   operation under one write lock, or none of them
//! - **Size limits**: Oversized keys and values are rejected on write
//!
//! # Example
//!
//! ```
//! use bytes::Bytes;
//! use futures::TryStreamExt;
//! use inferadb_common_datastore::{Datastore, Key, MemoryDatastore, Query};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = MemoryDatastore::new();
//! store.put(&Key::new("/users/alice"), Bytes::from("a")).await?;
//! store.put(&Key::new("/groups/admins"), Bytes::from("g")).await?;
//!
//! let users: Vec<_> = store.query(&Query::new().with_prefix("/users/")).try_collect().await?;
//! assert_eq!(users.len(), 1);
//! # Ok::<(), inferadb_common_datastore::DatastoreError>(())
//! # }).unwrap();
//! ```
//!
//! # Performance Characteristics
//!
//! | Operation | Complexity |
//! |-----------|------------|
//! | get / has | O(log n) |
//! | put | O(log n) |
//! | delete | O(log n) |
//! | entries with prefix | O(log n + k) where k is the number of matches |
//! | commit_batch | O(m log n) where m is the batch size |
//!
//! # Limitations
//!
//! - Data is not persisted; all data is lost when the process exits
//! - [`entries`](Datastore::entries) copies matching pairs out under the read
//!   lock, so a query sees a snapshot taken when it starts
//! - The open flag is informational; a closed store still serves requests

use std::{
    collections::BTreeMap,
    ops::Bound,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

use async_trait::async_trait;
use bytes::Bytes;
use fail::fail_point;
use futures::{StreamExt, stream};
use parking_lot::RwLock;
use tracing::debug;

use crate::{
    AbortSignal, Datastore, Key, MemoryConfig,
    batch::{BatchCommitError, BatchOperation},
    error::{DatastoreError, DatastoreResult},
    query::Query,
    size_limits::validate_pair,
    types::{Pair, PairStream},
};

/// In-memory datastore backed by a [`BTreeMap`].
///
/// # Cloning
///
/// `MemoryDatastore` is cheaply cloneable via [`Arc`]. All clones share the
/// same data and open flag.
#[derive(Clone, Default)]
pub struct MemoryDatastore {
    data: Arc<RwLock<BTreeMap<String, Bytes>>>,
    open: Arc<AtomicBool>,
    config: MemoryConfig,
}

impl MemoryDatastore {
    /// Creates an empty datastore with default size limits.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty datastore with the given configuration.
    #[must_use]
    pub fn with_config(config: MemoryConfig) -> Self {
        Self { config, ..Self::default() }
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &MemoryConfig {
        &self.config
    }

    /// Returns the number of stored pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.data.read().len()
    }

    /// Returns `true` if nothing is stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.read().is_empty()
    }

    /// Returns `true` between [`open`](Datastore::open) and
    /// [`close`](Datastore::close).
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.open.load(Ordering::Acquire)
    }

    fn validate(&self, key: &Key, value: &Bytes) -> DatastoreResult<()> {
        validate_pair(key, value, self.config.size_limits())
            .map_err(|err| DatastoreError::write_failed_with_source(format!("put {key}"), err))
    }
}

impl std::fmt::Debug for MemoryDatastore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDatastore")
            .field("len", &self.len())
            .field("open", &self.is_open())
            .field("config", &self.config)
            .finish()
    }
}

#[async_trait]
impl Datastore for MemoryDatastore {
    async fn open(&self) -> DatastoreResult<()> {
        self.open.store(true, Ordering::Release);
        debug!("memory datastore opened");
        Ok(())
    }

    async fn close(&self) -> DatastoreResult<()> {
        if self.open.swap(false, Ordering::AcqRel) {
            debug!("memory datastore closed");
        }
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(key = %key, len = value.len()))]
    async fn put(&self, key: &Key, value: Bytes) -> DatastoreResult<()> {
        self.validate(key, &value)?;
        fail_point!("memory-put", |_| { Err(DatastoreError::write_failed("injected failure in put")) });
        self.data.write().insert(key.as_str().to_owned(), value);
        Ok(())
    }

    #[tracing::instrument(skip_all, fields(key = %key))]
    async fn get(&self, key: &Key) -> DatastoreResult<Bytes> {
        self.data.read().get(key.as_str()).cloned().ok_or_else(|| DatastoreError::not_found(key))
    }

    #[tracing::instrument(skip_all, fields(key = %key))]
    async fn has(&self, key: &Key) -> DatastoreResult<bool> {
        Ok(self.data.read().contains_key(key.as_str()))
    }

    #[tracing::instrument(skip_all, fields(key = %key))]
    async fn delete(&self, key: &Key) -> DatastoreResult<()> {
        self.data.write().remove(key.as_str());
        Ok(())
    }

    fn entries<'a>(&'a self, query: &Query) -> PairStream<'a> {
        let snapshot: Vec<DatastoreResult<Pair>> = {
            let data = self.data.read();
            let to_pair = |(k, v): (&String, &Bytes)| Ok(Pair::new(Key::from_raw(k.clone()), v.clone()));
            match query.prefix() {
                Some(prefix) => data
                    .range::<str, _>((Bound::Included(prefix), Bound::Unbounded))
                    .take_while(|(k, _)| k.starts_with(prefix))
                    .map(to_pair)
                    .collect(),
                None => data.iter().map(to_pair).collect(),
            }
        };
        debug!(count = snapshot.len(), prefix = ?query.prefix(), "memory entries snapshot");
        stream::iter(snapshot).boxed()
    }

    #[tracing::instrument(skip_all, fields(operations = operations.len()))]
    async fn commit_batch(
        &self,
        operations: Vec<BatchOperation>,
        signal: AbortSignal,
    ) -> Result<(), BatchCommitError> {
        let rejected = |source: DatastoreError| BatchCommitError { applied: 0, source };

        signal.check().map_err(rejected)?;
        for operation in &operations {
            if let BatchOperation::Put { key, value } = operation {
                self.validate(key, value).map_err(rejected)?;
            }
        }

        fail_point!("memory-before-commit", |_| {
            Err(rejected(DatastoreError::write_failed("injected failure before batch commit")))
        });

        let mut data = self.data.write();
        for operation in operations {
            match operation {
                BatchOperation::Put { key, value } => {
                    data.insert(key.as_str().to_owned(), value);
                },
                BatchOperation::Delete { key } => {
                    data.remove(key.as_str());
                },
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use futures::TryStreamExt;

    use super::*;
    use crate::SizeLimits;

    #[tokio::test]
    async fn test_basic_operations() {
        let store = MemoryDatastore::new();
        let key = Key::new("/a/b");

        store.put(&key, Bytes::from("v")).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Bytes::from("v"));
        assert!(store.has(&key).await.unwrap());

        store.delete(&key).await.unwrap();
        assert!(!store.has(&key).await.unwrap());
        assert!(store.get(&key).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let store = MemoryDatastore::new();
        let key = Key::new("/k");
        store.put(&key, Bytes::from("1")).await.unwrap();
        store.put(&key, Bytes::from("2")).await.unwrap();
        assert_eq!(store.get(&key).await.unwrap(), Bytes::from("2"));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn test_delete_absent_is_ok() {
        let store = MemoryDatastore::new();
        store.delete(&Key::new("/nothing")).await.unwrap();
    }

    #[tokio::test]
    async fn test_open_close_idempotent() {
        let store = MemoryDatastore::new();
        assert!(!store.is_open());
        store.open().await.unwrap();
        assert!(store.is_open());
        store.close().await.unwrap();
        store.close().await.unwrap();
        assert!(!store.is_open());
    }

    #[tokio::test]
    async fn test_clones_share_data() {
        let store = MemoryDatastore::new();
        let clone = store.clone();
        clone.put(&Key::new("/shared"), Bytes::from("x")).await.unwrap();
        assert!(store.has(&Key::new("/shared")).await.unwrap());
    }

    #[tokio::test]
    async fn test_oversized_value_rejected() {
        let config = MemoryConfig::builder().size_limits(SizeLimits::new(64, 4).unwrap()).build();
        let store = MemoryDatastore::with_config(config);
        let err = store.put(&Key::new("/k"), Bytes::from("too long")).await.unwrap_err();
        assert!(matches!(err, DatastoreError::WriteFailed { .. }));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_entries_prefix_pushdown() {
        let store = MemoryDatastore::new();
        for k in ["/a", "/a/1", "/a/2", "/ab", "/b"] {
            store.put(&Key::new(k), Bytes::new()).await.unwrap();
        }
        let hinted: Vec<Pair> =
            store.entries(&Query::new().with_prefix("/a/")).try_collect().await.unwrap();
        let keys: Vec<&str> = hinted.iter().map(|p| p.key.as_str()).collect();
        assert_eq!(keys, vec!["/a/1", "/a/2"]);

        let all: Vec<Pair> = store.entries(&Query::new()).try_collect().await.unwrap();
        assert_eq!(all.len(), 5);
    }

    #[tokio::test]
    async fn test_entries_prefix_edges() {
        let store = MemoryDatastore::new();
        for k in ["/m/1", "/m/2", "/z"] {
            store.put(&Key::new(k), Bytes::new()).await.unwrap();
        }

        let past_end: Vec<Pair> =
            store.entries(&Query::new().with_prefix("/zz")).try_collect().await.unwrap();
        assert!(past_end.is_empty());

        let empty_prefix: Vec<Pair> =
            store.entries(&Query::new().with_prefix("")).try_collect().await.unwrap();
        assert_eq!(empty_prefix.len(), 3);

        let exact: Vec<Pair> =
            store.entries(&Query::new().with_prefix("/z")).try_collect().await.unwrap();
        assert_eq!(exact.len(), 1);
        assert_eq!(exact[0].key.as_str(), "/z");
    }

    #[tokio::test]
    async fn test_entries_is_a_snapshot() {
        let store = MemoryDatastore::new();
        store.put(&Key::new("/a"), Bytes::new()).await.unwrap();
        let stream = store.entries(&Query::new());
        store.put(&Key::new("/b"), Bytes::new()).await.unwrap();
        let seen: Vec<Pair> = stream.try_collect().await.unwrap();
        assert_eq!(seen.len(), 1);
    }

    #[tokio::test]
    async fn test_batch_is_all_or_nothing() {
        let config = MemoryConfig::builder().size_limits(SizeLimits::new(64, 4).unwrap()).build();
        let store = MemoryDatastore::with_config(config);
        let mut batch = store.batch();
        batch.put(Key::new("/ok"), "tiny").put(Key::new("/big"), "far too large");

        let err = batch.commit(AbortSignal::none()).await.unwrap_err();
        assert_eq!(err.applied, 0);
        assert!(store.is_empty());
    }
}
