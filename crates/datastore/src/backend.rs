//! Datastore trait definition.
//!
//! This module defines the [`Datastore`] trait, the contract every key/value
//! backend implements. Backends provide a handful of single-item primitives
//! plus a raw enumeration of their pairs; everything else (queries, bulk
//! operations, batch commit) is built once on top of those primitives as
//! default methods.
//!
//! # Implementing a Backend
//!
//! 1. Implement the required methods: [`open`](Datastore::open),
//!    [`close`](Datastore::close), [`put`](Datastore::put),
//!    [`get`](Datastore::get), [`has`](Datastore::has),
//!    [`delete`](Datastore::delete) and [`entries`](Datastore::entries).
//! 2. Map backend-specific faults onto [`DatastoreError`] with its
//!    constructor helpers.
//! 3. Optionally override [`commit_batch`](Datastore::commit_batch) when the
//!    backend can apply a batch atomically.
//!
//! See [`MemoryDatastore`](crate::MemoryDatastore) for a reference
//! implementation, and [`conformance`](crate::conformance) for the checks a
//! backend is expected to pass.

use std::pin::pin;

use async_stream::stream;
use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt};
use tracing::{debug, warn};

use crate::{
    AbortSignal, Key,
    batch::{Batch, BatchCommitError, BatchOperation},
    error::DatastoreResult,
    query::{self, Query},
    stream::map,
    types::{KeyStream, Pair, PairStream, ValueStream},
};

/// Abstract key/value datastore.
///
/// Backends must be thread-safe (`Send + Sync`). Operations issued by
/// different callers are not serialized against each other unless the
/// backend documents stronger isolation.
///
/// # Operations
///
/// | Method | Kind | Description |
/// |--------|------|-------------|
/// | [`put`](Datastore::put) | required | Store a value, replacing any previous one |
/// | [`get`](Datastore::get) | required | Fetch a value, `NotFound` when absent |
/// | [`has`](Datastore::has) | required | Existence check, never `NotFound` |
/// | [`delete`](Datastore::delete) | required | Remove a key, no-op when absent |
/// | [`entries`](Datastore::entries) | required | Raw enumeration of all pairs |
/// | [`query`](Datastore::query) | provided | Run a [`Query`] over [`entries`](Datastore::entries) |
/// | [`put_many`](Datastore::put_many) | provided | Lazy bulk put |
/// | [`get_many`](Datastore::get_many) | provided | Lazy bulk get |
/// | [`delete_many`](Datastore::delete_many) | provided | Lazy bulk delete |
/// | [`batch`](Datastore::batch) | provided | Start a [`Batch`] |
///
/// # Example
///
/// ```
/// use bytes::Bytes;
/// use inferadb_common_datastore::{Datastore, Key, MemoryDatastore};
///
/// # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
/// let store = MemoryDatastore::new();
/// store.open().await?;
///
/// let key = Key::new("/users/alice");
/// store.put(&key, Bytes::from("admin")).await?;
/// assert_eq!(store.get(&key).await?, Bytes::from("admin"));
/// assert!(!store.has(&Key::new("/users/bob")).await?);
/// # Ok::<(), inferadb_common_datastore::DatastoreError>(())
/// # }).unwrap();
/// ```
#[async_trait]
pub trait Datastore: Send + Sync {
    /// Prepares the backend for use.
    ///
    /// # Errors
    ///
    /// Returns [`OpenFailed`](crate::DatastoreError::OpenFailed) when the
    /// underlying medium cannot be opened.
    async fn open(&self) -> DatastoreResult<()>;

    /// Releases backend resources. Closing twice is not an error.
    async fn close(&self) -> DatastoreResult<()>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns [`WriteFailed`](crate::DatastoreError::WriteFailed) when the
    /// write cannot be applied.
    async fn put(&self, key: &Key, value: Bytes) -> DatastoreResult<()>;

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`NotFound`](crate::DatastoreError::NotFound) when the key is
    /// absent.
    async fn get(&self, key: &Key) -> DatastoreResult<Bytes>;

    /// Returns whether `key` exists.
    ///
    /// Absence is `Ok(false)`; only genuine faults are errors.
    async fn has(&self, key: &Key) -> DatastoreResult<bool>;

    /// Removes `key`. Removing an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`DeleteFailed`](crate::DatastoreError::DeleteFailed) when the
    /// delete cannot be applied.
    async fn delete(&self, key: &Key) -> DatastoreResult<()>;

    /// Enumerates the backend's pairs in no particular order.
    ///
    /// `query` is passed as a hint so backends can push work down (a prefix
    /// scan, say), but the result is always run through the full query
    /// pipeline afterwards. Returning every pair is correct.
    fn entries<'a>(&'a self, query: &Query) -> PairStream<'a>;

    /// Runs `query` and returns its lazy result stream.
    fn query<'a>(&'a self, query: &Query) -> PairStream<'a> {
        query::execute(self.entries(query), query)
    }

    /// Runs `query` and returns only the keys.
    fn query_keys<'a>(&'a self, query: &Query) -> KeyStream<'a> {
        map(self.query(query), |item| item.map(|pair| pair.key))
    }

    /// [`put`](Datastore::put) that first checks `signal`.
    ///
    /// # Errors
    ///
    /// Returns [`Aborted`](crate::DatastoreError::Aborted) if the signal has
    /// fired, otherwise whatever `put` returns.
    async fn put_with_signal(
        &self,
        key: &Key,
        value: Bytes,
        signal: &AbortSignal,
    ) -> DatastoreResult<()> {
        signal.check()?;
        self.put(key, value).await
    }

    /// [`delete`](Datastore::delete) that first checks `signal`.
    ///
    /// # Errors
    ///
    /// Returns [`Aborted`](crate::DatastoreError::Aborted) if the signal has
    /// fired, otherwise whatever `delete` returns.
    async fn delete_with_signal(&self, key: &Key, signal: &AbortSignal) -> DatastoreResult<()> {
        signal.check()?;
        self.delete(key).await
    }

    /// Stores every pair from `source`, re-yielding each one once stored.
    ///
    /// Input is pulled one pair at a time, so `source` may be unbounded. The
    /// stream fails at the first failed put (or fired `signal`) and ends
    /// there; pairs stored before the failure stay stored and later pairs are
    /// never attempted.
    fn put_many<'a, S>(&'a self, source: S, signal: AbortSignal) -> PairStream<'a>
    where
        S: Stream<Item = Pair> + Send + 'a,
        Self: Sized,
    {
        Box::pin(stream! {
            let mut source = pin!(source);
            let mut stored = 0usize;
            while let Some(pair) = source.next().await {
                if let Err(err) = self.put_with_signal(&pair.key, pair.value.clone(), &signal).await {
                    warn!(key = %pair.key, stored, error = %err, "put_many stopped");
                    yield Err(err);
                    return;
                }
                stored += 1;
                yield Ok(pair);
            }
            debug!(stored, "put_many complete");
        })
    }

    /// Fetches the value of every key from `source`, in arrival order.
    ///
    /// An absent key fails the stream with
    /// [`NotFound`](crate::DatastoreError::NotFound) at that point.
    fn get_many<'a, S>(&'a self, source: S, signal: AbortSignal) -> ValueStream<'a>
    where
        S: Stream<Item = Key> + Send + 'a,
        Self: Sized,
    {
        Box::pin(stream! {
            let mut source = pin!(source);
            let mut fetched = 0usize;
            while let Some(key) = source.next().await {
                let result = match signal.check() {
                    Ok(()) => self.get(&key).await,
                    Err(err) => Err(err),
                };
                match result {
                    Ok(value) => {
                        fetched += 1;
                        yield Ok(value);
                    },
                    Err(err) => {
                        warn!(key = %key, fetched, error = %err, "get_many stopped");
                        yield Err(err);
                        return;
                    },
                }
            }
            debug!(fetched, "get_many complete");
        })
    }

    /// Deletes every key from `source`, re-yielding each one once deleted.
    ///
    /// Same failure behavior as [`put_many`](Datastore::put_many).
    fn delete_many<'a, S>(&'a self, source: S, signal: AbortSignal) -> KeyStream<'a>
    where
        S: Stream<Item = Key> + Send + 'a,
        Self: Sized,
    {
        Box::pin(stream! {
            let mut source = pin!(source);
            let mut deleted = 0usize;
            while let Some(key) = source.next().await {
                if let Err(err) = self.delete_with_signal(&key, &signal).await {
                    warn!(key = %key, deleted, error = %err, "delete_many stopped");
                    yield Err(err);
                    return;
                }
                deleted += 1;
                yield Ok(key);
            }
            debug!(deleted, "delete_many complete");
        })
    }

    /// Starts an empty batch bound to this datastore.
    fn batch(&self) -> Batch<'_, Self>
    where
        Self: Sized,
    {
        Batch::new(self)
    }

    /// Applies batch operations in order.
    ///
    /// The default applies them one at a time through
    /// [`put`](Datastore::put) and [`delete`](Datastore::delete), checking
    /// `signal` before each, and stops at the first failure. Operations
    /// applied before the failure stay applied; the error reports how many.
    /// Backends that can do better override this with an atomic commit.
    ///
    /// Callers normally go through [`Batch::commit`] instead.
    ///
    /// # Errors
    ///
    /// Returns [`BatchCommitError`] with the number of applied operations.
    async fn commit_batch(
        &self,
        operations: Vec<BatchOperation>,
        signal: AbortSignal,
    ) -> Result<(), BatchCommitError> {
        for (applied, operation) in operations.into_iter().enumerate() {
            let result = match signal.check() {
                Ok(()) => match &operation {
                    BatchOperation::Put { key, value } => self.put(key, value.clone()).await,
                    BatchOperation::Delete { key } => self.delete(key).await,
                },
                Err(err) => Err(err),
            };
            if let Err(source) = result {
                warn!(applied, key = %operation.key(), error = %source, "batch commit stopped");
                return Err(BatchCommitError { applied, source });
            }
        }
        Ok(())
    }
}
