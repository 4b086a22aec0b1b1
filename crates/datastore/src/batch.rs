//! Batched writes against a single datastore.
//!
//! A [`Batch`] records puts and deletes in memory and applies them with one
//! [`commit`](Batch::commit). Nothing reaches the datastore before the
//! commit, and a batch that is dropped uncommitted has no effect.
//!
//! # Examples
//!
//! ```
//! use bytes::Bytes;
//! use inferadb_common_datastore::{AbortSignal, Datastore, Key, MemoryDatastore};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = MemoryDatastore::new();
//! let key = Key::new("/counter");
//!
//! let mut batch = store.batch();
//! batch.put(key.clone(), Bytes::from("1"));
//! batch.delete(key.clone());
//! batch.put(key.clone(), Bytes::from("2"));
//!
//! let stats = batch.commit(AbortSignal::none()).await?;
//! assert_eq!(stats.operations_count, 3);
//! assert_eq!(store.get(&key).await?, Bytes::from("2"));
//! # Ok::<(), inferadb_common_datastore::DatastoreError>(())
//! # }).unwrap();
//! ```
//!
//! # Commit Semantics
//!
//! Operations apply in insertion order, so the last operation on a key wins.
//! How much of a failed commit survives depends on the backend: the default
//! [`Datastore::commit_batch`] applies sequentially and stops at the first
//! failure, reporting the applied prefix in [`BatchCommitError::applied`];
//! backends may instead commit all-or-nothing.
//!
//! A batch commits at most once. The first call to `commit` consumes the
//! recorded operations whether or not it succeeds, and every later call
//! fails with [`WriteFailed`](DatastoreError::WriteFailed) without touching
//! the datastore. Puts and deletes recorded after the first commit are
//! dropped.

use std::time::{Duration, Instant};

use bytes::Bytes;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{AbortSignal, Datastore, DatastoreError, Key};

/// Single write operation in a batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOperation {
    /// Stores a value, replacing any previous one.
    Put {
        /// The key to store.
        key: Key,
        /// The value to associate with the key.
        value: Bytes,
    },
    /// Removes a key. No-op if the key does not exist.
    Delete {
        /// The key to remove.
        key: Key,
    },
}

impl BatchOperation {
    /// Returns the key this operation targets.
    #[must_use]
    pub fn key(&self) -> &Key {
        match self {
            BatchOperation::Put { key, .. } | BatchOperation::Delete { key } => key,
        }
    }
}

/// Statistics from a successful commit.
#[derive(Debug, Clone, Default)]
pub struct BatchCommitStats {
    /// Number of operations committed.
    pub operations_count: usize,
    /// Number of puts among them.
    pub puts_count: usize,
    /// Number of deletes among them.
    pub deletes_count: usize,
    /// Time taken to commit.
    pub duration: Duration,
}

/// A failed commit, with the number of operations that were applied first.
///
/// `applied` operations (a prefix of the batch, in insertion order) stay
/// applied; the rest were never attempted.
#[derive(Debug, Clone, Error)]
#[error("batch commit failed after {applied} applied operations: {source}")]
pub struct BatchCommitError {
    /// Operations applied before the failure.
    pub applied: usize,
    /// The failure itself.
    #[source]
    pub source: DatastoreError,
}

impl From<BatchCommitError> for DatastoreError {
    fn from(err: BatchCommitError) -> Self {
        err.source
    }
}

/// Accumulates writes for one datastore and commits them together.
///
/// Mutation and commit take `&mut self`, so a batch cannot be changed while
/// its commit is running.
pub struct Batch<'a, D: Datastore + ?Sized> {
    store: &'a D,
    operations: Vec<BatchOperation>,
    committed: bool,
}

impl<'a, D: Datastore + ?Sized> Batch<'a, D> {
    /// Creates an empty batch bound to `store`.
    ///
    /// Usually obtained through [`Datastore::batch`].
    #[must_use]
    pub fn new(store: &'a D) -> Self {
        Self { store, operations: Vec::new(), committed: false }
    }

    /// Records a put.
    ///
    /// Ignored once the batch has been committed.
    pub fn put(&mut self, key: Key, value: impl Into<Bytes>) -> &mut Self {
        self.record(BatchOperation::Put { key, value: value.into() })
    }

    /// Records a delete.
    ///
    /// Ignored once the batch has been committed.
    pub fn delete(&mut self, key: Key) -> &mut Self {
        self.record(BatchOperation::Delete { key })
    }

    fn record(&mut self, operation: BatchOperation) -> &mut Self {
        if self.committed {
            warn!(key = %operation.key(), "ignoring write recorded after batch commit");
        } else {
            self.operations.push(operation);
        }
        self
    }

    /// Returns the number of pending operations.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.operations.len()
    }

    /// Returns the pending operations in insertion order.
    #[must_use]
    pub fn pending_operations(&self) -> &[BatchOperation] {
        &self.operations
    }

    /// Returns `true` once [`commit`](Self::commit) has been called.
    #[must_use]
    pub fn is_committed(&self) -> bool {
        self.committed
    }

    /// Discards pending operations without applying them.
    pub fn clear(&mut self) {
        self.operations.clear();
    }

    /// Applies every pending operation through
    /// [`Datastore::commit_batch`].
    ///
    /// # Errors
    ///
    /// Returns [`BatchCommitError`] if the batch was already committed
    /// (with `applied == 0` and a [`WriteFailed`](DatastoreError::WriteFailed)
    /// source), or if the datastore fails to apply an operation.
    pub async fn commit(&mut self, signal: AbortSignal) -> Result<BatchCommitStats, BatchCommitError> {
        if self.committed {
            warn!("rejecting second commit of batch");
            return Err(BatchCommitError {
                applied: 0,
                source: DatastoreError::write_failed("batch already committed"),
            });
        }
        self.committed = true;

        let operations = std::mem::take(&mut self.operations);
        let start = Instant::now();
        let operations_count = operations.len();
        let puts_count =
            operations.iter().filter(|op| matches!(op, BatchOperation::Put { .. })).count();
        let deletes_count = operations_count - puts_count;

        debug!(operations = operations_count, puts = puts_count, deletes = deletes_count, "Committing batch");

        self.store.commit_batch(operations, signal).await?;

        let stats =
            BatchCommitStats { operations_count, puts_count, deletes_count, duration: start.elapsed() };
        debug!(
            operations = stats.operations_count,
            duration_ms = stats.duration.as_millis(),
            "Batch commit complete"
        );
        Ok(stats)
    }
}

impl<D: Datastore + ?Sized> std::fmt::Debug for Batch<'_, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Batch")
            .field("operations", &self.operations)
            .field("committed", &self.committed)
            .finish_non_exhaustive()
    }
}
