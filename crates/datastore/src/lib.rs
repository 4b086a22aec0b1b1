//! Key/value datastore abstraction.
//!
//! This crate provides the [`Datastore`] trait and the machinery every
//! backend shares: a hierarchical [`Key`] model, a lazy [`Query`] pipeline
//! over async streams, bulk operations, and [`Batch`] writes. Applications
//! program against the trait and stay agnostic to the persistence medium.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     Application Layer                       │
//! │          (works with Key, Query, Batch, Datastore)          │
//! ├─────────────────────────────────────────────────────────────┤
//! │                   Datastore trait                           │
//! │   provided: query, put_many, get_many, delete_many, batch   │
//! │   required: open, close, put, get, has, delete, entries     │
//! ├─────────────────────────────────────────────────────────────┤
//! │            Query engine (query::execute)                    │
//! │   prefix → filters → orders → offset → limit → keys-only    │
//! ├─────────────────────────────────────────────────────────────┤
//! │            Sequence utilities (stream module)               │
//! │          map │ filter │ take │ sort_all                     │
//! ├────────────────┬────────────────────────────────────────────┤
//! │ MemoryDatastore│     other backends (disk, remote, ...)     │
//! │  (reference)   │                                            │
//! └────────────────┴────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```
//! use bytes::Bytes;
//! use futures::{TryStreamExt, stream};
//! use inferadb_common_datastore::{
//!     AbortSignal, Datastore, Key, MemoryDatastore, Pair, Query, query,
//! };
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let store = MemoryDatastore::new();
//! store.open().await?;
//!
//! // Single-item operations
//! let alice = Key::new("/users/alice");
//! store.put(&alice, Bytes::from("admin")).await?;
//! assert_eq!(store.get(&alice).await?, Bytes::from("admin"));
//!
//! // Lazy bulk writes
//! let pairs = ["bob", "carol"].map(|name| Pair::new(Key::new("/users").child(&Key::new(name)), "member"));
//! let stored: Vec<Pair> = store.put_many(stream::iter(pairs), AbortSignal::none()).try_collect().await?;
//! assert_eq!(stored.len(), 2);
//!
//! // Queries
//! let q = Query::new().with_prefix("/users/").with_order(query::ascending_by_key()).with_limit(2);
//! let names: Vec<String> =
//!     store.query_keys(&q).map_ok(|key| key.name().to_owned()).try_collect().await?;
//! assert_eq!(names, vec!["alice", "bob"]);
//!
//! // Atomic batch
//! let mut batch = store.batch();
//! batch.delete(alice.clone()).put(Key::new("/users/dave"), "member");
//! batch.commit(AbortSignal::none()).await?;
//! assert!(!store.has(&alice).await?);
//!
//! store.close().await?;
//! # Ok::<(), inferadb_common_datastore::DatastoreError>(())
//! # }).unwrap();
//! ```
//!
//! # Implementing a Backend
//!
//! 1. Implement the required methods of [`Datastore`]
//! 2. Map backend-specific errors onto [`DatastoreError`]
//! 3. Run the [`conformance`] suite against it (`testutil` feature)
//!
//! See the [`memory`] module source for a reference implementation.
//!
//! # Error Handling
//!
//! All operations return [`DatastoreResult<T>`]. Streams surface the first
//! failure as an `Err` item and end there, so callers can tell how far a
//! bulk operation or query got from the items already received.
//!
//! # Feature Flags
//!
//! - **`testutil`**: Enables the `testutil` module (key/value generators, datastore factories,
//!   assertion macros) and the `conformance` suite. Enable this in `[dev-dependencies]`.
//! - **`failpoints`**: Enables `fail` crate fail points in [`MemoryDatastore`] (`memory-put`,
//!   `memory-before-commit`) for fault-injection tests.

#![deny(unsafe_code)]

pub mod abort;
pub mod backend;
pub mod batch;
pub mod config;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used, clippy::panic)]
pub mod conformance;
pub mod error;
pub mod key;
pub mod memory;
pub mod query;
pub mod size_limits;
pub mod stream;
#[cfg(any(test, feature = "testutil"))]
#[allow(clippy::expect_used)]
pub mod testutil;
pub mod types;

// Re-export primary types at crate root for convenience
pub use abort::AbortSignal;
pub use backend::Datastore;
pub use batch::{Batch, BatchCommitError, BatchCommitStats, BatchOperation};
pub use config::MemoryConfig;
pub use error::{BoxError, ConfigError, DatastoreError, DatastoreResult, SizeLimitExceeded};
pub use key::Key;
pub use memory::MemoryDatastore;
pub use query::{Filter, Order, Query};
pub use size_limits::{DEFAULT_MAX_KEY_SIZE, DEFAULT_MAX_VALUE_SIZE, SizeLimits};
pub use types::{KeyStream, Pair, PairStream, ValueStream};
