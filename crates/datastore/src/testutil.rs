//! Shared test utilities for datastore testing.
//!
//! This module provides helpers for generating keys and values, building
//! pre-populated datastores, and asserting on [`DatastoreResult`](crate::DatastoreResult)
//! values. It is feature-gated behind `testutil` to keep it out of
//! production builds.
//!
//! # Usage
//!
//! In integration tests, enable the feature in `Cargo.toml`:
//!
//! ```toml
//! [dev-dependencies]
//! inferadb-common-datastore = { path = "../datastore", features = ["testutil"] }
//! ```
//!
//! Then import helpers:
//!
//! ```no_run
//! // Requires the `testutil` feature to be enabled.
//! use inferadb_common_datastore::testutil::{make_key, make_value, populated_datastore};
//! ```

use bytes::Bytes;

use crate::{Datastore, Key, memory::MemoryDatastore};

/// Create a deterministic test key under a namespace.
///
/// Produces keys like `/prefix/000042` (zero-padded to 6 digits), so the
/// key ordering of keys sharing a prefix matches numeric ordering.
#[must_use]
pub fn make_key(prefix: &str, idx: usize) -> Key {
    Key::new(format!("/{prefix}/{idx:06}"))
}

/// Create a test value of the given size filled with `0xAB` bytes.
#[must_use]
pub fn make_value(size: usize) -> Bytes {
    Bytes::from(vec![0xAB; size])
}

/// Create a [`MemoryDatastore`] pre-populated with `count` keys.
///
/// Keys come from [`make_key`] with values of `value_size` bytes each.
///
/// # Panics
///
/// Panics if any `put` fails (should not happen with `MemoryDatastore`).
pub async fn populated_datastore(prefix: &str, count: usize, value_size: usize) -> MemoryDatastore {
    let store = MemoryDatastore::new();
    let value = make_value(value_size);
    for i in 0..count {
        store.put(&make_key(prefix, i), value.clone()).await.expect("populate put failed");
    }
    store
}

/// Assert that a [`DatastoreResult`](crate::DatastoreResult) is a
/// [`DatastoreError::NotFound`](crate::DatastoreError::NotFound).
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use inferadb_common_datastore::assert_not_found;
/// use inferadb_common_datastore::error::{DatastoreError, DatastoreResult};
///
/// let result: DatastoreResult<()> = Err(DatastoreError::not_found("/missing"));
/// assert_not_found!(result);
/// ```
#[macro_export]
macro_rules! assert_not_found {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::DatastoreError::NotFound { .. })),
            "expected DatastoreError::NotFound, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::DatastoreError::NotFound { .. })),
            "{}: expected DatastoreError::NotFound, got: {:?}",
            $msg,
            $result,
        );
    };
}

/// Assert that a [`DatastoreResult`](crate::DatastoreResult) is a
/// [`DatastoreError::Aborted`](crate::DatastoreError::Aborted).
#[macro_export]
macro_rules! assert_aborted {
    ($result:expr) => {
        assert!(
            matches!($result, Err($crate::error::DatastoreError::Aborted)),
            "expected DatastoreError::Aborted, got: {:?}",
            $result,
        );
    };
    ($result:expr, $msg:expr) => {
        assert!(
            matches!($result, Err($crate::error::DatastoreError::Aborted)),
            "{}: expected DatastoreError::Aborted, got: {:?}",
            $msg,
            $result,
        );
    };
}

/// Assert that a [`DatastoreResult`](crate::DatastoreResult) is `Ok`.
///
/// Returns the inner value on success, panics with a descriptive message
/// on failure.
///
/// # Examples
///
/// ```no_run
/// // Requires the `testutil` feature to be enabled.
/// use inferadb_common_datastore::assert_datastore_ok;
/// use inferadb_common_datastore::error::DatastoreResult;
///
/// let result: DatastoreResult<i32> = Ok(42);
/// let value = assert_datastore_ok!(result);
/// assert_eq!(value, 42);
/// ```
#[macro_export]
macro_rules! assert_datastore_ok {
    ($result:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("expected Ok, got DatastoreError: {e:?}"),
        }
    };
    ($result:expr, $msg:expr) => {
        match $result {
            Ok(val) => val,
            Err(e) => panic!("{}: expected Ok, got DatastoreError: {e:?}", $msg),
        }
    };
}
