//! Common types shared by datastore backends and their consumers.

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::{error::DatastoreResult, key::Key};

/// A stored key/value association.
///
/// Values are opaque bytes; encoding is up to the caller.
///
/// # Examples
///
/// ```
/// use bytes::Bytes;
/// use inferadb_common_datastore::{Key, Pair};
///
/// let pair = Pair::new(Key::new("/users/alice"), Bytes::from(r#"{"name":"Alice"}"#));
/// assert_eq!(pair.key.name(), "alice");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pair {
    /// The key identifying this entry.
    pub key: Key,

    /// The value stored at this key. Empty for keys-only query results.
    pub value: Bytes,
}

impl Pair {
    /// Creates a new pair.
    pub fn new(key: Key, value: impl Into<Bytes>) -> Self {
        Self { key, value: value.into() }
    }

    /// Consumes the pair and returns it with an empty value.
    #[must_use]
    pub fn without_value(self) -> Self {
        Self { key: self.key, value: Bytes::new() }
    }
}

/// Lazy, fallible stream of pairs returned by queries and `put_many`.
pub type PairStream<'a> = BoxStream<'a, DatastoreResult<Pair>>;

/// Lazy, fallible stream of keys returned by `delete_many` and `query_keys`.
pub type KeyStream<'a> = BoxStream<'a, DatastoreResult<Key>>;

/// Lazy, fallible stream of values returned by `get_many`.
pub type ValueStream<'a> = BoxStream<'a, DatastoreResult<Bytes>>;
