//! Hierarchical datastore keys.
//!
//! A [`Key`] is an immutable, path-like identifier such as
//! `/users/profile:alice`. It is a list of namespace segments joined by `/`,
//! and every segment may carry a `type:name` pair.
//!
//! # Canonical Form
//!
//! - Always starts with `/`.
//! - Never contains empty segments (`//` collapses to `/`).
//! - Never ends with `/`, except the root key which is exactly `/`.
//!
//! Any backend that persists keys as strings or bytes uses this canonical
//! form, which makes it the only interoperable wire format of the crate.
//!
//! # Type and Name
//!
//! The type of a segment is everything before its **last** `:`, and the name
//! is everything after it. A segment without `:` has an empty type and is
//! its own name:
//!
//! | Segment | `key_type()` | `name()` |
//! |---------|--------------|----------|
//! | `user:alice` | `user` | `alice` |
//! | `a:b:c` | `a:b` | `c` |
//! | `alice` | `` | `alice` |
//!
//! # Ordering
//!
//! Keys are ordered by comparing their segment lists **from the last segment
//! backwards**. Keys that share a long suffix (`/x/comments`, `/y/comments`)
//! therefore sort next to each other.
//!
//! # Example
//!
//! ```
//! use inferadb_common_datastore::Key;
//!
//! let key = Key::new("//users///profile:alice/");
//! assert_eq!(key.as_str(), "/users/profile:alice");
//! assert_eq!(key.key_type(), "profile");
//! assert_eq!(key.name(), "alice");
//! assert_eq!(key.parent(), Key::new("/users"));
//! assert_eq!(key.path(), Key::new("/users/profile"));
//! ```

use std::{any::Any, cmp::Ordering, convert::Infallible, fmt, str::FromStr};

use bytes::Bytes;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Separator between namespace segments.
pub const NAMESPACE_SEPARATOR: char = '/';

/// Separator between the type and name parts of a segment.
pub const TYPE_SEPARATOR: char = ':';

/// Immutable hierarchical key.
///
/// Equality and hashing use the canonical string. See the
/// [module documentation](self) for the ordering and `type:name` rules.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Key {
    raw: String,
}

impl Key {
    /// Creates a key from a string, normalizing it to canonical form.
    ///
    /// Never fails: every string denotes some segment list.
    #[must_use]
    pub fn new(s: impl AsRef<str>) -> Self {
        Self { raw: clean(s.as_ref()) }
    }

    /// Creates a key from a string without normalizing it.
    ///
    /// The caller guarantees `s` is already canonical, typically because it
    /// was read back from a backend that stored [`as_str`](Self::as_str).
    /// Segment accessors tolerate non-canonical input, but equality compares
    /// the raw string.
    #[must_use]
    pub fn from_raw(s: impl Into<String>) -> Self {
        Self { raw: s.into() }
    }

    /// Creates a key from its byte form.
    ///
    /// Invalid UTF-8 sequences are replaced with `U+FFFD`.
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self::new(String::from_utf8_lossy(bytes))
    }

    /// Returns the root key `/`.
    #[must_use]
    pub fn root() -> Self {
        Self { raw: NAMESPACE_SEPARATOR.to_string() }
    }

    /// Builds a key from a list of namespace segments.
    #[must_use]
    pub fn with_namespaces<I, S>(namespaces: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut raw = String::new();
        for ns in namespaces {
            raw.push(NAMESPACE_SEPARATOR);
            raw.push_str(ns.as_ref());
        }
        Self::new(raw)
    }

    /// Generates a single-segment key holding 128 random bits as hex.
    #[must_use]
    pub fn random() -> Self {
        Self { raw: format!("{NAMESPACE_SEPARATOR}{}", Uuid::new_v4().simple()) }
    }

    /// Returns `true` if `value` is a [`Key`].
    ///
    /// Only useful at dynamically-typed boundaries.
    #[must_use]
    pub fn is_key(value: &dyn Any) -> bool {
        value.is::<Key>()
    }

    /// Concatenates the segments of `keys` from left to right.
    #[must_use]
    pub fn concat<'a, I>(keys: I) -> Self
    where
        I: IntoIterator<Item = &'a Key>,
    {
        Self::with_namespaces(keys.into_iter().flat_map(Key::segments))
    }

    /// Returns the canonical string form.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Returns the canonical form as UTF-8 bytes.
    #[must_use]
    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(self.raw.as_bytes())
    }

    fn segments(&self) -> impl DoubleEndedIterator<Item = &str> {
        self.raw.split(NAMESPACE_SEPARATOR).filter(|s| !s.is_empty())
    }

    /// Returns the namespace segments, borrowed from the key.
    #[must_use]
    pub fn namespaces(&self) -> Vec<&str> {
        self.segments().collect()
    }

    /// Returns the namespace segments as owned strings.
    #[must_use]
    pub fn list(&self) -> Vec<String> {
        self.segments().map(str::to_owned).collect()
    }

    /// Returns the last segment, or `""` for the root key.
    #[must_use]
    pub fn base_namespace(&self) -> &str {
        self.segments().next_back().unwrap_or("")
    }

    /// Returns the type part of the last segment.
    #[must_use]
    pub fn key_type(&self) -> &str {
        namespace_type(self.base_namespace())
    }

    /// Returns the name part of the last segment.
    #[must_use]
    pub fn name(&self) -> &str {
        namespace_name(self.base_namespace())
    }

    /// Appends `:name` to the last segment.
    ///
    /// Turns a type key such as `/users/profile` into the instance key
    /// `/users/profile:alice`.
    #[must_use]
    pub fn instance(&self, name: &str) -> Self {
        Self::new(format!("{}{TYPE_SEPARATOR}{name}", self.raw))
    }

    /// Returns the parent with the type of the last segment re-appended.
    ///
    /// `/users/profile:alice` becomes `/users/profile`. A last segment
    /// without a type yields the parent itself.
    #[must_use]
    pub fn path(&self) -> Self {
        let mut path = self.parent().raw;
        if !path.ends_with(NAMESPACE_SEPARATOR) {
            path.push(NAMESPACE_SEPARATOR);
        }
        path.push_str(self.key_type());
        Self::new(path)
    }

    /// Returns the key without its last segment.
    ///
    /// The parent of a top-level key, and of the root itself, is the root.
    #[must_use]
    pub fn parent(&self) -> Self {
        let mut segments = self.namespaces();
        segments.pop();
        Self::with_namespaces(segments)
    }

    /// Returns this key with the segments of `other` appended.
    #[must_use]
    pub fn child(&self, other: &Key) -> Self {
        Self::with_namespaces(self.segments().chain(other.segments()))
    }

    /// Returns the key with its segment list reversed.
    #[must_use]
    pub fn reverse(&self) -> Self {
        Self::with_namespaces(self.segments().rev())
    }

    /// Returns `true` if this key's segments are a strict prefix of `other`'s.
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Key) -> bool {
        let mine = self.namespaces();
        let theirs = other.namespaces();
        theirs.len() > mine.len() && theirs.starts_with(&mine)
    }

    /// Returns `true` if `other`'s segments are a strict prefix of this key's.
    #[must_use]
    pub fn is_descendant_of(&self, other: &Key) -> bool {
        other.is_ancestor_of(self)
    }

    /// Returns `true` if the key has exactly one segment.
    #[must_use]
    pub fn is_top_level(&self) -> bool {
        let mut segments = self.segments();
        segments.next().is_some() && segments.next().is_none()
    }

    /// Returns `true` for the root key.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.segments().next().is_none()
    }

    /// Returns `true` if this key sorts strictly before `other`.
    #[must_use]
    pub fn less(&self, other: &Key) -> bool {
        self < other
    }
}

/// Normalizes a raw key string into canonical form.
fn clean(s: &str) -> String {
    let mut out = String::with_capacity(s.len() + 1);
    for segment in s.split(NAMESPACE_SEPARATOR).filter(|seg| !seg.is_empty()) {
        out.push(NAMESPACE_SEPARATOR);
        out.push_str(segment);
    }
    if out.is_empty() {
        out.push(NAMESPACE_SEPARATOR);
    }
    out
}

fn namespace_type(ns: &str) -> &str {
    ns.rfind(TYPE_SEPARATOR).map_or("", |idx| &ns[..idx])
}

fn namespace_name(ns: &str) -> &str {
    ns.rfind(TYPE_SEPARATOR).map_or(ns, |idx| &ns[idx + TYPE_SEPARATOR.len_utf8()..])
}

impl Ord for Key {
    fn cmp(&self, other: &Self) -> Ordering {
        // Raw tie-break keeps Ord consistent with Eq for non-canonical raw keys.
        self.segments().rev().cmp(other.segments().rev()).then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for Key {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Default for Key {
    fn default() -> Self {
        Self::root()
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl fmt::Debug for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Key").field(&self.raw).finish()
    }
}

impl AsRef<str> for Key {
    fn as_ref(&self) -> &str {
        &self.raw
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&Key> for Key {
    fn from(key: &Key) -> Self {
        key.clone()
    }
}

impl FromStr for Key {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

impl Serialize for Key {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for Key {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}
