//! Datastore error types and result alias.
//!
//! Every backend maps its internal faults onto the small, closed set of
//! conditions defined here. The constructor helpers on [`DatastoreError`]
//! are the only way the crate tags an underlying failure, so callers can
//! always match on a named condition and still walk the original cause
//! through [`std::error::Error::source`].
//!
//! # Error Conditions
//!
//! - [`DatastoreError::OpenFailed`] - the backend could not be opened
//! - [`DatastoreError::WriteFailed`] - a put (or batch commit) could not be applied
//! - [`DatastoreError::DeleteFailed`] - a delete could not be applied
//! - [`DatastoreError::ReadFailed`] - an underlying read fault (never used for absence)
//! - [`DatastoreError::NotFound`] - the key does not exist
//! - [`DatastoreError::Aborted`] - the caller's abort signal fired
//!
//! # Example
//!
//! ```
//! use inferadb_common_datastore::{DatastoreError, DatastoreResult, Key};
//!
//! fn lookup(key: &Key) -> DatastoreResult<Vec<u8>> {
//!     Err(DatastoreError::not_found(key))
//! }
//! ```

use std::sync::Arc;

use thiserror::Error;

/// A boxed error type for source chain tracking.
pub type BoxError = Arc<dyn std::error::Error + Send + Sync>;

/// Result type alias for datastore operations.
pub type DatastoreResult<T> = Result<T, DatastoreError>;

/// Errors that can occur during datastore operations.
///
/// # Non-exhaustive
///
/// New variants may be added in future minor releases. Downstream match
/// expressions must include a wildcard arm (`_ =>`).
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum DatastoreError {
    /// The backend could not be opened.
    #[error("Open failed: {message}")]
    OpenFailed {
        /// Description of the failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A write could not be applied.
    #[error("Write failed: {message}")]
    WriteFailed {
        /// Description of the failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// A delete could not be applied.
    #[error("Delete failed: {message}")]
    DeleteFailed {
        /// Description of the failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The backend failed while reading.
    ///
    /// Absence of a key is never reported this way; see
    /// [`NotFound`](DatastoreError::NotFound).
    #[error("Read failed: {message}")]
    ReadFailed {
        /// Description of the failure.
        message: String,
        /// The underlying error, if any.
        #[source]
        source: Option<BoxError>,
    },

    /// The requested key does not exist.
    #[error("Key not found: {key}")]
    NotFound {
        /// Canonical string form of the missing key.
        key: String,
    },

    /// The operation was cancelled through its abort signal.
    ///
    /// Work completed before the signal was observed stays applied.
    #[error("Operation aborted")]
    Aborted,
}

impl DatastoreError {
    /// Creates a new `OpenFailed` error with the given message.
    #[must_use]
    pub fn open_failed(message: impl Into<String>) -> Self {
        Self::OpenFailed { message: message.into(), source: None }
    }

    /// Creates a new `OpenFailed` error with a message and source error.
    #[must_use]
    pub fn open_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::OpenFailed { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `WriteFailed` error with the given message.
    #[must_use]
    pub fn write_failed(message: impl Into<String>) -> Self {
        Self::WriteFailed { message: message.into(), source: None }
    }

    /// Creates a new `WriteFailed` error with a message and source error.
    #[must_use]
    pub fn write_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::WriteFailed { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `DeleteFailed` error with the given message.
    #[must_use]
    pub fn delete_failed(message: impl Into<String>) -> Self {
        Self::DeleteFailed { message: message.into(), source: None }
    }

    /// Creates a new `DeleteFailed` error with a message and source error.
    #[must_use]
    pub fn delete_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::DeleteFailed { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `ReadFailed` error with the given message.
    #[must_use]
    pub fn read_failed(message: impl Into<String>) -> Self {
        Self::ReadFailed { message: message.into(), source: None }
    }

    /// Creates a new `ReadFailed` error with a message and source error.
    #[must_use]
    pub fn read_failed_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::ReadFailed { message: message.into(), source: Some(Arc::new(source)) }
    }

    /// Creates a new `NotFound` error for the given key.
    #[must_use]
    pub fn not_found(key: impl ToString) -> Self {
        Self::NotFound { key: key.to_string() }
    }

    /// Creates a new `Aborted` error.
    #[must_use]
    pub fn aborted() -> Self {
        Self::Aborted
    }

    /// Returns `true` if this is a [`NotFound`](DatastoreError::NotFound) error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Returns `true` if this is an [`Aborted`](DatastoreError::Aborted) error.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        matches!(self, Self::Aborted)
    }
}

/// Errors raised while validating configuration values.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// A numeric field is below its allowed minimum.
    #[error("{field} must be at least {min}, got {value}")]
    BelowMinimum {
        /// Name of the offending field.
        field: &'static str,
        /// Minimum accepted value.
        min: String,
        /// The rejected value.
        value: String,
    },
}

/// A key or value exceeded the configured [`SizeLimits`](crate::SizeLimits).
///
/// Backends wrap this as the source of a
/// [`WriteFailed`](DatastoreError::WriteFailed) error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind} size {actual} exceeds limit of {limit} bytes")]
pub struct SizeLimitExceeded {
    /// Either `"key"` or `"value"`.
    pub kind: &'static str,
    /// Observed size in bytes.
    pub actual: usize,
    /// Configured maximum in bytes.
    pub limit: usize,
}
