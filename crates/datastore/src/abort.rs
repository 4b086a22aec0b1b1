//! Cooperative cancellation for mutating operations.
//!
//! An [`AbortSignal`] is handed to bulk operations and batch commits. They
//! check it at each safe point (before every item or operation) and fail
//! with [`DatastoreError::Aborted`] once it has fired. Cancellation is not
//! rollback: work completed before the check stays applied.
//!
//! # Example
//!
//! ```
//! use inferadb_common_datastore::AbortSignal;
//! use tokio_util::sync::CancellationToken;
//!
//! let token = CancellationToken::new();
//! let signal = AbortSignal::from(token.clone());
//! assert!(signal.check().is_ok());
//!
//! token.cancel();
//! assert!(signal.is_aborted());
//! assert!(signal.check().is_err());
//! ```

use tokio_util::sync::CancellationToken;

use crate::error::{DatastoreError, DatastoreResult};

/// Optional abort signal backed by a [`CancellationToken`].
///
/// The default signal never fires.
#[derive(Debug, Clone, Default)]
pub struct AbortSignal {
    token: Option<CancellationToken>,
}

impl AbortSignal {
    /// Returns a signal that never fires.
    #[must_use]
    pub fn none() -> Self {
        Self::default()
    }

    /// Wraps a cancellation token.
    #[must_use]
    pub fn new(token: CancellationToken) -> Self {
        Self { token: Some(token) }
    }

    /// Returns `true` once the underlying token has been cancelled.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.token.as_ref().is_some_and(CancellationToken::is_cancelled)
    }

    /// Returns [`DatastoreError::Aborted`] if the signal has fired.
    ///
    /// # Errors
    ///
    /// Fails with [`DatastoreError::Aborted`] after cancellation.
    pub fn check(&self) -> DatastoreResult<()> {
        if self.is_aborted() { Err(DatastoreError::aborted()) } else { Ok(()) }
    }
}

impl From<CancellationToken> for AbortSignal {
    fn from(token: CancellationToken) -> Self {
        Self::new(token)
    }
}
