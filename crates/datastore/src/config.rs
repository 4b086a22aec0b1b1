//! Configuration for the in-memory datastore.
//!
//! ```
//! use inferadb_common_datastore::{MemoryConfig, SizeLimits};
//!
//! let config = MemoryConfig::builder()
//!     .size_limits(SizeLimits::new(128, 4096).unwrap())
//!     .build();
//! assert_eq!(config.size_limits().max_key_size(), 128);
//! ```

use serde::{Deserialize, Serialize};

use crate::SizeLimits;

/// Settings for [`MemoryDatastore`](crate::MemoryDatastore).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, bon::Builder, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemoryConfig {
    /// Maximum key and value sizes accepted by writes.
    #[serde(default)]
    #[builder(default)]
    size_limits: SizeLimits,
}

impl MemoryConfig {
    /// Returns the key and value size limits.
    #[must_use]
    pub fn size_limits(&self) -> &SizeLimits {
        &self.size_limits
    }
}
