//! Key and value size validation.
//!
//! Backends take a [`SizeLimits`] through their configuration and call
//! [`validate_pair`] on every write path. Key size is measured on the
//! canonical string form of the [`Key`].
//!
//! # Defaults
//!
//! | Limit | Default |
//! |-------|---------|
//! | `max_key_size` | 1 024 bytes (1 KiB) |
//! | `max_value_size` | 16 777 216 bytes (16 MiB) |

use serde::{Deserialize, Serialize};

use crate::{
    Key,
    error::{ConfigError, SizeLimitExceeded},
};

/// Default maximum key size in bytes (1 KiB).
pub const DEFAULT_MAX_KEY_SIZE: usize = 1024;

/// Default maximum value size in bytes (16 MiB).
pub const DEFAULT_MAX_VALUE_SIZE: usize = 16 * 1024 * 1024;

/// Upper bounds on key and value sizes.
///
/// Both limits must be at least 1.
///
/// # Example
///
/// ```
/// use inferadb_common_datastore::SizeLimits;
///
/// let limits = SizeLimits::new(256, 1024 * 1024).unwrap();
/// assert_eq!(limits.max_key_size(), 256);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawSizeLimits", into = "RawSizeLimits")]
pub struct SizeLimits {
    max_key_size: usize,
    max_value_size: usize,
}

impl SizeLimits {
    /// Creates size limits with the given bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::BelowMinimum`] if either limit is zero.
    pub fn new(max_key_size: usize, max_value_size: usize) -> Result<Self, ConfigError> {
        if max_key_size == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_key_size",
                min: "1".into(),
                value: "0".into(),
            });
        }
        if max_value_size == 0 {
            return Err(ConfigError::BelowMinimum {
                field: "max_value_size",
                min: "1".into(),
                value: "0".into(),
            });
        }
        Ok(Self { max_key_size, max_value_size })
    }

    /// Returns the maximum allowed key size in bytes.
    #[must_use]
    pub fn max_key_size(&self) -> usize {
        self.max_key_size
    }

    /// Returns the maximum allowed value size in bytes.
    #[must_use]
    pub fn max_value_size(&self) -> usize {
        self.max_value_size
    }
}

impl Default for SizeLimits {
    fn default() -> Self {
        Self { max_key_size: DEFAULT_MAX_KEY_SIZE, max_value_size: DEFAULT_MAX_VALUE_SIZE }
    }
}

/// Wire form of [`SizeLimits`]; validated on the way in.
#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawSizeLimits {
    #[serde(default = "default_max_key_size")]
    max_key_size: usize,
    #[serde(default = "default_max_value_size")]
    max_value_size: usize,
}

fn default_max_key_size() -> usize {
    DEFAULT_MAX_KEY_SIZE
}

fn default_max_value_size() -> usize {
    DEFAULT_MAX_VALUE_SIZE
}

impl TryFrom<RawSizeLimits> for SizeLimits {
    type Error = ConfigError;

    fn try_from(raw: RawSizeLimits) -> Result<Self, Self::Error> {
        Self::new(raw.max_key_size, raw.max_value_size)
    }
}

impl From<SizeLimits> for RawSizeLimits {
    fn from(limits: SizeLimits) -> Self {
        Self { max_key_size: limits.max_key_size, max_value_size: limits.max_value_size }
    }
}

/// Checks a key and value against `limits`.
///
/// The key is checked first, so an oversized key is reported even when the
/// value is oversized too.
///
/// # Errors
///
/// Returns [`SizeLimitExceeded`] naming the violated limit.
pub fn validate_pair(key: &Key, value: &[u8], limits: &SizeLimits) -> Result<(), SizeLimitExceeded> {
    validate_key(key, limits)?;
    if value.len() > limits.max_value_size {
        return Err(SizeLimitExceeded {
            kind: "value",
            actual: value.len(),
            limit: limits.max_value_size,
        });
    }
    Ok(())
}

/// Checks only the key against `limits`.
///
/// # Errors
///
/// Returns [`SizeLimitExceeded`] when the canonical key is too long.
pub fn validate_key(key: &Key, limits: &SizeLimits) -> Result<(), SizeLimitExceeded> {
    let len = key.as_str().len();
    if len > limits.max_key_size {
        return Err(SizeLimitExceeded { kind: "key", actual: len, limit: limits.max_key_size });
    }
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use rstest::rstest;

    use super::*;

    /// Builds a canonical key of exactly `len` bytes (`len >= 2`).
    fn key_of_len(len: usize) -> Key {
        Key::new(format!("/{}", "k".repeat(len - 1)))
    }

    #[test]
    fn test_default_limits() {
        let limits = SizeLimits::default();
        assert_eq!(limits.max_key_size(), 1024);
        assert_eq!(limits.max_value_size(), 16 * 1024 * 1024);
    }

    #[test]
    fn test_zero_key_size_rejected() {
        let err = SizeLimits::new(0, 1024).unwrap_err();
        assert!(err.to_string().contains("max_key_size"), "error should name the field: {err}");
    }

    #[test]
    fn test_zero_value_size_rejected() {
        let err = SizeLimits::new(1, 0).unwrap_err();
        assert!(err.to_string().contains("max_value_size"), "error should name the field: {err}");
    }

    #[rstest]
    #[case::within_limits(10, 20, 5, 20, true)]
    #[case::at_exact_limit(10, 20, 10, 20, true)]
    #[case::key_one_byte_over(10, 20, 11, 5, false)]
    #[case::value_one_byte_over(10, 20, 5, 21, false)]
    fn test_validate_pair_parametric(
        #[case] max_key: usize,
        #[case] max_val: usize,
        #[case] key_len: usize,
        #[case] val_len: usize,
        #[case] should_pass: bool,
    ) {
        let limits = SizeLimits::new(max_key, max_val).unwrap();
        let result = validate_pair(&key_of_len(key_len), &vec![0u8; val_len], &limits);
        assert_eq!(result.is_ok(), should_pass);
    }

    #[test]
    fn test_key_is_reported_before_value() {
        let limits = SizeLimits::new(4, 4).unwrap();
        let err = validate_pair(&key_of_len(8), &[0u8; 8], &limits).unwrap_err();
        assert_eq!(err, SizeLimitExceeded { kind: "key", actual: 8, limit: 4 });
    }

    #[test]
    fn test_value_error_details() {
        let limits = SizeLimits::new(10, 20).unwrap();
        let err = validate_pair(&Key::new("/a"), &[0u8; 21], &limits).unwrap_err();
        assert_eq!(err, SizeLimitExceeded { kind: "value", actual: 21, limit: 20 });
    }

    #[test]
    fn test_deserialize_fills_defaults() {
        let limits: SizeLimits = serde_json::from_str(r#"{"max_key_size": 64}"#).unwrap();
        assert_eq!(limits.max_key_size(), 64);
        assert_eq!(limits.max_value_size(), DEFAULT_MAX_VALUE_SIZE);
    }

    #[test]
    fn test_deserialize_rejects_zero() {
        let err = serde_json::from_str::<SizeLimits>(r#"{"max_value_size": 0}"#).unwrap_err();
        assert!(err.to_string().contains("max_value_size"), "{err}");
    }

    #[test]
    fn test_deserialize_rejects_unknown_fields() {
        assert!(serde_json::from_str::<SizeLimits>(r#"{"max_keys": 1}"#).is_err());
    }
}
