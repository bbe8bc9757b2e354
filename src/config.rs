//! Configuration for the [`Verifier`](crate::Verifier).
//!
//! # Example
//!
//! ```
//! use netcore_slices::{Field, VerifierConfig};
//! use web_time::Duration;
//!
//! let config = VerifierConfig {
//!     tag_field: Field::SrcMac,
//!     ..VerifierConfig::bounded(Duration::from_secs(5))
//! };
//! assert!(config.validate().is_ok());
//! ```

use web_time::Duration;

use crate::packet::Field;
use crate::NetcoreError;

/// Solver limits and the field the slice compiler uses for tagging.
///
/// # Forward Compatibility
///
/// New fields may be added to this struct in future versions. Construct
/// instances with `..VerifierConfig::default()`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "VerifierConfig has no effect unless passed to Verifier::new()"]
pub struct VerifierConfig {
    /// Per-query solver timeout. A query that runs out of time fails with
    /// [`NetcoreError::SolverUnknown`].
    ///
    /// Default: `None` (no timeout)
    pub timeout: Option<Duration>,

    /// Whether witness extraction asks the solver to invent values for
    /// fields the query never constrained. When `false`, such fields are
    /// simply absent from the witness.
    ///
    /// Default: `false`
    pub model_completion: bool,

    /// The header field the compiler rewrites to keep slices apart. Used by
    /// [`Verifier::compiled_correctly`](crate::Verifier::compiled_correctly)
    /// and its topology-aware variant.
    ///
    /// Default: [`Field::Vlan`]
    pub tag_field: Field,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            timeout: None,
            model_completion: false,
            tag_field: Field::Vlan,
        }
    }
}

impl VerifierConfig {
    /// Creates a new `VerifierConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Gives every query at most `timeout` before reporting unknown.
    pub fn bounded(timeout: Duration) -> Self {
        Self {
            timeout: Some(timeout),
            ..Self::default()
        }
    }

    /// No timeout, and witnesses carry a value for every field.
    pub fn exhaustive() -> Self {
        Self {
            timeout: None,
            model_completion: true,
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`NetcoreError::InvalidConfig`] if the timeout is zero or
    /// does not fit the solver's millisecond counter, or if the tag field is
    /// a location field.
    pub fn validate(&self) -> Result<(), NetcoreError> {
        if let Some(timeout) = self.timeout {
            if timeout.is_zero() {
                return Err(NetcoreError::InvalidConfig {
                    field: "timeout",
                    info: "must be positive".to_owned(),
                });
            }
            if u64::try_from(timeout.as_millis()).is_err() {
                return Err(NetcoreError::InvalidConfig {
                    field: "timeout",
                    info: format!("{:?} exceeds the millisecond range", timeout),
                });
            }
        }
        if self.tag_field.is_location() {
            return Err(NetcoreError::InvalidConfig {
                field: "tag_field",
                info: format!("{} is a location field and cannot carry tags", self.tag_field),
            });
        }
        Ok(())
    }

    /// The timeout in whole milliseconds, rounded up so sub-millisecond
    /// timeouts do not become "no timeout".
    #[must_use]
    pub fn timeout_ms(&self) -> Option<u64> {
        self.timeout.map(|t| {
            let ms = t.as_millis().max(1);
            u64::try_from(ms).unwrap_or(u64::MAX)
        })
    }
}
