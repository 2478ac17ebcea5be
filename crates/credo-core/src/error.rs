//! # Validation Errors
//!
//! The shared validation error type for foundational primitives. All
//! errors use `thiserror` for derive-based `Display` and `Error`
//! implementations. Domain-specific failures (promo rejections, state
//! transitions) live next to their state machines in `credo-billing`.

use thiserror::Error;

/// A value failed validation at construction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// A field exceeded its maximum length.
    #[error("{field} must not exceed {max} characters")]
    FieldTooLong {
        /// The offending field.
        field: &'static str,
        /// The maximum accepted length.
        max: usize,
    },

    /// A currency code was not three ASCII letters.
    #[error("invalid currency code: {0:?}")]
    InvalidCurrency(String),

    /// A timestamp string could not be parsed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// An amount that must be non-negative was negative.
    #[error("{field} must not be negative")]
    NegativeAmount {
        /// The offending field.
        field: &'static str,
    },
}
