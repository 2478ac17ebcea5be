//! # Currency Primitives
//!
//! Monetary amounts in the Credo workspace are `rust_decimal::Decimal`
//! values (string-serialized, never floats). This module supplies the
//! validated currency code that accompanies them.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// An ISO 4217-style currency code.
///
/// Validated on construction via [`CurrencyCode::new`]: exactly three
/// ASCII letters, canonicalized to upper case. Serializes as a plain
/// string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Create a validated currency code.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let s = s.into();
        let trimmed = s.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(ValidationError::InvalidCurrency(s));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// US dollars, the portal's default settlement currency.
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    /// Return the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
