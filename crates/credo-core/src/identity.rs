//! # Domain Identity Newtypes
//!
//! Newtype wrappers for all domain identifiers in the Credo portal.
//! These prevent accidental identifier confusion — you cannot pass a
//! `PlanId` where a `TransactionId` is expected.
//!
//! Wallet addresses are opaque identifiers supplied by the identity
//! collaborator. The engine never interprets them; it only requires that
//! they are non-empty and of sane length.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ValidationError;

/// Unique identifier for a pricing plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlanId(pub Uuid);

/// Unique identifier for a purchase transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub Uuid);

/// Unique identifier for a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SubscriptionId(pub Uuid);

impl PlanId {
    /// Generate a new random plan identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PlanId {
    fn default() -> Self {
        Self::new()
    }
}

impl TransactionId {
    /// Generate a new random transaction identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for TransactionId {
    fn default() -> Self {
        Self::new()
    }
}

impl SubscriptionId {
    /// Generate a new random subscription identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PlanId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "plan:{}", self.0)
    }
}

impl std::fmt::Display for TransactionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "txn:{}", self.0)
    }
}

impl std::fmt::Display for SubscriptionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sub:{}", self.0)
    }
}

/// Maximum accepted wallet address length.
///
/// Generous enough for any address scheme the identity collaborator may
/// hand us while still bounding stored key sizes.
const WALLET_MAX_LEN: usize = 128;

/// An opaque purchaser identifier supplied by the identity collaborator.
///
/// Validated on construction: surrounding whitespace is stripped, the
/// result must be non-empty and at most [`WALLET_MAX_LEN`] characters.
/// The engine performs no further interpretation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WalletAddress(String);

impl WalletAddress {
    /// Create a validated wallet address.
    pub fn new(s: impl Into<String>) -> Result<Self, ValidationError> {
        let trimmed = s.into().trim().to_string();
        if trimmed.is_empty() {
            return Err(ValidationError::MissingField("wallet address"));
        }
        if trimmed.len() > WALLET_MAX_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "wallet address",
                max: WALLET_MAX_LEN,
            });
        }
        Ok(Self(trimmed))
    }

    /// Return the address as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for WalletAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for WalletAddress {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
