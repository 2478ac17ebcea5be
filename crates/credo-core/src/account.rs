//! # Account Type Classification
//!
//! The two purchasable account classes in the portal. Students hold
//! credentials for free and never reach the commerce gate, so they are
//! deliberately not representable here — an `AccountType` in hand means
//! the principal is allowed to buy a plan.

use serde::{Deserialize, Serialize};

/// Classification of a paying account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccountType {
    /// A university or college that issues credentials.
    Institution,
    /// An employer that verifies presented credentials.
    Employer,
}

impl AccountType {
    /// Return the string representation of this account type.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Institution => "institution",
            Self::Employer => "employer",
        }
    }

    /// Parse an account type from its wire representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "institution" => Some(Self::Institution),
            "employer" => Some(Self::Employer),
            _ => None,
        }
    }

    /// All account types, in declaration order.
    pub const ALL: [AccountType; 2] = [Self::Institution, Self::Employer];
}

impl std::fmt::Display for AccountType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
