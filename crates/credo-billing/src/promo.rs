//! # Promo Code Evaluation
//!
//! A promo code either yields a discount amount or a typed rejection.
//! The checks run in a fixed order — lookup, validity window, usage cap,
//! account-type eligibility — and the first failing check wins, so the
//! rejection a user sees is deterministic and testable.
//!
//! Evaluation is strictly read-only. The one mutation defined here,
//! [`PromoCode::redeem`], verifies the cap and increments the counter in
//! a single call; the store must run it inside its own exclusive section
//! so two sessions racing for the last unit of a capped code cannot both
//! succeed.

use std::collections::BTreeSet;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use credo_core::{AccountType, Timestamp};

use crate::plan::PricingPlan;

/// A promo code in canonical form: trimmed, upper-cased, non-empty.
///
/// [`CanonicalCode::parse`] returns `None` for empty or whitespace-only
/// input — "no code supplied" is not an error, it is the absence of a
/// discount.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalCode(String);

impl CanonicalCode {
    /// Canonicalize raw user input. Returns `None` when no code was supplied.
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_uppercase()))
        }
    }

    /// Return the canonical code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CanonicalCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The discount a promo code grants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum Discount {
    /// Percentage of the list price (e.g. `10` for 10% off).
    Percentage(Decimal),
    /// A fixed amount off, in the plan's currency.
    FixedAmount(Decimal),
}

impl Discount {
    /// The amount this discount takes off the given list price.
    ///
    /// Fixed amounts are returned verbatim, not clamped to the price;
    /// clamping the final amount to a non-negative floor is the ledger's
    /// job, not the validator's.
    pub fn amount_off(&self, price: Decimal) -> Decimal {
        match self {
            Self::Percentage(value) => price * *value / Decimal::ONE_HUNDRED,
            Self::FixedAmount(value) => *value,
        }
    }
}

/// Why a promo code was rejected.
///
/// Every variant is safe to show verbatim to the user, and none of them
/// ever alters stored state.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PromoRejection {
    /// No active code with that name exists.
    #[error("invalid promo code")]
    InvalidCode,
    /// The current instant is outside the code's validity window.
    #[error("promo code expired")]
    Expired,
    /// The code's usage cap has been reached.
    #[error("promo code usage limit reached")]
    UsageLimitReached,
    /// The purchaser's account type is not eligible for this code.
    #[error("promo code not applicable to your account type")]
    NotApplicable,
}

/// A redeemable discount token with temporal, usage, and eligibility
/// constraints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromoCode {
    /// The canonical code string.
    pub code: CanonicalCode,
    /// The discount granted on success.
    pub discount: Discount,
    /// Start of the validity window.
    pub valid_from: Timestamp,
    /// End of the validity window; `None` means no end.
    pub valid_until: Option<Timestamp>,
    /// Usage cap; `None` means uncapped.
    pub max_uses: Option<u32>,
    /// Redemptions so far. Mutated only through [`PromoCode::redeem`].
    pub current_uses: u32,
    /// Account types eligible to use this code.
    pub applicable_to: BTreeSet<AccountType>,
    /// Whether the code is active at all.
    pub active: bool,
}

impl PromoCode {
    /// Evaluate this code against a plan selection.
    ///
    /// Checks run in this exact order, first failure wins:
    ///
    /// 1. the code must be active (inactive codes are indistinguishable
    ///    from unknown ones),
    /// 2. `now` must fall inside the validity window,
    /// 3. the usage cap, if any, must not be exhausted,
    /// 4. the purchaser's account type must be eligible.
    ///
    /// On success returns the discount amount for the plan's list price,
    /// unclamped (a fixed discount may exceed the price). Never mutates
    /// the usage counter.
    pub fn evaluate(
        &self,
        account_type: AccountType,
        plan: &PricingPlan,
        now: Timestamp,
    ) -> Result<Decimal, PromoRejection> {
        if !self.active {
            return Err(PromoRejection::InvalidCode);
        }
        if now < self.valid_from || self.valid_until.is_some_and(|until| now > until) {
            return Err(PromoRejection::Expired);
        }
        if self.max_uses.is_some_and(|max| self.current_uses >= max) {
            return Err(PromoRejection::UsageLimitReached);
        }
        if !self.applicable_to.contains(&account_type) {
            return Err(PromoRejection::NotApplicable);
        }
        Ok(self.discount.amount_off(plan.price))
    }

    /// Record one redemption, checking the cap and incrementing in a
    /// single call.
    ///
    /// The cap check and the increment are deliberately inseparable: the
    /// store runs this inside its exclusive section, so redemption of the
    /// last unit of a capped code can succeed at most once.
    pub fn redeem(&mut self) -> Result<(), PromoRejection> {
        if self.max_uses.is_some_and(|max| self.current_uses >= max) {
            return Err(PromoRejection::UsageLimitReached);
        }
        self.current_uses += 1;
        Ok(())
    }

    /// Remaining redemptions, if the code is capped.
    pub fn remaining_uses(&self) -> Option<u32> {
        self.max_uses
            .map(|max| max.saturating_sub(self.current_uses))
    }
}
