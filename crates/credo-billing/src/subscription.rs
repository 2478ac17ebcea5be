//! # Subscription Lifecycle
//!
//! A [`Subscription`] is the entitlement record granting continued portal
//! access, derived from exactly one completed transaction. Its lifetime
//! is independent of the transaction that spawned it.
//!
//! Activation preconditions live here; the atomic composition (idempotency
//! check, promo redemption, insert) is the store's job, and
//! [`ActivationOutcome`] is how the store reports whether a call created
//! the subscription or found it already in place.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use credo_core::{AccountType, PlanId, SubscriptionId, Timestamp, TransactionId, WalletAddress};

use crate::transaction::{Transaction, TransactionStatus};

/// Status of a subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    /// Entitlement is current.
    Active,
    /// The expiry instant has passed.
    Expired,
    /// Explicitly cancelled before expiry.
    Cancelled,
}

impl SubscriptionStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised when activating a completed transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivationError {
    /// Only completed transactions can activate a subscription.
    #[error("transaction {id} is {status}; only completed transactions can activate")]
    NotCompleted {
        /// The transaction that was offered.
        id: TransactionId,
        /// Its current status.
        status: TransactionStatus,
    },

    /// The referenced promo code has no remaining uses.
    ///
    /// Validation passed earlier but the last units were redeemed in the
    /// meantime. Nothing was mutated; the transaction stays completed
    /// without a subscription.
    #[error("promo code {code} has no remaining uses")]
    PromoExhausted {
        /// The canonical code.
        code: String,
    },

    /// The transaction references a promo code the store no longer has.
    #[error("promo code {code} referenced by the transaction no longer exists")]
    PromoMissing {
        /// The canonical code.
        code: String,
    },
}

/// Errors raised by subscription status transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid subscription transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: SubscriptionStatus,
        /// Attempted target status.
        to: SubscriptionStatus,
    },

    /// Attempted to mark a subscription expired before its expiry instant.
    #[error("subscription does not expire until {expires_at}")]
    NotYetExpired {
        /// The expiry instant.
        expires_at: Timestamp,
    },
}

/// The entitlement record granting continued portal access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subscription {
    /// Unique subscription identifier.
    pub id: SubscriptionId,
    /// The entitled account.
    pub purchaser: WalletAddress,
    /// The account's classification.
    pub account_type: AccountType,
    /// The purchased plan.
    pub plan_id: PlanId,
    /// Current status.
    pub status: SubscriptionStatus,
    /// The completed transaction this subscription derives from.
    pub transaction_id: TransactionId,
    /// When the subscription was activated.
    pub started_at: Timestamp,
    /// When the entitlement lapses (activation + one calendar year).
    pub expires_at: Timestamp,
}

impl Subscription {
    /// Activate a subscription from a completed transaction.
    ///
    /// # Errors
    ///
    /// Returns [`ActivationError::NotCompleted`] if the transaction is
    /// pending or failed — a pending attempt must first be settled by the
    /// external collaborator.
    pub fn activate(transaction: &Transaction, now: Timestamp) -> Result<Self, ActivationError> {
        if !transaction.is_completed() {
            return Err(ActivationError::NotCompleted {
                id: transaction.id,
                status: transaction.status,
            });
        }
        Ok(Self {
            id: SubscriptionId::new(),
            purchaser: transaction.purchaser.clone(),
            account_type: transaction.account_type,
            plan_id: transaction.plan_id,
            status: SubscriptionStatus::Active,
            transaction_id: transaction.id,
            started_at: now,
            expires_at: now.plus_one_year(),
        })
    }

    /// Whether the entitlement is current at the given instant.
    ///
    /// A subscription whose stored status is still `active` but whose
    /// expiry instant has passed does not count — the gate checks time,
    /// not just the flag.
    pub fn is_active_at(&self, now: Timestamp) -> bool {
        self.status == SubscriptionStatus::Active && now < self.expires_at
    }

    /// Cancel an active subscription.
    pub fn cancel(&mut self) -> Result<(), SubscriptionError> {
        if self.status != SubscriptionStatus::Active {
            return Err(SubscriptionError::InvalidTransition {
                from: self.status,
                to: SubscriptionStatus::Cancelled,
            });
        }
        self.status = SubscriptionStatus::Cancelled;
        Ok(())
    }

    /// Mark an active subscription expired once its expiry instant has
    /// passed.
    pub fn mark_expired(&mut self, now: Timestamp) -> Result<(), SubscriptionError> {
        if self.status != SubscriptionStatus::Active {
            return Err(SubscriptionError::InvalidTransition {
                from: self.status,
                to: SubscriptionStatus::Expired,
            });
        }
        if now < self.expires_at {
            return Err(SubscriptionError::NotYetExpired {
                expires_at: self.expires_at,
            });
        }
        self.status = SubscriptionStatus::Expired;
        Ok(())
    }
}

/// Result of an activation call against the store.
///
/// Activation is idempotent per transaction: re-running it for an
/// already-activated transaction is a no-op that returns the existing
/// subscription, never a duplicate or a second usage increment.
#[derive(Debug, Clone, PartialEq)]
pub enum ActivationOutcome {
    /// A subscription was created by this call.
    Fresh(Subscription),
    /// The transaction was already activated; this is the prior record.
    Existing(Subscription),
}

impl ActivationOutcome {
    /// The subscription, regardless of whether this call created it.
    pub fn subscription(&self) -> &Subscription {
        match self {
            Self::Fresh(sub) | Self::Existing(sub) => sub,
        }
    }

    /// Consume the outcome, yielding the subscription.
    pub fn into_subscription(self) -> Subscription {
        match self {
            Self::Fresh(sub) | Self::Existing(sub) => sub,
        }
    }

    /// Whether this call created the subscription.
    pub fn was_created(&self) -> bool {
        matches!(self, Self::Fresh(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::PricingPlan;
    use crate::promo::CanonicalCode;
    use credo_core::CurrencyCode;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::BTreeMap;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn plan(price: Decimal) -> PricingPlan {
        PricingPlan::new(
            AccountType::Institution,
            "Campus",
            price,
            CurrencyCode::usd(),
            BTreeMap::new(),
        )
        .unwrap()
    }

    fn completed_transaction() -> Transaction {
        Transaction::record(
            WalletAddress::new("0xBUYER").unwrap(),
            AccountType::Institution,
            &plan(dec!(50)),
            CanonicalCode::parse("FREEBIE"),
            dec!(50),
            ts("2026-06-01T12:00:00Z"),
        )
    }

    fn pending_transaction() -> Transaction {
        Transaction::record(
            WalletAddress::new("0xBUYER").unwrap(),
            AccountType::Institution,
            &plan(dec!(100)),
            None,
            Decimal::ZERO,
            ts("2026-06-01T12:00:00Z"),
        )
    }

    #[test]
    fn activate_from_completed() {
        let tx = completed_transaction();
        let sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Active);
        assert_eq!(sub.transaction_id, tx.id);
        assert_eq!(sub.purchaser, tx.purchaser);
        assert_eq!(sub.plan_id, tx.plan_id);
    }

    #[test]
    fn expiry_is_one_calendar_year_out() {
        let tx = completed_transaction();
        let sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();
        assert_eq!(sub.expires_at, ts("2027-06-01T12:00:00Z"));
    }

    #[test]
    fn activate_rejects_pending() {
        let tx = pending_transaction();
        let result = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z"));
        assert_eq!(
            result,
            Err(ActivationError::NotCompleted {
                id: tx.id,
                status: TransactionStatus::Pending,
            })
        );
    }

    #[test]
    fn activate_rejects_failed() {
        let mut tx = pending_transaction();
        tx.fail().unwrap();
        assert!(Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).is_err());
    }

    #[test]
    fn is_active_respects_expiry_instant() {
        let tx = completed_transaction();
        let sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();
        assert!(sub.is_active_at(ts("2026-06-01T12:00:00Z")));
        assert!(sub.is_active_at(ts("2027-05-31T23:59:59Z")));
        assert!(!sub.is_active_at(ts("2027-06-01T12:00:00Z")));
    }

    #[test]
    fn cancelled_is_not_active() {
        let tx = completed_transaction();
        let mut sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();
        sub.cancel().unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Cancelled);
        assert!(!sub.is_active_at(ts("2026-06-02T00:00:00Z")));
    }

    #[test]
    fn cancel_twice_is_rejected() {
        let tx = completed_transaction();
        let mut sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();
        sub.cancel().unwrap();
        assert!(sub.cancel().is_err());
    }

    #[test]
    fn mark_expired_only_after_expiry() {
        let tx = completed_transaction();
        let mut sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();

        let too_early = sub.mark_expired(ts("2026-07-01T00:00:00Z"));
        assert_eq!(
            too_early,
            Err(SubscriptionError::NotYetExpired {
                expires_at: ts("2027-06-01T12:00:00Z"),
            })
        );

        sub.mark_expired(ts("2027-06-01T12:00:00Z")).unwrap();
        assert_eq!(sub.status, SubscriptionStatus::Expired);
    }

    #[test]
    fn mark_expired_rejects_cancelled() {
        let tx = completed_transaction();
        let mut sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();
        sub.cancel().unwrap();
        assert!(sub.mark_expired(ts("2028-01-01T00:00:00Z")).is_err());
    }

    #[test]
    fn outcome_accessors() {
        let tx = completed_transaction();
        let sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();

        let fresh = ActivationOutcome::Fresh(sub.clone());
        assert!(fresh.was_created());
        assert_eq!(fresh.subscription(), &sub);

        let existing = ActivationOutcome::Existing(sub.clone());
        assert!(!existing.was_created());
        assert_eq!(existing.into_subscription(), sub);
    }

    #[test]
    fn serde_round_trip() {
        let tx = completed_transaction();
        let sub = Subscription::activate(&tx, ts("2026-06-01T12:00:00Z")).unwrap();
        let json = serde_json::to_string(&sub).unwrap();
        let parsed: Subscription = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, sub);
    }
}
