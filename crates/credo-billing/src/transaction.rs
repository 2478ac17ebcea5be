//! # Purchase Transaction Ledger Types
//!
//! A [`Transaction`] is the immutable record of one purchase attempt and
//! its computed amounts. It is created exactly once per attempt; the only
//! mutation thereafter is the status transition performed when the
//! external settlement collaborator confirms or rejects payment.
//!
//! The single payment decision the engine makes lives in
//! [`Transaction::record`]: a zero final amount self-completes, anything
//! else is created `pending` and waits for settlement.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use credo_core::{AccountType, CurrencyCode, PlanId, Timestamp, TransactionId, WalletAddress};

use crate::plan::PricingPlan;
use crate::promo::CanonicalCode;

/// Status of a purchase attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransactionStatus {
    /// Awaiting confirmation from the settlement collaborator.
    ///
    /// There is deliberately no expiry or cleanup policy for abandoned
    /// pending transactions; a pending transaction with no subscription
    /// is safe by construction.
    Pending,
    /// Payment confirmed, or no payment was required.
    Completed,
    /// Settlement rejected the payment.
    Failed,
}

impl TransactionStatus {
    /// Return the string representation of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl std::fmt::Display for TransactionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors raised by transaction status transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    /// Attempted transition is not valid from the current status.
    #[error("invalid transaction transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: TransactionStatus,
        /// Attempted target status.
        to: TransactionStatus,
    },
}

/// An immutable record of one purchase attempt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transaction {
    /// Unique transaction identifier.
    pub id: TransactionId,
    /// The purchaser, as supplied by the identity collaborator.
    pub purchaser: WalletAddress,
    /// The purchaser's account type at the time of the attempt.
    pub account_type: AccountType,
    /// The plan being purchased.
    pub plan_id: PlanId,
    /// List price of the plan at the time of the attempt.
    pub amount: Decimal,
    /// Settlement currency.
    pub currency: CurrencyCode,
    /// Promo code applied, if any (canonical form).
    pub promo_code: Option<CanonicalCode>,
    /// Discount computed by the validator.
    pub discount_applied: Decimal,
    /// `max(0, amount - discount_applied)`.
    pub final_amount: Decimal,
    /// Current status.
    pub status: TransactionStatus,
    /// When the attempt was recorded.
    pub created_at: Timestamp,
    /// Set iff `status` is `completed`.
    pub completed_at: Option<Timestamp>,
}

impl Transaction {
    /// Record a purchase attempt.
    ///
    /// The final amount is clamped to a non-negative floor, so a fixed
    /// discount exceeding the list price yields a free purchase, never a
    /// credit. A zero final amount completes immediately with a
    /// completion timestamp; anything else is created `pending`, awaiting
    /// the settlement collaborator.
    pub fn record(
        purchaser: WalletAddress,
        account_type: AccountType,
        plan: &PricingPlan,
        promo_code: Option<CanonicalCode>,
        discount: Decimal,
        now: Timestamp,
    ) -> Self {
        let final_amount = (plan.price - discount).max(Decimal::ZERO);
        let settled = final_amount.is_zero();
        Self {
            id: TransactionId::new(),
            purchaser,
            account_type,
            plan_id: plan.id,
            amount: plan.price,
            currency: plan.currency.clone(),
            promo_code,
            discount_applied: discount,
            final_amount,
            status: if settled {
                TransactionStatus::Completed
            } else {
                TransactionStatus::Pending
            },
            created_at: now,
            completed_at: settled.then_some(now),
        }
    }

    /// Whether this transaction has completed.
    pub fn is_completed(&self) -> bool {
        self.status == TransactionStatus::Completed
    }

    /// Mark a pending transaction completed (settlement confirmed).
    pub fn complete(&mut self, now: Timestamp) -> Result<(), TransactionError> {
        self.transition_from_pending(TransactionStatus::Completed)?;
        self.completed_at = Some(now);
        Ok(())
    }

    /// Mark a pending transaction failed (settlement rejected).
    pub fn fail(&mut self) -> Result<(), TransactionError> {
        self.transition_from_pending(TransactionStatus::Failed)
    }

    fn transition_from_pending(&mut self, to: TransactionStatus) -> Result<(), TransactionError> {
        if self.status != TransactionStatus::Pending {
            return Err(TransactionError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        self.status = to;
        Ok(())
    }
}
