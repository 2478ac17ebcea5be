//! # Checkout Quoting
//!
//! A [`Quote`] composes the plan gate, the promo validator, and the
//! non-negative clamp into one purchase decision. The same quote backs
//! both the discount preview the display surface shows and the purchase
//! itself, so what the user saw is what gets recorded.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use credo_core::{AccountType, CurrencyCode, PlanId, Timestamp};

use crate::plan::PricingPlan;
use crate::promo::{CanonicalCode, PromoCode, PromoRejection};

/// Why a plan selection cannot be quoted.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The plan has been withdrawn from the catalog.
    #[error("plan {id} is no longer offered")]
    PlanInactive {
        /// The withdrawn plan.
        id: PlanId,
    },

    /// The plan is sold to a different account type than the caller's.
    #[error("plan is for {plan} accounts, caller is {caller}")]
    AccountTypeMismatch {
        /// The plan's account type.
        plan: AccountType,
        /// The caller's account type.
        caller: AccountType,
    },

    /// The supplied promo code was rejected.
    #[error(transparent)]
    Promo(#[from] PromoRejection),
}

/// A priced purchase decision: list price, discount, clamped final amount.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    /// The quoted plan.
    pub plan_id: PlanId,
    /// List price.
    pub list_price: Decimal,
    /// Settlement currency.
    pub currency: CurrencyCode,
    /// The canonical promo code applied, if any.
    pub promo_code: Option<CanonicalCode>,
    /// Discount computed by the validator (unclamped).
    pub discount: Decimal,
    /// `max(0, list_price - discount)`.
    pub final_amount: Decimal,
}

impl Quote {
    /// Build a quote for a plan selection.
    ///
    /// The plan must be active and sold to the caller's account type.
    /// `promo` is the stored record the caller looked up for `code` — a
    /// supplied code with no matching record is an [`PromoRejection::InvalidCode`]
    /// rejection, exactly as if the lookup itself had missed. No code
    /// means no discount, not an error.
    pub fn build(
        plan: &PricingPlan,
        account_type: AccountType,
        code: Option<CanonicalCode>,
        promo: Option<&PromoCode>,
        now: Timestamp,
    ) -> Result<Self, CheckoutError> {
        if !plan.active {
            return Err(CheckoutError::PlanInactive { id: plan.id });
        }
        if plan.account_type != account_type {
            return Err(CheckoutError::AccountTypeMismatch {
                plan: plan.account_type,
                caller: account_type,
            });
        }

        let discount = match (&code, promo) {
            (None, _) => Decimal::ZERO,
            (Some(_), None) => return Err(PromoRejection::InvalidCode.into()),
            (Some(_), Some(promo)) => promo.evaluate(account_type, plan, now)?,
        };

        Ok(Self {
            plan_id: plan.id,
            list_price: plan.price,
            currency: plan.currency.clone(),
            promo_code: code,
            discount,
            final_amount: (plan.price - discount).max(Decimal::ZERO),
        })
    }

    /// Whether the discount covers the whole price.
    pub fn is_fully_discounted(&self) -> bool {
        self.final_amount.is_zero()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::promo::Discount;
    use rust_decimal_macros::dec;
    use std::collections::{BTreeMap, BTreeSet};

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    const NOW: &str = "2026-06-01T12:00:00Z";

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

    fn promo(discount: Discount) -> PromoCode {
        PromoCode {
            code: CanonicalCode::parse("SAVE").unwrap(),
            discount,
            valid_from: ts("2026-01-01T00:00:00Z"),
            valid_until: None,
            max_uses: None,
            current_uses: 0,
            applicable_to: BTreeSet::from([AccountType::Institution]),
            active: true,
        }
    }

    #[test]
    fn quote_without_code() {
        let q = Quote::build(
            &plan(dec!(100)),
            AccountType::Institution,
            None,
            None,
            ts(NOW),
        )
        .unwrap();
        assert_eq!(q.discount, dec!(0));
        assert_eq!(q.final_amount, dec!(100));
        assert!(!q.is_fully_discounted());
    }

    #[test]
    fn quote_with_percentage_code() {
        let p = promo(Discount::Percentage(dec!(10)));
        let q = Quote::build(
            &plan(dec!(100)),
            AccountType::Institution,
            Some(p.code.clone()),
            Some(&p),
            ts(NOW),
        )
        .unwrap();
        assert_eq!(q.discount, dec!(10));
        assert_eq!(q.final_amount, dec!(90));
    }

    #[test]
    fn quote_clamps_oversized_fixed_discount() {
        let p = promo(Discount::FixedAmount(dec!(80)));
        let q = Quote::build(
            &plan(dec!(50)),
            AccountType::Institution,
            Some(p.code.clone()),
            Some(&p),
            ts(NOW),
        )
        .unwrap();
        assert_eq!(q.discount, dec!(80));
        assert_eq!(q.final_amount, dec!(0));
        assert!(q.is_fully_discounted());
    }

    #[test]
    fn code_without_record_is_invalid() {
        let result = Quote::build(
            &plan(dec!(100)),
            AccountType::Institution,
            CanonicalCode::parse("NOSUCH"),
            None,
            ts(NOW),
        );
        assert_eq!(
            result,
            Err(CheckoutError::Promo(PromoRejection::InvalidCode))
        );
    }

    #[test]
    fn inactive_plan_is_refused() {
        let mut p = plan(dec!(100));
        p.active = false;
        let result = Quote::build(&p, AccountType::Institution, None, None, ts(NOW));
        assert_eq!(result, Err(CheckoutError::PlanInactive { id: p.id }));
    }

    #[test]
    fn account_type_mismatch_is_refused() {
        let result = Quote::build(&plan(dec!(100)), AccountType::Employer, None, None, ts(NOW));
        assert_eq!(
            result,
            Err(CheckoutError::AccountTypeMismatch {
                plan: AccountType::Institution,
                caller: AccountType::Employer,
            })
        );
    }

    #[test]
    fn plan_gate_outranks_promo_rejection() {
        // An inactive plan with an expired code reports the plan problem.
        let mut p = plan(dec!(100));
        p.active = false;
        let mut code = promo(Discount::Percentage(dec!(10)));
        code.valid_until = Some(ts("2026-01-02T00:00:00Z"));
        let result = Quote::build(
            &p,
            AccountType::Institution,
            Some(code.code.clone()),
            Some(&code),
            ts(NOW),
        );
        assert!(matches!(result, Err(CheckoutError::PlanInactive { .. })));
    }

    #[test]
    fn promo_rejection_propagates() {
        let mut code = promo(Discount::Percentage(dec!(10)));
        code.valid_until = Some(ts("2026-01-02T00:00:00Z"));
        let result = Quote::build(
            &plan(dec!(100)),
            AccountType::Institution,
            Some(code.code.clone()),
            Some(&code),
            ts(NOW),
        );
        assert_eq!(result, Err(CheckoutError::Promo(PromoRejection::Expired)));
    }
}
