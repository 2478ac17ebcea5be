//! # Plan Catalog Types
//!
//! A [`PricingPlan`] is a purchasable tier of access scoped to one account
//! type. Plans are read-only from the engine's point of view: the catalog
//! lists them, transactions reference them, nothing here mutates them.
//!
//! The feature map is presentation data. The engine guarantees its wire
//! shape (numeric limit, boolean flag, or the `-1` unlimited sentinel) and
//! nothing more; rendering belongs to the display surface.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use credo_core::{AccountType, CurrencyCode, PlanId, ValidationError};

/// Maximum accepted plan name length.
const PLAN_NAME_MAX_LEN: usize = 255;

/// One entry of a plan's feature map.
///
/// Wire format: a JSON number or boolean. `-1` is the unlimited sentinel;
/// any other negative number is rejected at deserialization.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeatureValue {
    /// A numeric limit (e.g. credentials issued per month).
    Limit(u64),
    /// No limit on this feature.
    Unlimited,
    /// A feature that is simply on or off.
    Flag(bool),
}

impl Serialize for FeatureValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Limit(n) => serializer.serialize_u64(*n),
            Self::Unlimited => serializer.serialize_i64(-1),
            Self::Flag(b) => serializer.serialize_bool(*b),
        }
    }
}

impl<'de> Deserialize<'de> for FeatureValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Number(i64),
            Flag(bool),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Flag(b) => Ok(Self::Flag(b)),
            Raw::Number(-1) => Ok(Self::Unlimited),
            Raw::Number(n) if n >= 0 => Ok(Self::Limit(n as u64)),
            Raw::Number(n) => Err(D::Error::custom(format!(
                "feature limit must be -1 (unlimited) or non-negative, got {n}"
            ))),
        }
    }
}

/// A purchasable tier of access scoped to an account type.
///
/// Immutable once referenced by a transaction; deactivation (clearing
/// `active`) removes a plan from the catalog without touching existing
/// transactions or subscriptions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PricingPlan {
    /// Unique plan identifier.
    pub id: PlanId,
    /// The account type this plan is sold to.
    pub account_type: AccountType,
    /// Display name.
    pub name: String,
    /// List price. Non-negative; serialized as a decimal string.
    pub price: Decimal,
    /// Settlement currency.
    pub currency: CurrencyCode,
    /// Feature map for the display surface.
    pub features: BTreeMap<String, FeatureValue>,
    /// Whether the plan is currently offered.
    pub active: bool,
}

impl PricingPlan {
    /// Create a validated plan.
    ///
    /// # Errors
    ///
    /// Returns an error if the name is empty after trimming or exceeds the
    /// length limit, or if the price is negative.
    pub fn new(
        account_type: AccountType,
        name: impl Into<String>,
        price: Decimal,
        currency: CurrencyCode,
        features: BTreeMap<String, FeatureValue>,
    ) -> Result<Self, ValidationError> {
        let name = name.into().trim().to_string();
        if name.is_empty() {
            return Err(ValidationError::MissingField("plan name"));
        }
        if name.len() > PLAN_NAME_MAX_LEN {
            return Err(ValidationError::FieldTooLong {
                field: "plan name",
                max: PLAN_NAME_MAX_LEN,
            });
        }
        if price.is_sign_negative() && !price.is_zero() {
            return Err(ValidationError::NegativeAmount { field: "price" });
        }
        Ok(Self {
            id: PlanId::new(),
            account_type,
            name,
            price,
            currency,
            features,
            active: true,
        })
    }

    /// Whether this plan appears in the catalog for the given account type.
    pub fn is_listed_for(&self, account_type: AccountType) -> bool {
        self.active && self.account_type == account_type
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn features() -> BTreeMap<String, FeatureValue> {
        BTreeMap::from([
            ("credentials_per_month".to_string(), FeatureValue::Limit(500)),
            ("api_access".to_string(), FeatureValue::Flag(true)),
            ("verifications".to_string(), FeatureValue::Unlimited),
        ])
    }

    fn plan() -> PricingPlan {
        PricingPlan::new(
            AccountType::Institution,
            "Campus",
            dec!(100),
            CurrencyCode::usd(),
            features(),
        )
        .unwrap()
    }

    #[test]
    fn new_plan_is_active() {
        assert!(plan().active);
    }

    #[test]
    fn new_trims_name() {
        let p = PricingPlan::new(
            AccountType::Employer,
            "  Recruiter  ",
            dec!(49.99),
            CurrencyCode::usd(),
            BTreeMap::new(),
        )
        .unwrap();
        assert_eq!(p.name, "Recruiter");
    }

    #[test]
    fn new_rejects_empty_name() {
        let result = PricingPlan::new(
            AccountType::Employer,
            "   ",
            dec!(10),
            CurrencyCode::usd(),
            BTreeMap::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn new_rejects_negative_price() {
        let result = PricingPlan::new(
            AccountType::Employer,
            "Bad",
            dec!(-1),
            CurrencyCode::usd(),
            BTreeMap::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn new_accepts_zero_price() {
        let result = PricingPlan::new(
            AccountType::Employer,
            "Trial",
            dec!(0),
            CurrencyCode::usd(),
            BTreeMap::new(),
        );
        assert!(result.is_ok());
    }

    #[test]
    fn is_listed_for_matches_type_and_active() {
        let mut p = plan();
        assert!(p.is_listed_for(AccountType::Institution));
        assert!(!p.is_listed_for(AccountType::Employer));

        p.active = false;
        assert!(!p.is_listed_for(AccountType::Institution));
    }

    // ── Feature map wire format ──────────────────────────────────────

    #[test]
    fn feature_value_serializes_sentinel() {
        assert_eq!(
            serde_json::to_string(&FeatureValue::Unlimited).unwrap(),
            "-1"
        );
        assert_eq!(
            serde_json::to_string(&FeatureValue::Limit(500)).unwrap(),
            "500"
        );
        assert_eq!(
            serde_json::to_string(&FeatureValue::Flag(true)).unwrap(),
            "true"
        );
    }

    #[test]
    fn feature_value_deserializes_sentinel() {
        let v: FeatureValue = serde_json::from_str("-1").unwrap();
        assert_eq!(v, FeatureValue::Unlimited);
        let v: FeatureValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, FeatureValue::Limit(42));
        let v: FeatureValue = serde_json::from_str("false").unwrap();
        assert_eq!(v, FeatureValue::Flag(false));
    }

    #[test]
    fn feature_value_rejects_other_negatives() {
        assert!(serde_json::from_str::<FeatureValue>("-2").is_err());
    }

    #[test]
    fn plan_serde_round_trip() {
        let p = plan();
        let json = serde_json::to_string(&p).unwrap();
        let parsed: PricingPlan = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, p);
    }

    #[test]
    fn price_serializes_as_decimal_string() {
        let p = plan();
        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(json["price"], serde_json::json!("100"));
    }
}
