//! Pricing plan persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `pricing_plans`
//! table. Plans are immutable once referenced by a transaction; the only
//! update is catalog withdrawal (clearing `active`).

use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use credo_billing::{FeatureValue, PricingPlan};
use credo_core::{AccountType, CurrencyCode, PlanId};

/// Insert a new plan.
pub async fn insert(pool: &PgPool, plan: &PricingPlan) -> Result<(), sqlx::Error> {
    let features = serde_json::to_value(&plan.features)
        .map_err(|e| sqlx::Error::Encode(Box::new(e)))?;

    sqlx::query(
        "INSERT INTO pricing_plans (id, account_type, name, price, currency, features, active)
         VALUES ($1, $2, $3, $4, $5, $6, $7)",
    )
    .bind(plan.id.as_uuid())
    .bind(plan.account_type.as_str())
    .bind(&plan.name)
    .bind(plan.price)
    .bind(plan.currency.as_str())
    .bind(features)
    .bind(plan.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Withdraw a plan from the catalog.
pub async fn deactivate(pool: &PgPool, id: &PlanId) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE pricing_plans SET active = FALSE WHERE id = $1")
        .bind(id.as_uuid())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Load all plans from the database into the in-memory store on startup.
///
/// Rows that fail domain validation are logged and skipped rather than
/// aborting the whole hydration.
pub async fn load_all(pool: &PgPool) -> Result<Vec<PricingPlan>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PlanRow>(
        "SELECT id, account_type, name, price, currency, features, active
         FROM pricing_plans ORDER BY name",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id;
            match row.into_record() {
                Ok(plan) => Some(plan),
                Err(reason) => {
                    tracing::error!(plan_id = %id, %reason, "skipping unreadable plan row");
                    None
                }
            }
        })
        .collect())
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct PlanRow {
    id: Uuid,
    account_type: String,
    name: String,
    price: Decimal,
    currency: String,
    features: serde_json::Value,
    active: bool,
}

impl PlanRow {
    fn into_record(self) -> Result<PricingPlan, String> {
        let account_type = AccountType::parse(&self.account_type)
            .ok_or_else(|| format!("unknown account type {:?}", self.account_type))?;
        let currency = CurrencyCode::new(&self.currency).map_err(|e| e.to_string())?;
        let features: std::collections::BTreeMap<String, FeatureValue> =
            serde_json::from_value(self.features).map_err(|e| format!("bad feature map: {e}"))?;

        Ok(PricingPlan {
            id: PlanId(self.id),
            account_type,
            name: self.name,
            price: self.price,
            currency,
            features,
            active: self.active,
        })
    }
}
