//! Promo code persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `promo_codes`
//! table. The only mutation is [`redeem`], a conditional
//! compare-and-increment: the cap check and the counter bump are a
//! single `UPDATE` statement, so concurrent redemptions of the last
//! unit cannot both pass.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;

use credo_billing::{CanonicalCode, Discount, PromoCode};
use credo_core::{AccountType, Timestamp};

/// Insert a new promo code.
pub async fn insert(pool: &PgPool, code: &PromoCode) -> Result<(), sqlx::Error> {
    let (discount_type, discount_value) = encode_discount(&code.discount);
    let applicable_to: Vec<String> = code
        .applicable_to
        .iter()
        .map(|at| at.as_str().to_string())
        .collect();

    sqlx::query(
        "INSERT INTO promo_codes (code, discount_type, discount_value, valid_from,
         valid_until, max_uses, current_uses, applicable_to, active)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
    )
    .bind(code.code.as_str())
    .bind(discount_type)
    .bind(discount_value)
    .bind(code.valid_from.as_datetime())
    .bind(code.valid_until.as_ref().map(Timestamp::as_datetime))
    .bind(code.max_uses.map(|m| m as i32))
    .bind(code.current_uses as i32)
    .bind(&applicable_to)
    .bind(code.active)
    .execute(pool)
    .await?;

    Ok(())
}

/// Atomically redeem one use of a code.
///
/// Generic over the executor so it can run against the pool or inside
/// an open transaction. Returns `false` when the code is missing,
/// inactive, or its cap is exhausted — the counter is untouched in
/// every one of those cases.
pub async fn redeem<'e, E>(executor: E, code: &str) -> Result<bool, sqlx::Error>
where
    E: sqlx::Executor<'e, Database = sqlx::Postgres>,
{
    let result = sqlx::query(
        "UPDATE promo_codes SET current_uses = current_uses + 1
         WHERE code = $1 AND active
           AND (max_uses IS NULL OR current_uses < max_uses)",
    )
    .bind(code)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all promo codes from the database into the in-memory store on
/// startup. Unreadable rows are logged and skipped.
pub async fn load_all(pool: &PgPool) -> Result<Vec<PromoCode>, sqlx::Error> {
    let rows = sqlx::query_as::<_, PromoRow>(
        "SELECT code, discount_type, discount_value, valid_from, valid_until,
         max_uses, current_uses, applicable_to, active
         FROM promo_codes ORDER BY code",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let code = row.code.clone();
            match row.into_record() {
                Ok(record) => Some(record),
                Err(reason) => {
                    tracing::error!(%code, %reason, "skipping unreadable promo code row");
                    None
                }
            }
        })
        .collect())
}

fn encode_discount(discount: &Discount) -> (&'static str, Decimal) {
    match discount {
        Discount::Percentage(value) => ("percentage", *value),
        Discount::FixedAmount(value) => ("fixed_amount", *value),
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct PromoRow {
    code: String,
    discount_type: String,
    discount_value: Decimal,
    valid_from: DateTime<Utc>,
    valid_until: Option<DateTime<Utc>>,
    max_uses: Option<i32>,
    current_uses: i32,
    applicable_to: Vec<String>,
    active: bool,
}

impl PromoRow {
    fn into_record(self) -> Result<PromoCode, String> {
        let code = CanonicalCode::parse(&self.code)
            .ok_or_else(|| "empty code string".to_string())?;

        let discount = match self.discount_type.as_str() {
            "percentage" => Discount::Percentage(self.discount_value),
            "fixed_amount" => Discount::FixedAmount(self.discount_value),
            other => return Err(format!("unknown discount type {other:?}")),
        };

        let applicable_to = self
            .applicable_to
            .iter()
            .map(|s| {
                AccountType::parse(s).ok_or_else(|| format!("unknown account type {s:?}"))
            })
            .collect::<Result<_, _>>()?;

        let max_uses = match self.max_uses {
            Some(m) if m < 0 => return Err(format!("negative max_uses {m}")),
            Some(m) => Some(m as u32),
            None => None,
        };
        let current_uses =
            u32::try_from(self.current_uses).map_err(|_| "negative current_uses".to_string())?;

        Ok(PromoCode {
            code,
            discount,
            valid_from: Timestamp::from_utc(self.valid_from),
            valid_until: self.valid_until.map(Timestamp::from_utc),
            max_uses,
            current_uses,
            applicable_to,
            active: self.active,
        })
    }
}
