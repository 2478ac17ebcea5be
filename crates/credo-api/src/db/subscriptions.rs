//! Subscription persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `subscriptions`
//! table. [`persist_activation`] is the durable mirror of the store's
//! activation: the promo usage increment and the subscription insert run
//! in one SQL transaction, so no partial state survives a failure
//! between them.

use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use credo_billing::{Subscription, SubscriptionStatus};
use credo_core::{AccountType, PlanId, SubscriptionId, Timestamp, TransactionId, WalletAddress};

/// Persist a fresh activation.
///
/// When `promo_code` is present, its conditional compare-and-increment
/// must succeed for the subscription insert to happen; both are one SQL
/// transaction. Returns `false` (with everything rolled back) when the
/// code's cap is already exhausted in the database.
pub async fn persist_activation(
    pool: &PgPool,
    subscription: &Subscription,
    promo_code: Option<&str>,
) -> Result<bool, sqlx::Error> {
    let mut db_tx = pool.begin().await?;

    if let Some(code) = promo_code {
        if !crate::db::promo_codes::redeem(&mut *db_tx, code).await? {
            db_tx.rollback().await?;
            return Ok(false);
        }
    }

    sqlx::query(
        "INSERT INTO subscriptions (id, purchaser, account_type, plan_id, status,
         transaction_id, started_at, expires_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
    )
    .bind(subscription.id.as_uuid())
    .bind(subscription.purchaser.as_str())
    .bind(subscription.account_type.as_str())
    .bind(subscription.plan_id.as_uuid())
    .bind(subscription.status.as_str())
    .bind(subscription.transaction_id.as_uuid())
    .bind(subscription.started_at.as_datetime())
    .bind(subscription.expires_at.as_datetime())
    .execute(&mut *db_tx)
    .await?;

    db_tx.commit().await?;
    Ok(true)
}

/// Record a status transition (cancellation, expiry sweep).
pub async fn update_status(
    pool: &PgPool,
    id: &SubscriptionId,
    status: SubscriptionStatus,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query("UPDATE subscriptions SET status = $2 WHERE id = $1")
        .bind(id.as_uuid())
        .bind(status.as_str())
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all subscriptions from the database into the in-memory store on
/// startup. Unreadable rows are logged and skipped.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Subscription>, sqlx::Error> {
    let rows = sqlx::query_as::<_, SubscriptionRow>(
        "SELECT id, purchaser, account_type, plan_id, status, transaction_id,
         started_at, expires_at
         FROM subscriptions ORDER BY started_at",
    )
    .fetch_all(pool)
    .await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id;
            match row.into_record() {
                Ok(record) => Some(record),
                Err(reason) => {
                    tracing::error!(subscription_id = %id, %reason,
                        "skipping unreadable subscription row");
                    None
                }
            }
        })
        .collect())
}

fn parse_status(s: &str) -> Result<SubscriptionStatus, String> {
    match s {
        "active" => Ok(SubscriptionStatus::Active),
        "expired" => Ok(SubscriptionStatus::Expired),
        "cancelled" => Ok(SubscriptionStatus::Cancelled),
        other => Err(format!("unknown subscription status {other:?}")),
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct SubscriptionRow {
    id: Uuid,
    purchaser: String,
    account_type: String,
    plan_id: Uuid,
    status: String,
    transaction_id: Uuid,
    started_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl SubscriptionRow {
    fn into_record(self) -> Result<Subscription, String> {
        Ok(Subscription {
            id: SubscriptionId(self.id),
            purchaser: WalletAddress::new(self.purchaser).map_err(|e| e.to_string())?,
            account_type: AccountType::parse(&self.account_type)
                .ok_or_else(|| format!("unknown account type {:?}", self.account_type))?,
            plan_id: PlanId(self.plan_id),
            status: parse_status(&self.status)?,
            transaction_id: TransactionId(self.transaction_id),
            started_at: Timestamp::from_utc(self.started_at),
            expires_at: Timestamp::from_utc(self.expires_at),
        })
    }
}
