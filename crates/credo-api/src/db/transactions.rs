//! Transaction persistence operations.
//!
//! All functions take a `&PgPool` and operate on the `transactions`
//! table. The ledger is append-only: a transaction is inserted exactly
//! once per purchase attempt, and only the settlement transition
//! updates it.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::PgPool;
use uuid::Uuid;

use credo_billing::{CanonicalCode, Transaction, TransactionStatus};
use credo_core::{AccountType, CurrencyCode, PlanId, Timestamp, TransactionId, WalletAddress};

/// Insert a new transaction.
pub async fn insert(pool: &PgPool, transaction: &Transaction) -> Result<(), sqlx::Error> {
    sqlx::query(
        "INSERT INTO transactions (id, purchaser, account_type, plan_id, amount,
         currency, promo_code, discount_applied, final_amount, status,
         created_at, completed_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
    )
    .bind(transaction.id.as_uuid())
    .bind(transaction.purchaser.as_str())
    .bind(transaction.account_type.as_str())
    .bind(transaction.plan_id.as_uuid())
    .bind(transaction.amount)
    .bind(transaction.currency.as_str())
    .bind(transaction.promo_code.as_ref().map(CanonicalCode::as_str))
    .bind(transaction.discount_applied)
    .bind(transaction.final_amount)
    .bind(transaction.status.as_str())
    .bind(transaction.created_at.as_datetime())
    .bind(transaction.completed_at.as_ref().map(Timestamp::as_datetime))
    .execute(pool)
    .await?;

    Ok(())
}

/// Record a settlement transition (pending → completed/failed).
pub async fn update_status(
    pool: &PgPool,
    id: &TransactionId,
    status: TransactionStatus,
    completed_at: Option<Timestamp>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE transactions SET status = $2, completed_at = $3
         WHERE id = $1 AND status = 'pending'",
    )
    .bind(id.as_uuid())
    .bind(status.as_str())
    .bind(completed_at.as_ref().map(Timestamp::as_datetime))
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Load all transactions from the database into the in-memory store on
/// startup. Unreadable rows are logged and skipped.
pub async fn load_all(pool: &PgPool) -> Result<Vec<Transaction>, sqlx::Error> {
    let rows = sqlx::query_as::<_, TransactionRow>(
        "SELECT id, purchaser, account_type, plan_id, amount, currency,
         promo_code, discount_applied, final_amount, status, created_at, completed_at
         FROM transactions ORDER BY created_at",
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
                    tracing::error!(transaction_id = %id, %reason,
                        "skipping unreadable transaction row");
                    None
                }
            }
        })
        .collect())
}

fn parse_status(s: &str) -> Result<TransactionStatus, String> {
    match s {
        "pending" => Ok(TransactionStatus::Pending),
        "completed" => Ok(TransactionStatus::Completed),
        "failed" => Ok(TransactionStatus::Failed),
        other => Err(format!("unknown transaction status {other:?}")),
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    purchaser: String,
    account_type: String,
    plan_id: Uuid,
    amount: Decimal,
    currency: String,
    promo_code: Option<String>,
    discount_applied: Decimal,
    final_amount: Decimal,
    status: String,
    created_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
}

impl TransactionRow {
    fn into_record(self) -> Result<Transaction, String> {
        let promo_code = match self.promo_code {
            Some(raw) => Some(
                CanonicalCode::parse(&raw).ok_or_else(|| "empty promo code".to_string())?,
            ),
            None => None,
        };

        Ok(Transaction {
            id: TransactionId(self.id),
            purchaser: WalletAddress::new(self.purchaser).map_err(|e| e.to_string())?,
            account_type: AccountType::parse(&self.account_type)
                .ok_or_else(|| format!("unknown account type {:?}", self.account_type))?,
            plan_id: PlanId(self.plan_id),
            amount: self.amount,
            currency: CurrencyCode::new(&self.currency).map_err(|e| e.to_string())?,
            promo_code,
            discount_applied: self.discount_applied,
            final_amount: self.final_amount,
            status: parse_status(&self.status)?,
            created_at: Timestamp::from_utc(self.created_at),
            completed_at: self.completed_at.map(Timestamp::from_utc),
        })
    }
}
