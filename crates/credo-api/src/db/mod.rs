//! # Database Persistence Layer
//!
//! Provides Postgres persistence for the billing store via SQLx.
//!
//! ## Architecture
//!
//! The database layer is **optional**. When `DATABASE_URL` is set, the
//! API persists plans, promo codes, transactions, and subscriptions to
//! PostgreSQL and hydrates the in-memory store from it on startup. When
//! absent, the API operates in in-memory-only mode (suitable for
//! development and testing).
//!
//! Promo redemption uses a conditional `UPDATE ... WHERE current_uses <
//! max_uses`, so the cap check and the increment are one statement at
//! the database too — a second process cannot split them.

pub mod plans;
pub mod promo_codes;
pub mod subscriptions;
pub mod transactions;

use sqlx::postgres::{PgPool, PgPoolOptions};

/// Initialize the database connection pool and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory-only mode).
/// Returns `Err` if the URL is set but the connection or migration fails.
pub async fn init_pool() -> Result<Option<PgPool>, sqlx::Error> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set — running in-memory only mode. \
                 State will not survive restarts."
            );
            return Ok(None);
        }
    };

    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(std::time::Duration::from_secs(5))
        .connect(&url)
        .await?;

    tracing::info!("Connected to PostgreSQL");

    // Run embedded migrations.
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Database migrations applied");

    Ok(Some(pool))
}
