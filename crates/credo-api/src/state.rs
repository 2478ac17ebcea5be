//! # Application State
//!
//! Shared state for the Axum application, passed to all route handlers
//! via the `State` extractor.
//!
//! ## Store Architecture
//!
//! [`BillingStore`] is the authoritative store: a single
//! `parking_lot::RwLock` over all four record maps. One lock domain —
//! rather than a lock per record type — because subscription activation
//! must check idempotency, redeem the promo code, and insert the
//! subscription as one unit. Splitting that across locks would reopen
//! the read-then-write race on capped codes that the engine exists to
//! close.
//!
//! All operations are synchronous (the lock is `parking_lot`, not
//! `tokio::sync`) because the lock is never held across `.await` points.
//! `parking_lot` locks are non-poisonable — a panicking writer does not
//! permanently corrupt the store.
//!
//! When a database pool is configured, mutations are written through to
//! Postgres by the route handlers and the store is hydrated from
//! Postgres on startup.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use credo_billing::{
    ActivationError, ActivationOutcome, CanonicalCode, PricingPlan, PromoCode, Subscription,
    Transaction,
};
use credo_core::{AccountType, PlanId, Timestamp, TransactionId, WalletAddress};

// -- Billing Store ------------------------------------------------------------

/// The record maps guarded by the store's single lock.
#[derive(Debug, Default)]
struct BillingRecords {
    plans: HashMap<Uuid, PricingPlan>,
    /// Keyed by canonical code string.
    promo_codes: HashMap<String, PromoCode>,
    transactions: HashMap<Uuid, Transaction>,
    subscriptions: HashMap<Uuid, Subscription>,
    /// Idempotency index: transaction UUID → subscription UUID.
    subscription_by_transaction: HashMap<Uuid, Uuid>,
}

/// Failure of a store-level activation call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActivateError {
    /// No transaction with that identifier exists.
    #[error("transaction {0} not found")]
    TransactionNotFound(TransactionId),

    /// The activation preconditions failed; nothing was mutated.
    #[error(transparent)]
    Activation(#[from] ActivationError),
}

/// Thread-safe, cloneable in-memory billing store.
#[derive(Debug, Clone, Default)]
pub struct BillingStore {
    records: Arc<RwLock<BillingRecords>>,
}

impl BillingStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    // -- Plan catalog ---------------------------------------------------------

    /// Insert a plan into the catalog.
    pub fn insert_plan(&self, plan: PricingPlan) {
        self.records.write().plans.insert(*plan.id.as_uuid(), plan);
    }

    /// Fetch a plan by ID, active or not.
    pub fn plan(&self, id: &PlanId) -> Option<PricingPlan> {
        self.records.read().plans.get(id.as_uuid()).cloned()
    }

    /// List the active plans offered to an account type, in store order.
    ///
    /// Callers must not assume price-sorted output.
    pub fn list_plans(&self, account_type: AccountType) -> Vec<PricingPlan> {
        self.records
            .read()
            .plans
            .values()
            .filter(|p| p.is_listed_for(account_type))
            .cloned()
            .collect()
    }

    // -- Promo codes ----------------------------------------------------------

    /// Insert a promo code, returning the previous record if the code existed.
    pub fn insert_promo_code(&self, code: PromoCode) -> Option<PromoCode> {
        self.records
            .write()
            .promo_codes
            .insert(code.code.as_str().to_string(), code)
    }

    /// Look up an active promo code by canonical form.
    ///
    /// Inactive codes are indistinguishable from unknown ones, exactly
    /// like the catalog lookup the validator's first check describes.
    pub fn active_promo_code(&self, code: &CanonicalCode) -> Option<PromoCode> {
        self.records
            .read()
            .promo_codes
            .get(code.as_str())
            .filter(|c| c.active)
            .cloned()
    }

    /// Current usage counter of a code, active or not.
    pub fn promo_uses(&self, code: &CanonicalCode) -> Option<u32> {
        self.records
            .read()
            .promo_codes
            .get(code.as_str())
            .map(|c| c.current_uses)
    }

    // -- Transactions ---------------------------------------------------------

    /// Record a transaction. The ledger is append-only: a transaction is
    /// created exactly once per purchase attempt.
    pub fn insert_transaction(&self, transaction: Transaction) {
        self.records
            .write()
            .transactions
            .insert(*transaction.id.as_uuid(), transaction);
    }

    /// Fetch a transaction by ID.
    pub fn transaction(&self, id: &TransactionId) -> Option<Transaction> {
        self.records.read().transactions.get(id.as_uuid()).cloned()
    }

    // -- Subscriptions --------------------------------------------------------

    /// Insert a subscription directly (hydration path only).
    pub fn insert_subscription(&self, subscription: Subscription) {
        let mut records = self.records.write();
        records
            .subscription_by_transaction
            .insert(*subscription.transaction_id.as_uuid(), *subscription.id.as_uuid());
        records
            .subscriptions
            .insert(*subscription.id.as_uuid(), subscription);
    }

    /// The caller's subscription that is active at `now`, if any.
    pub fn active_subscription(
        &self,
        purchaser: &WalletAddress,
        account_type: AccountType,
        now: Timestamp,
    ) -> Option<Subscription> {
        self.records
            .read()
            .subscriptions
            .values()
            .find(|s| {
                s.purchaser == *purchaser
                    && s.account_type == account_type
                    && s.is_active_at(now)
            })
            .cloned()
    }

    /// Activate the subscription for a completed transaction.
    ///
    /// The whole sequence — idempotency check, activation preconditions,
    /// checked promo redemption, subscription insert — runs under one
    /// write lock. Either every effect is applied or none is: a failed
    /// redemption leaves no subscription behind, and a repeated call for
    /// an already-activated transaction returns the existing record
    /// without touching the usage counter.
    pub fn activate(
        &self,
        id: &TransactionId,
        now: Timestamp,
    ) -> Result<ActivationOutcome, ActivateError> {
        let mut records = self.records.write();

        let transaction = records
            .transactions
            .get(id.as_uuid())
            .cloned()
            .ok_or(ActivateError::TransactionNotFound(*id))?;

        if let Some(existing_id) = records.subscription_by_transaction.get(id.as_uuid()) {
            if let Some(existing) = records.subscriptions.get(existing_id) {
                return Ok(ActivationOutcome::Existing(existing.clone()));
            }
        }

        // Validates the completed-transaction precondition before any mutation.
        let subscription = Subscription::activate(&transaction, now)?;

        if let Some(code) = &transaction.promo_code {
            let promo = records.promo_codes.get_mut(code.as_str()).ok_or_else(|| {
                ActivationError::PromoMissing {
                    code: code.as_str().to_string(),
                }
            })?;
            promo.redeem().map_err(|_| ActivationError::PromoExhausted {
                code: code.as_str().to_string(),
            })?;
        }

        records
            .subscription_by_transaction
            .insert(*transaction.id.as_uuid(), *subscription.id.as_uuid());
        records
            .subscriptions
            .insert(*subscription.id.as_uuid(), subscription.clone());

        Ok(ActivationOutcome::Fresh(subscription))
    }
}

// -- Application Configuration ------------------------------------------------

/// Application configuration.
///
/// Custom `Debug` redacts the `auth_token` to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Static bearer secret. If `None`, authentication is disabled and a
    /// development identity is injected.
    pub auth_token: Option<String>,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            auth_token: None,
        }
    }
}

// -- Application State --------------------------------------------------------

/// Shared application state accessible to all route handlers.
///
/// Clone-friendly via `Arc` internals in the store.
#[derive(Debug, Clone)]
pub struct AppState {
    /// The authoritative billing store.
    pub store: BillingStore,

    /// PostgreSQL connection pool for durable persistence.
    /// When `Some`, mutations are written through and the store is
    /// hydrated on startup. When `None`, the API operates in
    /// in-memory-only mode.
    pub db_pool: Option<PgPool>,

    /// Application configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Create a new application state with default configuration and no
    /// database pool.
    pub fn new() -> Self {
        Self::with_config(AppConfig::default(), None)
    }

    /// Create a new application state with the given configuration and
    /// optional database pool.
    pub fn with_config(config: AppConfig, db_pool: Option<PgPool>) -> Self {
        Self {
            store: BillingStore::new(),
            db_pool,
            config,
        }
    }

    /// Hydrate the in-memory store from the database.
    ///
    /// Called once on startup when a database pool is available, so read
    /// operations stay fast and synchronous afterwards.
    pub async fn hydrate_from_db(&self) -> Result<(), String> {
        let pool = match &self.db_pool {
            Some(pool) => pool,
            None => return Ok(()),
        };

        let plans = crate::db::plans::load_all(pool)
            .await
            .map_err(|e| format!("failed to load plans: {e}"))?;
        let plan_count = plans.len();
        for plan in plans {
            self.store.insert_plan(plan);
        }

        let promo_codes = crate::db::promo_codes::load_all(pool)
            .await
            .map_err(|e| format!("failed to load promo codes: {e}"))?;
        let promo_count = promo_codes.len();
        for code in promo_codes {
            self.store.insert_promo_code(code);
        }

        let transactions = crate::db::transactions::load_all(pool)
            .await
            .map_err(|e| format!("failed to load transactions: {e}"))?;
        let transaction_count = transactions.len();
        for transaction in transactions {
            self.store.insert_transaction(transaction);
        }

        let subscriptions = crate::db::subscriptions::load_all(pool)
            .await
            .map_err(|e| format!("failed to load subscriptions: {e}"))?;
        let subscription_count = subscriptions.len();
        for subscription in subscriptions {
            self.store.insert_subscription(subscription);
        }

        tracing::info!(
            plans = plan_count,
            promo_codes = promo_count,
            transactions = transaction_count,
            subscriptions = subscription_count,
            "Hydrated in-memory store from database"
        );

        Ok(())
    }

    /// Seed the demonstration catalog for in-memory mode: three plans per
    /// account type, mirroring the portal's pricing grid.
    pub fn seed_demo_catalog(&self) {
        for plan in demo_catalog() {
            self.store.insert_plan(plan);
        }
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

/// The demonstration plan catalog.
fn demo_catalog() -> Vec<PricingPlan> {
    use credo_billing::FeatureValue::{Flag, Limit, Unlimited};
    use credo_core::CurrencyCode;
    use rust_decimal::Decimal;
    use std::collections::BTreeMap;

    let plan = |account_type, name: &str, price: u32, features: BTreeMap<String, _>| {
        PricingPlan::new(
            account_type,
            name,
            Decimal::from(price),
            CurrencyCode::usd(),
            features,
        )
        .expect("demo catalog plans are valid")
    };

    vec![
        plan(
            AccountType::Institution,
            "Campus Starter",
            99,
            BTreeMap::from([
                ("credentials_per_month".into(), Limit(100)),
                ("api_access".into(), Flag(false)),
                ("bulk_issuance".into(), Flag(false)),
            ]),
        ),
        plan(
            AccountType::Institution,
            "Campus Pro",
            299,
            BTreeMap::from([
                ("credentials_per_month".into(), Limit(1000)),
                ("api_access".into(), Flag(true)),
                ("bulk_issuance".into(), Flag(true)),
            ]),
        ),
        plan(
            AccountType::Institution,
            "Campus Enterprise",
            999,
            BTreeMap::from([
                ("credentials_per_month".into(), Unlimited),
                ("api_access".into(), Flag(true)),
                ("bulk_issuance".into(), Flag(true)),
                ("priority_support".into(), Flag(true)),
            ]),
        ),
        plan(
            AccountType::Employer,
            "Verifier Basic",
            49,
            BTreeMap::from([
                ("verifications_per_month".into(), Limit(50)),
                ("api_access".into(), Flag(false)),
            ]),
        ),
        plan(
            AccountType::Employer,
            "Verifier Growth",
            149,
            BTreeMap::from([
                ("verifications_per_month".into(), Limit(500)),
                ("api_access".into(), Flag(true)),
            ]),
        ),
        plan(
            AccountType::Employer,
            "Verifier Enterprise",
            499,
            BTreeMap::from([
                ("verifications_per_month".into(), Unlimited),
                ("api_access".into(), Flag(true)),
                ("priority_support".into(), Flag(true)),
            ]),
        ),
    ]
}
