//! # Checkout API
//!
//! The purchase flow: quote the selection, record the attempt in the
//! ledger, and — when the final amount is zero — activate the
//! subscription in the same request. Non-zero amounts are recorded
//! `pending` and answered with an explicit awaiting-settlement signal;
//! the settlement collaborator that would confirm them is not part of
//! this system, and the engine never fabricates its success.
//!
//! A purchase with a rejected promo code is refused before any write.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credo_billing::{ActivationOutcome, CanonicalCode, Quote, Subscription, Transaction};
use credo_core::{PlanId, Timestamp};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// The user-visible notice for the unimplemented settlement path.
const AWAITING_SETTLEMENT_MESSAGE: &str =
    "Card payment is not yet available. The purchase is recorded and will activate once \
     settlement is confirmed; fully discounted plans activate immediately.";

/// Request body for a purchase attempt.
#[derive(Debug, Deserialize, ToSchema)]
pub struct CheckoutRequest {
    /// The selected plan.
    pub plan_id: Uuid,
    /// Raw promo code input; absent or empty means no code.
    #[serde(default)]
    pub promo_code: Option<String>,
}

/// Settlement signal attached to a recorded purchase.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SettlementSignal {
    /// The final amount was zero; nothing to settle.
    NotRequired,
    /// A non-zero amount awaits the external settlement collaborator.
    AwaitingSettlement {
        /// User-visible explanation.
        message: String,
    },
}

/// Response for a recorded purchase attempt.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CheckoutResponse {
    /// The recorded transaction.
    #[schema(value_type = Object)]
    pub transaction: Transaction,
    /// The activated subscription, present iff the purchase self-completed.
    #[schema(value_type = Option<Object>)]
    pub subscription: Option<Subscription>,
    /// What happens next for the payment.
    pub settlement: SettlementSignal,
}

/// Build the checkout router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/checkout", post(purchase))
}

/// POST /v1/checkout — Record a purchase attempt.
///
/// Flow: the plan gate and promo validator produce a quote; the ledger
/// records the attempt with `final = max(0, price - discount)`; a zero
/// final amount completes immediately and activates the subscription
/// atomically (promo usage increment included).
#[utoipa::path(
    post,
    path = "/v1/checkout",
    request_body = CheckoutRequest,
    responses(
        (status = 201, description = "Purchase attempt recorded", body = CheckoutResponse),
        (status = 404, description = "Plan not found", body = crate::error::ErrorBody),
        (status = 409, description = "Plan no longer offered", body = crate::error::ErrorBody),
        (status = 422, description = "Promo code rejected", body = crate::error::ErrorBody),
        (status = 403, description = "Caller has no purchasable plans", body = crate::error::ErrorBody),
    ),
    tag = "checkout"
)]
pub async fn purchase(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(req): Json<CheckoutRequest>,
) -> Result<(StatusCode, Json<CheckoutResponse>), AppError> {
    let account_type = caller.account_type()?;

    let plan_id = PlanId(req.plan_id);
    let plan = state
        .store
        .plan(&plan_id)
        .ok_or_else(|| AppError::NotFound(format!("plan {plan_id} not found")))?;

    // Quote before any write: a rejected code refuses the purchase here.
    let code = req
        .promo_code
        .as_deref()
        .and_then(CanonicalCode::parse);
    let promo = code.as_ref().and_then(|c| state.store.active_promo_code(c));
    let now = Timestamp::now();
    let quote = Quote::build(&plan, account_type, code, promo.as_ref(), now)?;

    let transaction = Transaction::record(
        caller.wallet.clone(),
        account_type,
        &plan,
        quote.promo_code.clone(),
        quote.discount,
        now,
    );
    state.store.insert_transaction(transaction.clone());

    // Write-through. Failure is surfaced to the client because the
    // in-memory record would be lost on restart, causing silent data loss.
    if let Some(pool) = &state.db_pool {
        if let Err(e) = crate::db::transactions::insert(pool, &transaction).await {
            tracing::error!(transaction_id = %transaction.id, error = %e,
                "failed to persist transaction to database");
            return Err(AppError::StoreUnavailable(
                "transaction recorded in-memory but database persist failed".to_string(),
            ));
        }
    }

    if !transaction.is_completed() {
        tracing::info!(transaction_id = %transaction.id, final_amount = %transaction.final_amount,
            "purchase recorded pending settlement");
        return Ok((
            StatusCode::CREATED,
            Json(CheckoutResponse {
                transaction,
                subscription: None,
                settlement: SettlementSignal::AwaitingSettlement {
                    message: AWAITING_SETTLEMENT_MESSAGE.to_string(),
                },
            }),
        ));
    }

    let outcome = state.store.activate(&transaction.id, now)?;
    persist_activation(&state, &outcome, &transaction).await?;

    tracing::info!(transaction_id = %transaction.id,
        subscription_id = %outcome.subscription().id,
        "zero-amount purchase self-completed and activated");

    Ok((
        StatusCode::CREATED,
        Json(CheckoutResponse {
            transaction,
            subscription: Some(outcome.into_subscription()),
            settlement: SettlementSignal::NotRequired,
        }),
    ))
}

/// Write a fresh activation through to the database: the promo usage
/// increment and the subscription insert run in one SQL transaction,
/// mirroring the store's single critical section.
pub(crate) async fn persist_activation(
    state: &AppState,
    outcome: &ActivationOutcome,
    transaction: &Transaction,
) -> Result<(), AppError> {
    if !outcome.was_created() {
        return Ok(());
    }
    let Some(pool) = &state.db_pool else {
        return Ok(());
    };

    let promo_code = transaction.promo_code.as_ref().map(|c| c.as_str());
    match crate::db::subscriptions::persist_activation(pool, outcome.subscription(), promo_code)
        .await
    {
        Ok(true) => Ok(()),
        Ok(false) => {
            // The database refused the conditional increment that the
            // in-memory store accepted. The copies have diverged.
            tracing::error!(subscription_id = %outcome.subscription().id,
                "database rejected promo redemption already applied in-memory");
            Err(AppError::Internal(
                "activation diverged between store and database".to_string(),
            ))
        }
        Err(e) => {
            tracing::error!(subscription_id = %outcome.subscription().id, error = %e,
                "failed to persist activation to database");
            Err(AppError::StoreUnavailable(
                "subscription activated in-memory but database persist failed".to_string(),
            ))
        }
    }
}
