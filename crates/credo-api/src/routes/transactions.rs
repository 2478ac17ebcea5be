//! # Transaction Ledger API
//!
//! Owner-scoped queries over recorded purchase attempts, plus the
//! idempotent activation retry: if a zero-amount purchase completed but
//! its activation failed mid-flight, the caller re-runs activation here
//! and gets exactly one subscription and one usage increment no matter
//! how many times the call repeats.

use axum::extract::{Path, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credo_billing::{Subscription, Transaction};
use credo_core::{Timestamp, TransactionId};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Response for an activation call.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ActivateResponse {
    /// The subscription for the transaction.
    #[schema(value_type = Object)]
    pub subscription: Subscription,
    /// Whether this call created the subscription (`false` on replay).
    pub newly_activated: bool,
}

/// Build the transactions router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/v1/transactions/:id", get(get_transaction))
        .route("/v1/transactions/:id/activate", post(activate_transaction))
}

/// Fetch a transaction, hiding other purchasers' records.
///
/// Missing and foreign transactions are indistinguishable (both 404) so
/// the endpoint does not leak which identifiers exist.
fn owned_transaction(
    state: &AppState,
    caller: &CallerIdentity,
    id: &TransactionId,
) -> Result<Transaction, AppError> {
    state
        .store
        .transaction(id)
        .filter(|tx| tx.purchaser == caller.wallet)
        .ok_or_else(|| AppError::NotFound(format!("transaction {id} not found")))
}

/// GET /v1/transactions/{id} — Fetch one of the caller's transactions.
#[utoipa::path(
    get,
    path = "/v1/transactions/{id}",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "The transaction", body = Object),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorBody),
    ),
    tag = "transactions"
)]
pub async fn get_transaction(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<Transaction>, AppError> {
    let transaction = owned_transaction(&state, &caller, &TransactionId(id))?;
    Ok(Json(transaction))
}

/// POST /v1/transactions/{id}/activate — Activate a completed transaction.
///
/// Idempotent: re-running for an already-activated transaction returns
/// the existing subscription without a second usage increment. Pending
/// transactions are refused with 409 — they must first be settled.
#[utoipa::path(
    post,
    path = "/v1/transactions/{id}/activate",
    params(("id" = Uuid, Path, description = "Transaction ID")),
    responses(
        (status = 200, description = "Subscription for the transaction", body = ActivateResponse),
        (status = 404, description = "Transaction not found", body = crate::error::ErrorBody),
        (status = 409, description = "Transaction is not completed", body = crate::error::ErrorBody),
    ),
    tag = "transactions"
)]
pub async fn activate_transaction(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<Uuid>,
) -> Result<Json<ActivateResponse>, AppError> {
    let transaction = owned_transaction(&state, &caller, &TransactionId(id))?;

    let outcome = state.store.activate(&transaction.id, Timestamp::now())?;
    super::checkout::persist_activation(&state, &outcome, &transaction).await?;

    let newly_activated = outcome.was_created();
    if newly_activated {
        tracing::info!(transaction_id = %transaction.id,
            subscription_id = %outcome.subscription().id,
            "transaction activated via retry endpoint");
    }

    Ok(Json(ActivateResponse {
        subscription: outcome.into_subscription(),
        newly_activated,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use credo_billing::{CanonicalCode, Discount, PricingPlan, PromoCode};
    use credo_core::{AccountType, CurrencyCode, WalletAddress};
    use http_body_util::BodyExt;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::collections::{BTreeMap, BTreeSet};
    use tower::ServiceExt;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    const NOW: &str = "2026-06-01T12:00:00Z";

    fn test_app(state: AppState, wallet: &str) -> Router {
        let identity = CallerIdentity {
            role: Role::Institution,
            wallet: WalletAddress::new(wallet).unwrap(),
        };
        Router::new()
            .merge(router())
            .layer(axum::Extension(identity))
            .with_state(state)
    }

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

    /// Seed a completed, promo-covered transaction owned by `wallet`.
    fn seed_completed_transaction(state: &AppState, wallet: &str) -> Transaction {
        let p = plan(dec!(100));
        state.store.insert_plan(p.clone());
        state.store.insert_promo_code(PromoCode {
            code: CanonicalCode::parse("FULLRIDE").unwrap(),
            discount: Discount::Percentage(dec!(100)),
            valid_from: ts("2020-01-01T00:00:00Z"),
            valid_until: None,
            max_uses: Some(5),
            current_uses: 0,
            applicable_to: BTreeSet::from([AccountType::Institution]),
            active: true,
        });
        let tx = Transaction::record(
            WalletAddress::new(wallet).unwrap(),
            AccountType::Institution,
            &p,
            CanonicalCode::parse("FULLRIDE"),
            dec!(100),
            ts(NOW),
        );
        state.store.insert_transaction(tx.clone());
        tx
    }

    async fn body_json(resp: axum::response::Response) -> serde_json::Value {
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn get_own_transaction() {
        let state = AppState::new();
        let tx = seed_completed_transaction(&state, "0xOWNER");
        let app = test_app(state, "0xOWNER");

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/transactions/{}", tx.id.as_uuid()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = body_json(resp).await;
        assert_eq!(body["purchaser"], serde_json::json!("0xOWNER"));
    }

    #[tokio::test]
    async fn foreign_transaction_is_hidden() {
        let state = AppState::new();
        let tx = seed_completed_transaction(&state, "0xOWNER");
        let app = test_app(state, "0xSNOOP");

        let resp = app
            .oneshot(
                Request::builder()
                    .uri(format!("/v1/transactions/{}", tx.id.as_uuid()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn activate_twice_yields_one_subscription_and_one_increment() {
        let state = AppState::new();
        let tx = seed_completed_transaction(&state, "0xOWNER");
        let app = test_app(state.clone(), "0xOWNER");

        let activate = |app: Router, id: Uuid| async move {
            let resp = app
                .oneshot(
                    Request::builder()
                        .method("POST")
                        .uri(format!("/v1/transactions/{id}/activate"))
                        .body(Body::empty())
                        .unwrap(),
                )
                .await
                .unwrap();
            assert_eq!(resp.status(), StatusCode::OK);
            body_json(resp).await
        };

        let first = activate(app.clone(), *tx.id.as_uuid()).await;
        let second = activate(app.clone(), *tx.id.as_uuid()).await;

        assert_eq!(first["newly_activated"], serde_json::json!(true));
        assert_eq!(second["newly_activated"], serde_json::json!(false));
        assert_eq!(first["subscription"]["id"], second["subscription"]["id"]);
        assert_eq!(
            state
                .store
                .promo_uses(&CanonicalCode::parse("FULLRIDE").unwrap()),
            Some(1)
        );
    }

    #[tokio::test]
    async fn activating_pending_transaction_is_conflict() {
        let state = AppState::new();
        let p = plan(dec!(100));
        state.store.insert_plan(p.clone());
        let tx = Transaction::record(
            WalletAddress::new("0xOWNER").unwrap(),
            AccountType::Institution,
            &p,
            None,
            Decimal::ZERO,
            ts(NOW),
        );
        state.store.insert_transaction(tx.clone());
        let app = test_app(state, "0xOWNER");

        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/transactions/{}/activate", tx.id.as_uuid()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn activating_missing_transaction_is_404() {
        let state = AppState::new();
        let app = test_app(state, "0xOWNER");

        let resp = app
            .oneshot(
                Request::builder()
                    .method("POST")
                    .uri(format!("/v1/transactions/{}/activate", Uuid::new_v4()))
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
