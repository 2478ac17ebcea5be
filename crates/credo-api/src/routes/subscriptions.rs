//! # Subscription Gate API
//!
//! The query the portal shell runs after login: does this wallet hold a
//! current entitlement for its account type? The check is time-aware —
//! a stored `active` status past its expiry instant does not count.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use credo_billing::Subscription;
use credo_core::Timestamp;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Build the subscriptions router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/subscriptions/current", get(current_subscription))
}

/// GET /v1/subscriptions/current — The caller's active subscription.
///
/// 404 when no unexpired subscription exists; the display surface shows
/// the pricing grid in that case.
#[utoipa::path(
    get,
    path = "/v1/subscriptions/current",
    responses(
        (status = 200, description = "The caller's active subscription", body = Object),
        (status = 404, description = "No active subscription", body = crate::error::ErrorBody),
        (status = 403, description = "Caller has no purchasable plans", body = crate::error::ErrorBody),
    ),
    tag = "subscriptions"
)]
pub async fn current_subscription(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Subscription>, AppError> {
    let account_type = caller.account_type()?;
    state
        .store
        .active_subscription(&caller.wallet, account_type, Timestamp::now())
        .map(Json)
        .ok_or_else(|| AppError::NotFound("no active subscription".to_string()))
}
