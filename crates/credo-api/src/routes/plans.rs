//! # Plan Catalog API
//!
//! Read-only listing of the purchasable plans for the caller's account
//! type. Side-effect-free; the order is store-native and callers must
//! not assume price-sorted output.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use credo_billing::PricingPlan;

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Build the plans router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/plans", get(list_plans))
}

/// GET /v1/plans — List active plans for the caller's account type.
///
/// Students have no purchasable plans and receive 403.
#[utoipa::path(
    get,
    path = "/v1/plans",
    responses(
        (status = 200, description = "Active plans for the caller's account type", body = [Object]),
        (status = 403, description = "Caller has no purchasable plans", body = crate::error::ErrorBody),
    ),
    tag = "plans"
)]
pub async fn list_plans(
    State(state): State<AppState>,
    caller: CallerIdentity,
) -> Result<Json<Vec<PricingPlan>>, AppError> {
    let account_type = caller.account_type()?;
    Ok(Json(state.store.list_plans(account_type)))
}
