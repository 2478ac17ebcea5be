//! # OpenAPI Specification Assembly
//!
//! Assembles all utoipa-documented routes into a single OpenAPI spec,
//! served at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::OpenApi;

use crate::state::AppState;

/// Assembled OpenAPI spec for the entire API surface.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Credo Commerce Gate",
        version = "0.3.2",
        description = "Pricing and subscription transaction engine for the Credo academic credentials portal: plan catalog, promo validation, purchase ledger, and subscription activation.",
        license(name = "Apache-2.0")
    ),
    paths(
        crate::routes::plans::list_plans,
        crate::routes::promo::validate_promo,
        crate::routes::checkout::purchase,
        crate::routes::transactions::get_transaction,
        crate::routes::transactions::activate_transaction,
        crate::routes::subscriptions::current_subscription,
    ),
    components(schemas(
        // Error types
        crate::error::ErrorBody,
        crate::error::ErrorDetail,
        // DTOs
        crate::routes::promo::ValidatePromoRequest,
        crate::routes::promo::PromoPreview,
        crate::routes::checkout::CheckoutRequest,
        crate::routes::checkout::CheckoutResponse,
        crate::routes::checkout::SettlementSignal,
        crate::routes::transactions::ActivateResponse,
    )),
    tags(
        (name = "plans", description = "Plan Catalog — purchasable tiers per account type"),
        (name = "promo", description = "Promo Validator — discount previews"),
        (name = "checkout", description = "Transaction Ledger — purchase attempts"),
        (name = "transactions", description = "Ledger queries and activation retry"),
        (name = "subscriptions", description = "Subscription Activator — the entitlement gate"),
    )
)]
pub struct ApiDoc;

/// Build the OpenAPI router.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

/// GET /openapi.json — Return the generated OpenAPI specification.
async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
