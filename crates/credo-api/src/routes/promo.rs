//! # Promo Code Preview API
//!
//! Validates a promo code against a plan selection and returns the
//! discount preview — or the rejection reason — as plain data for the
//! display surface. A rejected preview is a 200, not an error: the user
//! typing a bad code is an expected outcome the UI renders verbatim.
//!
//! Previews never mutate anything; usage counters are only touched by
//! activation.

use axum::extract::State;
use axum::routing::post;
use axum::{Json, Router};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use credo_billing::{CanonicalCode, CheckoutError, PromoRejection, Quote};
use credo_core::{PlanId, Timestamp};

use crate::auth::CallerIdentity;
use crate::error::AppError;
use crate::state::AppState;

/// Request body for a discount preview.
#[derive(Debug, Deserialize, ToSchema)]
pub struct ValidatePromoRequest {
    /// The selected plan.
    pub plan_id: Uuid,
    /// Raw promo code input; empty means "no code supplied".
    #[serde(default)]
    pub code: String,
}

/// Discount preview for the display surface.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct PromoPreview {
    /// Whether the code (or its absence) yields a usable quote.
    pub valid: bool,
    /// Discount amount; zero when rejected or no code supplied.
    #[schema(value_type = String)]
    pub discount: Decimal,
    /// The price the caller would pay.
    #[schema(value_type = String)]
    pub final_amount: Decimal,
    /// Machine-readable rejection reason, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<String>)]
    pub rejection: Option<PromoRejection>,
    /// User-facing message for the rejection, absent on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Build the promo router.
pub fn router() -> Router<AppState> {
    Router::new().route("/v1/promo-codes/validate", post(validate_promo))
}

/// POST /v1/promo-codes/validate — Preview a code against a plan.
#[utoipa::path(
    post,
    path = "/v1/promo-codes/validate",
    request_body = ValidatePromoRequest,
    responses(
        (status = 200, description = "Discount preview or rejection reason", body = PromoPreview),
        (status = 404, description = "Plan not found", body = crate::error::ErrorBody),
        (status = 403, description = "Caller has no purchasable plans", body = crate::error::ErrorBody),
    ),
    tag = "promo"
)]
pub async fn validate_promo(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Json(req): Json<ValidatePromoRequest>,
) -> Result<Json<PromoPreview>, AppError> {
    let account_type = caller.account_type()?;

    let plan_id = PlanId(req.plan_id);
    let plan = state
        .store
        .plan(&plan_id)
        .ok_or_else(|| AppError::NotFound(format!("plan {plan_id} not found")))?;

    let code = CanonicalCode::parse(&req.code);
    let promo = code.as_ref().and_then(|c| state.store.active_promo_code(c));

    let preview = match Quote::build(&plan, account_type, code, promo.as_ref(), Timestamp::now()) {
        Ok(quote) => PromoPreview {
            valid: true,
            discount: quote.discount,
            final_amount: quote.final_amount,
            rejection: None,
            message: None,
        },
        Err(CheckoutError::Promo(rejection)) => rejected(rejection, plan.price),
        Err(other) => return Err(other.into()),
    };

    Ok(Json(preview))
}

/// Build the preview for a rejected code: no discount, full list price.
fn rejected(rejection: PromoRejection, list_price: Decimal) -> PromoPreview {
    PromoPreview {
        valid: false,
        discount: Decimal::ZERO,
        final_amount: list_price,
        rejection: Some(rejection),
        message: Some(rejection.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use credo_billing::{Discount, PricingPlan, PromoCode};
    use credo_core::{AccountType, CurrencyCode, WalletAddress};
    use http_body_util::BodyExt;
    use rust_decimal_macros::dec;
    use std::collections::{BTreeMap, BTreeSet};
    use tower::ServiceExt;

    fn ts(s: &str) -> Timestamp {
        Timestamp::parse(s).unwrap()
    }

    fn test_app(state: AppState, role: Role) -> Router {
        let identity = CallerIdentity {
            role,
            wallet: WalletAddress::new("0xTEST").unwrap(),
        };
        Router::new()
            .merge(router())
            .layer(axum::Extension(identity))
            .with_state(state)
    }

    fn seeded_state() -> (AppState, PricingPlan) {
        let state = AppState::new();
        let plan = PricingPlan::new(
            AccountType::Institution,
            "Campus",
            dec!(100),
            CurrencyCode::usd(),
            BTreeMap::new(),
        )
        .unwrap();
        state.store.insert_plan(plan.clone());
        state.store.insert_promo_code(PromoCode {
            code: CanonicalCode::parse("TEN").unwrap(),
            discount: Discount::Percentage(dec!(10)),
            valid_from: ts("2020-01-01T00:00:00Z"),
            valid_until: None,
            max_uses: None,
            current_uses: 0,
            applicable_to: BTreeSet::from([AccountType::Institution]),
            active: true,
        });
        (state, plan)
    }

    async fn preview(app: Router, plan_id: Uuid, code: &str) -> (StatusCode, serde_json::Value) {
        let body = serde_json::json!({ "plan_id": plan_id, "code": code });
        let req = Request::builder()
            .method("POST")
            .uri("/v1/promo-codes/validate")
            .header("content-type", "application/json")
            .body(Body::from(serde_json::to_string(&body).unwrap()))
            .unwrap();
        let resp = app.oneshot(req).await.unwrap();
        let status = resp.status();
        let bytes = resp.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn valid_code_previews_discount() {
        let (state, plan) = seeded_state();
        let app = test_app(state, Role::Institution);

        let (status, body) = preview(app, *plan.id.as_uuid(), "ten").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], serde_json::json!(true));
        assert_eq!(body["discount"], serde_json::json!("10"));
        assert_eq!(body["final_amount"], serde_json::json!("90"));
        assert!(body.get("rejection").is_none());
    }

    #[tokio::test]
    async fn unknown_code_previews_rejection_as_data() {
        let (state, plan) = seeded_state();
        let app = test_app(state, Role::Institution);

        let (status, body) = preview(app, *plan.id.as_uuid(), "NOSUCH").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], serde_json::json!(false));
        assert_eq!(body["rejection"], serde_json::json!("invalid_code"));
        assert_eq!(body["final_amount"], serde_json::json!("100"));
        assert!(body["message"].as_str().unwrap().contains("nvalid"));
    }

    #[tokio::test]
    async fn empty_code_is_no_discount_not_error() {
        let (state, plan) = seeded_state();
        let app = test_app(state, Role::Institution);

        let (status, body) = preview(app, *plan.id.as_uuid(), "   ").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["valid"], serde_json::json!(true));
        assert_eq!(body["discount"], serde_json::json!("0"));
        assert_eq!(body["final_amount"], serde_json::json!("100"));
    }

    #[tokio::test]
    async fn preview_never_mutates_usage() {
        let (state, plan) = seeded_state();
        let app = test_app(state.clone(), Role::Institution);

        let code = CanonicalCode::parse("TEN").unwrap();
        let before = state.store.promo_uses(&code);
        let _ = preview(app, *plan.id.as_uuid(), "TEN").await;
        assert_eq!(state.store.promo_uses(&code), before);
    }

    #[tokio::test]
    async fn missing_plan_is_404() {
        let (state, _) = seeded_state();
        let app = test_app(state, Role::Institution);

        let (status, _) = preview(app, Uuid::new_v4(), "TEN").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn employer_preview_on_institution_plan_is_forbidden() {
        let (state, plan) = seeded_state();
        let app = test_app(state, Role::Employer);

        let (status, _) = preview(app, *plan.id.as_uuid(), "TEN").await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
