//! # credo-api — Axum API Service for the Credo Commerce Gate
//!
//! The HTTP surface of the pricing and subscription transaction engine.
//! Role selection, navigation, and profile management live in the portal
//! frontend; this service supplies the commerce decisions behind them.
//!
//! ## API Surface
//!
//! | Prefix                        | Module                      | Component              |
//! |-------------------------------|-----------------------------|------------------------|
//! | `/v1/plans`                   | [`routes::plans`]           | Plan Catalog           |
//! | `/v1/promo-codes/validate`    | [`routes::promo`]           | Promo Validator        |
//! | `/v1/checkout`                | [`routes::checkout`]        | Transaction Ledger     |
//! | `/v1/transactions/*`          | [`routes::transactions`]    | Ledger + Activator     |
//! | `/v1/subscriptions/current`   | [`routes::subscriptions`]   | Entitlement gate       |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → AuthMiddleware → RateLimitMiddleware → Handler
//! ```
//!
//! ## Crate Policy
//!
//! - No business logic in route handlers — the rules live in `credo-billing`,
//!   the atomicity lives in [`state::BillingStore`].
//! - All errors map to structured HTTP responses via [`error::AppError`].

pub mod auth;
pub mod db;
pub mod error;
pub mod middleware;
pub mod openapi;
pub mod routes;
pub mod state;

pub use error::AppError;
pub use state::{AppConfig, AppState};

use axum::middleware::from_fn;
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::auth::AuthConfig;
use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::{RateLimitConfig, RateLimiter};

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`) are mounted outside the auth middleware
/// so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = AuthConfig {
        token: state.config.auth_token.clone(),
    };
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(RateLimitConfig::default());

    // Authenticated API routes.
    let api = Router::new()
        .merge(routes::plans::router())
        .merge(routes::promo::router())
        .merge(routes::checkout::router())
        .merge(routes::transactions::router())
        .merge(routes::subscriptions::router())
        .merge(openapi::router())
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state);

    // Unauthenticated health probes.
    let health = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness));

    Router::new().merge(health).merge(api)
}

/// Liveness probe — always returns 200 if the process is running.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe — returns 200 when the application is ready to serve.
async fn readiness() -> &'static str {
    "ready"
}
