//! # API Error Types
//!
//! Structured error type implementing `axum::response::IntoResponse`.
//! Maps domain errors from credo-billing and credo-core to HTTP status
//! codes and JSON error bodies with a machine-readable code and a
//! user-visible message. Internal details are logged, never returned.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use credo_billing::{CheckoutError, PromoRejection};

use crate::state::ActivateError;

/// Structured JSON error response body.
///
/// All error responses use this format for consistency across the API
/// surface.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    pub error: ErrorDetail,
}

/// Inner error detail.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "NOT_FOUND", "VALIDATION_ERROR").
    pub code: String,
    /// Human-readable error message.
    pub message: String,
}

/// Application-level error type that implements [`IntoResponse`] for Axum.
#[derive(Error, Debug)]
pub enum AppError {
    /// Resource not found (404).
    #[error("not found: {0}")]
    NotFound(String),

    /// Request validation failed (422).
    #[error("validation error: {0}")]
    Validation(String),

    /// Request body could not be parsed (400).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Authentication failure — missing or invalid token (401).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Authorization failure — insufficient permissions (403).
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Conflict with current resource state (409).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The backing store is transiently unavailable (503).
    /// Details are logged; the client sees a generic message and may
    /// retry the whole operation.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Internal server error (500). Message is logged but not returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    /// Return the HTTP status code and machine-readable error code.
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            Self::StoreUnavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "STORE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();

        // Never expose internal or infrastructure details to clients.
        let message = match &self {
            Self::Internal(_) => "An internal error occurred".to_string(),
            Self::StoreUnavailable(_) => {
                "The service is temporarily unavailable, please retry".to_string()
            }
            other => other.to_string(),
        };

        match &self {
            Self::Internal(_) => tracing::error!(error = %self, "internal server error"),
            Self::StoreUnavailable(_) => tracing::warn!(error = %self, "store unavailable"),
            _ => {}
        }

        let body = ErrorBody {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

/// Convert core validation errors to API errors.
impl From<credo_core::ValidationError> for AppError {
    fn from(err: credo_core::ValidationError) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Convert promo rejections to API errors.
///
/// Used when a rejected code blocks a purchase (the purchase is refused
/// before any write). Previews return rejections as plain data instead.
impl From<PromoRejection> for AppError {
    fn from(err: PromoRejection) -> Self {
        Self::Validation(err.to_string())
    }
}

/// Convert checkout quoting errors to API errors.
impl From<CheckoutError> for AppError {
    fn from(err: CheckoutError) -> Self {
        match err {
            CheckoutError::PlanInactive { .. } => Self::Conflict(err.to_string()),
            CheckoutError::AccountTypeMismatch { .. } => Self::Forbidden(err.to_string()),
            CheckoutError::Promo(rejection) => rejection.into(),
        }
    }
}

/// Convert store activation failures to API errors.
impl From<ActivateError> for AppError {
    fn from(err: ActivateError) -> Self {
        match &err {
            ActivateError::TransactionNotFound(id) => {
                Self::NotFound(format!("transaction {id} not found"))
            }
            ActivateError::Activation(_) => Self::Conflict(err.to_string()),
        }
    }
}
