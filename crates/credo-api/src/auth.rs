//! # Authentication Middleware
//!
//! Bearer token middleware supplying the caller principal. The engine
//! trusts the identity collaborator; this layer only parses and verifies
//! the shared secret, it performs no account lookups.
//!
//! ## Token Format
//!
//! ```text
//! Bearer {role}:{wallet}:{secret}
//! ```
//!
//! `role` is one of `student`, `institution`, `employer`; `wallet` is the
//! caller's opaque wallet address. The secret is compared in constant
//! time against the configured `AUTH_TOKEN`.
//!
//! ## CallerIdentity
//!
//! Every authenticated request gets a [`CallerIdentity`] injected into
//! the request extensions. Handlers extract it via the
//! `FromRequestParts` impl.

use axum::extract::Request;
use axum::http::request::Parts;
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use utoipa::ToSchema;

use credo_core::{AccountType, WalletAddress};

use crate::error::{AppError, ErrorBody, ErrorDetail};

// ── Role ────────────────────────────────────────────────────────────────────

/// Portal roles. These are peers, not a privilege hierarchy: a student
/// holds credentials, an institution issues them, an employer verifies
/// them. Only the latter two ever reach the commerce gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Holds credentials; never purchases.
    Student,
    /// Issues credentials; buys institution plans.
    Institution,
    /// Verifies credentials; buys employer plans.
    Employer,
}

impl Role {
    /// Return the string representation of this role.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Institution => "institution",
            Self::Employer => "employer",
        }
    }

    /// The account type this role purchases under, if any.
    pub fn purchasable_account_type(&self) -> Option<AccountType> {
        match self {
            Self::Student => None,
            Self::Institution => Some(AccountType::Institution),
            Self::Employer => Some(AccountType::Employer),
        }
    }
}

// ── CallerIdentity ──────────────────────────────────────────────────────────

/// Identity of the authenticated caller, available to all route handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity {
    /// The caller's role in the portal.
    pub role: Role,
    /// The caller's wallet address.
    pub wallet: WalletAddress,
}

impl CallerIdentity {
    /// The account type this caller purchases under.
    ///
    /// Returns 403 Forbidden for students — the commerce gate only
    /// applies to institutions and employers.
    pub fn account_type(&self) -> Result<AccountType, AppError> {
        self.role.purchasable_account_type().ok_or_else(|| {
            AppError::Forbidden(format!(
                "role '{}' has no purchasable plans",
                self.role.as_str()
            ))
        })
    }
}

/// Extracts the identity that the auth middleware injected into extensions.
/// Returns 401 if no identity is present (middleware didn't run or failed).
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for CallerIdentity {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerIdentity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("no caller identity in request context".into()))
    }
}

// ── Auth Configuration ──────────────────────────────────────────────────────

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage
/// in logs.
#[derive(Clone)]
pub struct AuthConfig {
    pub token: Option<String>,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

// ── Token Validation ────────────────────────────────────────────────────────

/// Constant-time comparison of bearer token secrets.
///
/// Prevents timing side-channels that could reveal the secret's length
/// or prefix. When lengths differ, performs a dummy comparison to avoid
/// leaking length information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

/// Parse a bearer token in the format `{role}:{wallet}:{secret}`.
pub fn parse_bearer_token(provided: &str, expected_secret: &str) -> Result<CallerIdentity, String> {
    let parts: Vec<&str> = provided.splitn(3, ':').collect();
    if parts.len() != 3 {
        return Err("invalid token format — expected {role}:{wallet}:{secret}".into());
    }

    let (role_str, wallet_str, secret) = (parts[0], parts[1], parts[2]);

    if !constant_time_token_eq(secret, expected_secret) {
        return Err("invalid bearer token".into());
    }

    let role = match role_str {
        "student" => Role::Student,
        "institution" => Role::Institution,
        "employer" => Role::Employer,
        other => return Err(format!("unknown role: {other}")),
    };

    let wallet = WalletAddress::new(wallet_str).map_err(|e| format!("invalid wallet: {e}"))?;

    Ok(CallerIdentity { role, wallet })
}

// ── Middleware ──────────────────────────────────────────────────────────────

/// Extract and validate the Bearer token from the Authorization header.
///
/// Parses the token to extract a [`CallerIdentity`] and injects it into
/// request extensions for downstream handlers.
///
/// When `AuthConfig.token` is `None`, all requests are allowed with a
/// development identity (auth disabled / development mode).
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let expected_token = request.extensions().get::<AuthConfig>().cloned();

    match expected_token {
        Some(AuthConfig {
            token: Some(ref expected),
        }) => {
            let auth_header = request
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|v| v.to_str().ok());

            match auth_header {
                Some(header_value) if header_value.starts_with("Bearer ") => {
                    let provided = &header_value[7..];
                    match parse_bearer_token(provided, expected) {
                        Ok(identity) => {
                            request.extensions_mut().insert(identity);
                            next.run(request).await
                        }
                        Err(msg) => {
                            tracing::warn!(reason = %msg, "authentication failed: invalid bearer token");
                            unauthorized_response(&msg)
                        }
                    }
                }
                Some(_) => {
                    tracing::warn!("authentication failed: non-Bearer authorization scheme");
                    unauthorized_response("authorization header must use Bearer scheme")
                }
                None => {
                    tracing::warn!("authentication failed: missing authorization header");
                    unauthorized_response("missing authorization header")
                }
            }
        }
        _ => {
            // Auth disabled — inject a development identity so handlers
            // behave the same as in authenticated mode.
            request.extensions_mut().insert(dev_identity());
            next.run(request).await
        }
    }
}

/// The identity injected when authentication is disabled.
fn dev_identity() -> CallerIdentity {
    CallerIdentity {
        role: Role::Institution,
        wallet: WalletAddress::new("0xDEV").expect("static dev wallet is valid"),
    }
}

fn unauthorized_response(message: &str) -> Response {
    let body = ErrorBody {
        error: ErrorDetail {
            code: "UNAUTHORIZED".to_string(),
            message: message.to_string(),
        },
    };
    (StatusCode::UNAUTHORIZED, Json(body)).into_response()
}
