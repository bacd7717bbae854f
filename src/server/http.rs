//! REST adapter: bearer-token gate and the protected HTTP surface
//!
//! The gate enforces the literal `Bearer <token>` scheme on the
//! `Authorization` header. Missing headers and scheme mismatches reject
//! before the verifier ever runs; every verification failure maps to the
//! same 401 so the response never reveals which check failed. Only a
//! valid credential with the wrong role is distinguished, as 403.

use crate::auth::{require_role, AuthContext, AuthError, TokenIssuer, TokenVerifier, ADMIN_ROLE};
use crate::session::SessionProvider;

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::{header, request::Parts, HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Header carrying the login provider's opaque session id.
pub const SESSION_HEADER: &str = "x-session-id";

/// Shared state for the HTTP surface
#[derive(Clone)]
pub struct AppState {
    pub sessions: Arc<dyn SessionProvider>,
    pub issuer: TokenIssuer,
    pub verifier: TokenVerifier,
    pub token_lifetime_secs: i64,
}

/// Create the REST router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/status", get(status_handler))
        .route("/api/token", post(issue_token_handler))
        .route("/api/me", get(me_handler))
        .route("/api/admin/overview", get(admin_overview_handler))
        .route("/admin/dashboard", get(admin_dashboard_handler))
        .with_state(state)
}

/// Rejection for the protected surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    Unauthorized,
    Forbidden,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    status: u16,
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let (status, error) = match self {
            Rejection::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized"),
            Rejection::Forbidden => (StatusCode::FORBIDDEN, "forbidden"),
        };

        let body = ErrorBody {
            error,
            status: status.as_u16(),
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for Rejection {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::RoleInsufficient => Rejection::Forbidden,
            _ => Rejection::Unauthorized,
        }
    }
}

/// Extractor that gates a route behind a valid bearer token.
pub struct AuthBearer(pub AuthContext);

impl<S> FromRequestParts<S> for AuthBearer
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = Rejection;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        let token = extract_bearer(parts).ok_or(Rejection::Unauthorized)?;

        match state.verifier.verify(&token) {
            Ok(claims) => Ok(AuthBearer(AuthContext::new(claims))),
            Err(err) => {
                debug!(error = %err, "bearer verification failed");
                Err(Rejection::Unauthorized)
            }
        }
    }
}

/// Extract the token from `Authorization: Bearer <token>`.
///
/// The scheme prefix is case-sensitive with a single space separator;
/// anything else means no credential was presented.
fn extract_bearer(parts: &Parts) -> Option<String> {
    let header = parts.headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    header.strip_prefix("Bearer ").map(|t| t.to_owned())
}

async fn status_handler() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

#[derive(Serialize)]
struct TokenResponse {
    token: String,
    expires_in: i64,
}

/// Mint a service token for the caller's login session.
async fn issue_token_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<TokenResponse>, Rejection> {
    let session_id = headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or(Rejection::Unauthorized)?;

    let session = state
        .sessions
        .current(session_id)
        .await
        .map_err(|err| {
            debug!(error = %err, "session lookup failed");
            Rejection::Unauthorized
        })?
        .ok_or(Rejection::Unauthorized)?;

    let token = state
        .issuer
        .issue_with_lifetime(&session, state.token_lifetime_secs)
        .map_err(Rejection::from)?;

    Ok(Json(TokenResponse {
        token,
        expires_in: state.token_lifetime_secs,
    }))
}

#[derive(Serialize)]
struct MeResponse {
    subject: String,
    role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<String>,
}

async fn me_handler(AuthBearer(context): AuthBearer) -> Json<MeResponse> {
    let claims = context.claims();
    Json(MeResponse {
        subject: claims.sub.clone(),
        role: claims.role.clone(),
        email: claims.email.clone(),
        name: claims.name.clone(),
    })
}

async fn admin_overview_handler(
    AuthBearer(context): AuthBearer,
) -> Result<Json<serde_json::Value>, Rejection> {
    require_role(Some(&context), ADMIN_ROLE)?;

    Ok(Json(serde_json::json!({
        "subject": context.subject(),
        "role": context.role(),
    })))
}

/// Role-gated entry to the operational dashboard.
async fn admin_dashboard_handler(
    AuthBearer(context): AuthBearer,
) -> Result<Html<String>, Rejection> {
    require_role(Some(&context), ADMIN_ROLE)?;

    Ok(Html(format!(
        "<!doctype html><title>gatepass</title>\
         <h1>Operational dashboard</h1><p>signed in as {}</p>",
        context.subject()
    )))
}
