//! Bearer token introspection for protected routes.
//!
//! Missing, unknown, and expired tokens all produce the same 401 body;
//! callers never learn which of the three cases they hit.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::errors::AppError;
use crate::AppState;

/// Resolve the bearer token and attach the full [`AccessGrant`] to the
/// request extensions. Read-only: introspection never writes to the store.
///
/// [`AccessGrant`]: crate::oauth::store::AccessGrant
pub async fn require_bearer(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or(AppError::Unauthorised)?;

    let grant = state
        .auth
        .load_access_token(token)
        .await?
        .filter(|grant| !grant.is_expired())
        .ok_or(AppError::Unauthorised)?;

    req.extensions_mut().insert(grant);
    Ok(next.run(req).await)
}

/// Pull the token out of `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}
