//! Token issuance and introspection endpoints.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::{RawQuery, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::{Extension, Json};
use serde_json::{json, Value};

use crate::errors::AppError;
use crate::oauth::grant::{TokenParams, TokenResponse};
use crate::oauth::store::AccessGrant;
use crate::AppState;

/// POST /token — issue an access/refresh pair via the password or
/// refresh_token grant.
///
/// Grant parameters may arrive in the query string or the form body;
/// client credentials via HTTP Basic or the `client_id`/`client_secret`
/// fields.
pub async fn token(
    State(state): State<Arc<AppState>>,
    RawQuery(query): RawQuery,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<TokenResponse>), AppError> {
    let params = TokenParams::parse(query.as_deref(), &body);
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let response = state.grants.handle(authorization, params).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// GET /info — the data behind the presented bearer token.
pub async fn info(Extension(grant): Extension<AccessGrant>) -> Json<Value> {
    Json(json!({
        "user": grant.user,
        "scope": grant.scope,
        "expires_in": grant.expires_in(),
    }))
}
