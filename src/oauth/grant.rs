use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::errors::AppError;
use crate::oauth::store::{AuthStore, TokenPair};
use crate::oauth::verify::CredentialVerifier;

/// Grant types accepted on `POST /token`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GrantType {
    Password,
    RefreshToken,
}

impl GrantType {
    pub fn from_param(raw: &str) -> Option<Self> {
        match raw {
            "password" => Some(GrantType::Password),
            "refresh_token" => Some(GrantType::RefreshToken),
            _ => None,
        }
    }
}

/// Parameters of one token request, merged from the query string and the
/// form-encoded body.
#[derive(Debug, Default, Clone, Deserialize)]
pub struct TokenParams {
    pub grant_type: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub scope: Option<String>,
    pub refresh_token: Option<String>,
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

impl TokenParams {
    /// Decode both parameter sources. A field present in both places
    /// resolves to the body's value.
    pub fn parse(query: Option<&str>, body: &[u8]) -> Self {
        let from_query = query
            .and_then(|q| serde_urlencoded::from_str::<TokenParams>(q).ok())
            .unwrap_or_default();
        let from_body = std::str::from_utf8(body)
            .ok()
            .and_then(|b| serde_urlencoded::from_str::<TokenParams>(b).ok())
            .unwrap_or_default();
        from_body.merged_over(from_query)
    }

    fn merged_over(self, fallback: TokenParams) -> TokenParams {
        TokenParams {
            grant_type: self.grant_type.or(fallback.grant_type),
            username: self.username.or(fallback.username),
            password: self.password.or(fallback.password),
            scope: self.scope.or(fallback.scope),
            refresh_token: self.refresh_token.or(fallback.refresh_token),
            client_id: self.client_id.or(fallback.client_id),
            client_secret: self.client_secret.or(fallback.client_secret),
        }
    }
}

/// Success body of `POST /token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
    pub scope: String,
    pub expires_in: i64,
    pub refresh_token: String,
}

impl TokenResponse {
    /// `expires_in` is the full configured lifetime, measured from the
    /// pair's creation instant rather than sampled from the wall clock.
    pub fn from_pair(pair: &TokenPair) -> Self {
        TokenResponse {
            access_token: pair.access.token.clone(),
            token_type: "Bearer".to_string(),
            scope: pair.access.scope.clone(),
            expires_in: (pair.access.expires_at - pair.access.created_at).num_seconds(),
            refresh_token: pair.refresh.token.clone(),
        }
    }
}

/// Client credentials as presented on the token request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientCredentials {
    pub id: String,
    pub secret: String,
}

/// Extract client credentials: HTTP Basic first, then the
/// `client_id`/`client_secret` parameters.
pub fn extract_client_credentials(
    authorization: Option<&str>,
    params: &TokenParams,
) -> Result<ClientCredentials, AppError> {
    let malformed = || AppError::InvalidRequest("malformed Basic authorization header".to_string());

    if let Some(encoded) = authorization.and_then(|h| h.strip_prefix("Basic ")) {
        let decoded = STANDARD.decode(encoded.trim()).map_err(|_| malformed())?;
        let decoded = String::from_utf8(decoded).map_err(|_| malformed())?;
        let (id, secret) = decoded.split_once(':').ok_or_else(malformed)?;
        if id.is_empty() {
            return Err(malformed());
        }
        return Ok(ClientCredentials {
            id: id.to_string(),
            secret: secret.to_string(),
        });
    }

    match (&params.client_id, &params.client_secret) {
        (Some(id), Some(secret)) if !id.is_empty() => Ok(ClientCredentials {
            id: id.clone(),
            secret: secret.clone(),
        }),
        _ => Err(AppError::InvalidRequest(
            "client authentication required".to_string(),
        )),
    }
}

/// Orchestrates one token request end to end: parse the grant type,
/// authenticate the client, run the grant-specific branch, mint a pair.
///
/// Terminal states are Issued (201 body) and Rejected (stable error code);
/// nothing is persisted on any rejected path.
#[derive(Clone)]
pub struct GrantProcessor {
    store: Arc<dyn AuthStore>,
    verifier: CredentialVerifier,
}

impl GrantProcessor {
    pub fn new(store: Arc<dyn AuthStore>) -> Self {
        let verifier = CredentialVerifier::new(store.clone());
        Self { store, verifier }
    }

    pub async fn handle(
        &self,
        authorization: Option<&str>,
        params: TokenParams,
    ) -> Result<TokenResponse, AppError> {
        let raw_type = params.grant_type.clone().unwrap_or_default();
        let grant_type =
            GrantType::from_param(&raw_type).ok_or(AppError::UnsupportedGrantType(raw_type))?;

        let creds = extract_client_credentials(authorization, &params)?;
        let client = match self.store.resolve_client(&creds.id).await? {
            Some(client) if client.secret_matches(&creds.secret) => client,
            // Unknown id and wrong secret must stay indistinguishable.
            _ => return Err(AppError::UnauthorizedClient),
        };

        let (user, scope) = match grant_type {
            GrantType::Password => {
                let username = require_param(&params.username, "username")?;
                let password = require_param(&params.password, "password")?;
                let user = self
                    .verifier
                    .verify(username, password)
                    .await?
                    .ok_or(AppError::AuthenticationFailed)?;
                // Scope defaults to the user's own when the request names none.
                let scope = match params.scope.as_deref() {
                    Some(s) if !s.is_empty() => s.to_string(),
                    _ => user.scope.clone(),
                };
                (user, scope)
            }
            GrantType::RefreshToken => {
                let token = require_param(&params.refresh_token, "refresh_token")?;
                let prior = self
                    .store
                    .load_refresh_token(token)
                    .await?
                    .ok_or_else(|| {
                        AppError::InvalidRequest("refresh token is not valid".to_string())
                    })?;
                // The refreshing client must own the token it is rotating.
                if prior.client.id != client.id {
                    return Err(AppError::UnauthorizedClient);
                }
                (prior.user, prior.scope)
            }
        };

        let pair = self.store.create_token_pair(&client, &user, &scope).await?;
        tracing::debug!("issued token pair for client {}", client.id);
        Ok(TokenResponse::from_pair(&pair))
    }
}

fn require_param<'a>(value: &'a Option<String>, name: &str) -> Result<&'a str, AppError> {
    match value.as_deref() {
        Some(v) if !v.is_empty() => Ok(v),
        _ => Err(AppError::InvalidRequest(format!("{} is required", name))),
    }
}
