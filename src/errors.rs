use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

// Error titles. OAuth grant rejections use the stable lower-case codes
// from RFC 6749; everything else uses human-readable titles.
pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";
pub const MALFORMED_JSON: &str = "Malformed JSON";
pub const NOT_FOUND: &str = "Not Found";
pub const VALIDATION_ERROR: &str = "Validation Error";
pub const AUTHENTICATION_ERROR: &str = "Authentication Error";
pub const UNAUTHORISED: &str = "Unauthorised";
pub const INVALID_REQUEST: &str = "invalid_request";
pub const UNAUTHORIZED_CLIENT: &str = "unauthorized_client";
pub const UNSUPPORTED_GRANT_TYPE: &str = "unsupported_grant_type";

/// One element of the `errors` array in every error response body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorObject {
    pub title: String,
    pub detail: String,
    pub status: u16,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("client authentication failed")]
    UnauthorizedClient,

    #[error("unsupported grant type: {0:?}")]
    UnsupportedGrantType(String),

    #[error("user authentication failed")]
    AuthenticationFailed,

    #[error("missing or invalid bearer token")]
    Unauthorised,

    #[error("resource not found")]
    NotFound,

    #[error("no route matched")]
    NoRoute,

    #[error("malformed json body")]
    MalformedJson,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, title, detail) = match &self {
            AppError::InvalidRequest(detail) => {
                (StatusCode::BAD_REQUEST, INVALID_REQUEST, detail.clone())
            }
            AppError::UnauthorizedClient => (
                StatusCode::BAD_REQUEST,
                UNAUTHORIZED_CLIENT,
                "The client is not authorized to request a token using this method".to_string(),
            ),
            // The body stays identical no matter which unknown value was sent.
            AppError::UnsupportedGrantType(_) => (
                StatusCode::BAD_REQUEST,
                UNSUPPORTED_GRANT_TYPE,
                "The authorization grant type is not supported by the authorization server"
                    .to_string(),
            ),
            AppError::AuthenticationFailed => (
                StatusCode::BAD_REQUEST,
                AUTHENTICATION_ERROR,
                "Username or Password is incorrect".to_string(),
            ),
            AppError::Unauthorised => (
                StatusCode::UNAUTHORIZED,
                UNAUTHORISED,
                "Invalid or missing access token".to_string(),
            ),
            AppError::NotFound => (
                StatusCode::NOT_FOUND,
                NOT_FOUND,
                "Resource does not exist".to_string(),
            ),
            AppError::NoRoute => (
                StatusCode::NOT_FOUND,
                NOT_FOUND,
                "No route found".to_string(),
            ),
            AppError::MalformedJson => (
                StatusCode::BAD_REQUEST,
                MALFORMED_JSON,
                "Request contains invalid JSON".to_string(),
            ),
            AppError::Validation(detail) => {
                (StatusCode::BAD_REQUEST, VALIDATION_ERROR, detail.clone())
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_SERVER_ERROR,
                    "Something went wrong".to_string(),
                )
            }
        };

        let body = Json(json!({
            "errors": [ErrorObject {
                title: title.to_string(),
                detail,
                status: status.as_u16(),
            }],
        }));

        (status, body).into_response()
    }
}
