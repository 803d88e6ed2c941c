//! Token issuance and bearer introspection flows, exercised over the full
//! HTTP surface with the in-memory store behind it.

use std::sync::Arc;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde_json::Value;
use tower::ServiceExt;

use notes_api::api::app_router;
use notes_api::errors::{
    AUTHENTICATION_ERROR, INVALID_REQUEST, UNAUTHORISED, UNAUTHORIZED_CLIENT,
    UNSUPPORTED_GRANT_TYPE,
};
use notes_api::models::user::{NewUser, User};
use notes_api::oauth::store::AuthStore;
use notes_api::store::memory::MemStore;
use notes_api::AppState;

const CLIENT_ID: &str = "1";
const CLIENT_SECRET: &str = "secret";
const USER_EMAIL: &str = "test@example.com";
const USER_PASSWORD: &str = "password";

/// Router over a seeded [`MemStore`]. Cost-4 hashes keep the suite fast.
fn test_app() -> (Router, Arc<MemStore>, User) {
    let store = Arc::new(MemStore::new());
    store.insert_client(CLIENT_ID, &bcrypt::hash(CLIENT_SECRET, 4).unwrap());
    let user = store.insert_user(&NewUser {
        email: USER_EMAIL.to_string(),
        password_hash: bcrypt::hash(USER_PASSWORD, 4).unwrap(),
        firstname: "Test".to_string(),
        lastname: "User".to_string(),
        scope: "email".to_string(),
    });

    let app = app_router(Arc::new(AppState::with_store(store.clone())));
    (app, store, user)
}

fn basic_auth(id: &str, secret: &str) -> String {
    format!("Basic {}", STANDARD.encode(format!("{}:{}", id, secret)))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Bytes) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, body)
}

fn json(body: &Bytes) -> Value {
    serde_json::from_slice(body).unwrap()
}

fn assert_error(body: &Bytes, title: &str, status: u16) {
    let value = json(body);
    let errors = value["errors"].as_array().unwrap();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0]["title"], title);
    assert_eq!(errors[0]["status"], status);
}

async fn post_token(
    app: &Router,
    query: &str,
    authorization: Option<&str>,
) -> (StatusCode, Bytes) {
    let mut builder = Request::post(format!("/token?{}", query));
    if let Some(authorization) = authorization {
        builder = builder.header(header::AUTHORIZATION, authorization);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

async fn get_info(app: &Router, token: Option<&str>) -> (StatusCode, Bytes) {
    let mut builder = Request::get("/info");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

/// Run the password grant with the default credentials and return the
/// decoded 201 body.
async fn password_grant(app: &Router) -> Value {
    let (status, body) = post_token(
        app,
        &format!(
            "grant_type=password&username={}&password={}&scope=email",
            USER_EMAIL, USER_PASSWORD
        ),
        Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{:?}", body);
    json(&body)
}

mod password_grant_tests {
    use super::*;

    #[tokio::test]
    async fn issues_a_token_pair() {
        let (app, _, _) = test_app();
        let token = password_grant(&app).await;

        assert!(!token["access_token"].as_str().unwrap().is_empty());
        assert!(!token["refresh_token"].as_str().unwrap().is_empty());
        assert_ne!(token["access_token"], token["refresh_token"]);
        assert_eq!(token["token_type"], "Bearer");
        assert_eq!(token["scope"], "email");
        assert_eq!(token["expires_in"], 3600);
    }

    #[tokio::test]
    async fn scope_defaults_to_the_users_scope() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            &format!(
                "grant_type=password&username={}&password={}",
                USER_EMAIL, USER_PASSWORD
            ),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json(&body)["scope"], "email");
    }

    #[tokio::test]
    async fn scope_param_overrides_the_default() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            &format!(
                "grant_type=password&username={}&password={}&scope=notes",
                USER_EMAIL, USER_PASSWORD
            ),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json(&body)["scope"], "notes");
    }

    #[tokio::test]
    async fn accepts_form_body_params() {
        let (app, _, _) = test_app();
        let request = Request::post("/token")
            .header(
                header::AUTHORIZATION,
                basic_auth(CLIENT_ID, CLIENT_SECRET),
            )
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "grant_type=password&username={}&password={}",
                USER_EMAIL, USER_PASSWORD
            )))
            .unwrap();

        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(json(&body)["token_type"], "Bearer");
    }

    #[tokio::test]
    async fn accepts_form_client_credentials() {
        let (app, _, _) = test_app();
        let request = Request::post("/token")
            .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(Body::from(format!(
                "grant_type=password&username={}&password={}&client_id={}&client_secret={}",
                USER_EMAIL, USER_PASSWORD, CLIENT_ID, CLIENT_SECRET
            )))
            .unwrap();

        let (status, _) = send(&app, request).await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

mod rejection_tests {
    use super::*;

    #[tokio::test]
    async fn unknown_grant_type_is_rejected() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            &format!(
                "grant_type=bogus&username={}&password={}",
                USER_EMAIL, USER_PASSWORD
            ),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, UNSUPPORTED_GRANT_TYPE, 400);
    }

    #[tokio::test]
    async fn missing_grant_type_is_rejected() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            &format!("username={}&password={}", USER_EMAIL, USER_PASSWORD),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, UNSUPPORTED_GRANT_TYPE, 400);
    }

    #[tokio::test]
    async fn wrong_password_is_an_authentication_error() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            &format!("grant_type=password&username={}&password=wrong", USER_EMAIL),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, AUTHENTICATION_ERROR, 400);
    }

    #[tokio::test]
    async fn unknown_user_matches_wrong_password_byte_for_byte() {
        let (app, _, _) = test_app();
        let (status_a, body_a) = post_token(
            &app,
            "grant_type=password&username=nobody@example.com&password=password",
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;
        let (status_b, body_b) = post_token(
            &app,
            &format!("grant_type=password&username={}&password=wrong", USER_EMAIL),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status_a, status_b);
        assert_eq!(body_a, body_b);
    }

    #[tokio::test]
    async fn wrong_client_secret_is_unauthorized_client() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            &format!(
                "grant_type=password&username={}&password={}",
                USER_EMAIL, USER_PASSWORD
            ),
            Some(&basic_auth(CLIENT_ID, "invalid_secret")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, UNAUTHORIZED_CLIENT, 400);
    }

    #[tokio::test]
    async fn unknown_client_matches_wrong_secret_byte_for_byte() {
        let (app, _, _) = test_app();
        let query = format!(
            "grant_type=password&username={}&password={}",
            USER_EMAIL, USER_PASSWORD
        );
        let (status_a, body_a) =
            post_token(&app, &query, Some(&basic_auth("42", CLIENT_SECRET))).await;
        let (status_b, body_b) =
            post_token(&app, &query, Some(&basic_auth(CLIENT_ID, "wrong"))).await;

        assert_eq!(status_a, status_b);
        assert_eq!(body_a, body_b);
    }

    #[tokio::test]
    async fn malformed_basic_header_is_invalid_request() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            &format!(
                "grant_type=password&username={}&password={}",
                USER_EMAIL, USER_PASSWORD
            ),
            Some("Basic malformed_base_64"),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, INVALID_REQUEST, 400);
    }

    #[tokio::test]
    async fn missing_client_credentials_is_invalid_request() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            &format!(
                "grant_type=password&username={}&password={}",
                USER_EMAIL, USER_PASSWORD
            ),
            None,
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, INVALID_REQUEST, 400);
    }

    #[tokio::test]
    async fn missing_username_is_invalid_request() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            "grant_type=password&password=password",
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, INVALID_REQUEST, 400);
    }

    #[tokio::test]
    async fn rejections_issue_no_tokens() {
        let (app, store, _) = test_app();
        post_token(
            &app,
            &format!("grant_type=password&username={}&password=wrong", USER_EMAIL),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        let (_, body) = post_token(
            &app,
            &format!(
                "grant_type=refresh_token&refresh_token=never-issued&username={}&password={}",
                USER_EMAIL, USER_PASSWORD
            ),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;
        assert_error(&body, INVALID_REQUEST, 400);

        // A rejected request leaves nothing behind for a later bearer call.
        let grant = store.load_access_token("never-issued").await.unwrap();
        assert!(grant.is_none());
    }
}

mod refresh_grant_tests {
    use super::*;

    #[tokio::test]
    async fn rotates_the_pair() {
        let (app, _, _) = test_app();
        let issued = password_grant(&app).await;
        let refresh = issued["refresh_token"].as_str().unwrap();

        let (status, body) = post_token(
            &app,
            &format!("grant_type=refresh_token&refresh_token={}", refresh),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status, StatusCode::CREATED);
        let rotated = json(&body);
        assert_ne!(rotated["access_token"], issued["access_token"]);
        assert_ne!(rotated["refresh_token"], issued["refresh_token"]);
        assert_eq!(rotated["scope"], issued["scope"]);
        assert_eq!(rotated["expires_in"], 3600);
    }

    #[tokio::test]
    async fn rotation_invalidates_the_previous_access_token() {
        let (app, _, _) = test_app();
        let issued = password_grant(&app).await;
        let old_access = issued["access_token"].as_str().unwrap();
        let refresh = issued["refresh_token"].as_str().unwrap();

        let (status, body) = post_token(
            &app,
            &format!("grant_type=refresh_token&refresh_token={}", refresh),
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        let new_access = json(&body)["access_token"].as_str().unwrap().to_string();

        let (status, _) = get_info(&app, Some(old_access)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);

        let (status, _) = get_info(&app, Some(&new_access)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn spent_refresh_tokens_are_rejected() {
        let (app, _, _) = test_app();
        let issued = password_grant(&app).await;
        let refresh = issued["refresh_token"].as_str().unwrap();
        let query = format!("grant_type=refresh_token&refresh_token={}", refresh);

        let (status, _) =
            post_token(&app, &query, Some(&basic_auth(CLIENT_ID, CLIENT_SECRET))).await;
        assert_eq!(status, StatusCode::CREATED);

        let (status, body) =
            post_token(&app, &query, Some(&basic_auth(CLIENT_ID, CLIENT_SECRET))).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, INVALID_REQUEST, 400);
    }

    #[tokio::test]
    async fn unknown_refresh_token_is_invalid_request() {
        let (app, _, _) = test_app();
        let (status, body) = post_token(
            &app,
            "grant_type=refresh_token&refresh_token=never-issued",
            Some(&basic_auth(CLIENT_ID, CLIENT_SECRET)),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, INVALID_REQUEST, 400);
    }

    #[tokio::test]
    async fn refresh_requires_the_owning_client() {
        let (app, store, _) = test_app();
        store.insert_client("2", &bcrypt::hash("other-secret", 4).unwrap());

        let issued = password_grant(&app).await;
        let refresh = issued["refresh_token"].as_str().unwrap();

        let (status, body) = post_token(
            &app,
            &format!("grant_type=refresh_token&refresh_token={}", refresh),
            Some(&basic_auth("2", "other-secret")),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_error(&body, UNAUTHORIZED_CLIENT, 400);
    }
}

mod bearer_tests {
    use super::*;
    use chrono::{Duration, Utc};
    use notes_api::models::token::AccessTokenRow;

    #[tokio::test]
    async fn info_returns_the_token_owner() {
        let (app, _, _) = test_app();
        let issued = password_grant(&app).await;
        let access = issued["access_token"].as_str().unwrap();

        let (status, body) = get_info(&app, Some(access)).await;
        assert_eq!(status, StatusCode::OK);

        let info = json(&body);
        assert_eq!(info["user"]["email"], USER_EMAIL);
        assert_eq!(info["scope"], "email");
        let expires_in = info["expires_in"].as_i64().unwrap();
        assert!(expires_in > 0 && expires_in <= 3600);

        // Credential hashes never serialize.
        assert!(info["user"].get("password_hash").is_none());
    }

    #[tokio::test]
    async fn missing_header_is_unauthorised() {
        let (app, _, _) = test_app();
        let (status, body) = get_info(&app, None).await;

        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_error(&body, UNAUTHORISED, 401);
    }

    #[tokio::test]
    async fn unknown_and_expired_tokens_match_the_missing_header_body() {
        let (app, store, user) = test_app();
        store.insert_access_token(AccessTokenRow {
            token: "expired-token".to_string(),
            client_id: CLIENT_ID.to_string(),
            user_id: user.id,
            scope: "email".to_string(),
            expires_at: Utc::now() - Duration::hours(1),
            created_at: Utc::now() - Duration::hours(2),
        });

        let (status_missing, body_missing) = get_info(&app, None).await;
        let (status_unknown, body_unknown) = get_info(&app, Some("never-issued")).await;
        let (status_expired, body_expired) = get_info(&app, Some("expired-token")).await;

        assert_eq!(status_missing, StatusCode::UNAUTHORIZED);
        assert_eq!(status_unknown, StatusCode::UNAUTHORIZED);
        assert_eq!(status_expired, StatusCode::UNAUTHORIZED);
        assert_eq!(body_missing, body_unknown);
        assert_eq!(body_unknown, body_expired);
    }
}
