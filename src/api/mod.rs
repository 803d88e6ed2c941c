use std::sync::Arc;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::errors::AppError;
use crate::middleware::auth::require_bearer;
use crate::AppState;

pub mod auth;
pub mod notes;
pub mod tags;

/// Build the full application router.
///
/// `POST /token` is public. `GET /info` and everything under `/v1` sit
/// behind the bearer introspection middleware.
pub fn app_router(state: Arc<AppState>) -> Router {
    let protected = Router::new()
        .route("/notes", get(notes::list_notes).post(notes::create_note))
        .route(
            "/notes/:id",
            get(notes::get_note)
                .patch(notes::update_note)
                .delete(notes::delete_note),
        )
        .route("/tags", get(tags::list_tags).post(tags::create_tag))
        .route(
            "/tags/:id",
            get(tags::get_tag)
                .patch(tags::update_tag)
                .delete(tags::delete_tag),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    let introspection = Router::new()
        .route("/info", get(auth::info))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_bearer,
        ));

    Router::new()
        .route("/healthz", get(|| async { "ok" }))
        .route("/token", post(auth::token))
        .merge(introspection)
        .nest("/v1", protected)
        .fallback(fallback_404)
        .with_state(state)
}

async fn fallback_404() -> AppError {
    AppError::NoRoute
}

// ── Shared list/lookup plumbing ──────────────────────────────

pub(crate) const PAGE_SIZE: i64 = 10;

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
}

/// Translate a 1-based page number into LIMIT/OFFSET. Missing or
/// non-positive pages fall back to the first page; oversized pages
/// saturate and read back empty.
pub(crate) fn page_bounds(page: Option<i64>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    (PAGE_SIZE, (page - 1).saturating_mul(PAGE_SIZE))
}

/// Path ids that do not parse read the same as ids that match nothing.
pub(crate) fn parse_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw).map_err(|_| AppError::NotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_bounds_clamp_to_the_first_page() {
        assert_eq!(page_bounds(None), (10, 0));
        assert_eq!(page_bounds(Some(1)), (10, 0));
        assert_eq!(page_bounds(Some(0)), (10, 0));
        assert_eq!(page_bounds(Some(-3)), (10, 0));
        assert_eq!(page_bounds(Some(2)), (10, 10));
        assert_eq!(page_bounds(Some(5)), (10, 40));
    }

    #[test]
    fn page_bounds_saturate_instead_of_overflowing() {
        assert_eq!(page_bounds(Some(i64::MAX)), (10, i64::MAX));
        assert_eq!(page_bounds(Some(i64::MAX / 2)), (10, i64::MAX));
    }

    #[test]
    fn bad_ids_read_as_not_found() {
        assert!(matches!(parse_id("0"), Err(AppError::NotFound)));
        assert!(matches!(parse_id("not-a-uuid"), Err(AppError::NotFound)));
        assert!(parse_id("8c1732ad-3akk-4b9e-9d5c-5c5ec26d52ce").is_err());
        assert!(parse_id("8c1732ad-3a4b-4b9e-9d5c-5c5ec26d52ce").is_ok());
    }
}
