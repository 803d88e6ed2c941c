//! Tags CRUD under `/v1/tags`.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;

use crate::api::notes::required_field;
use crate::api::{page_bounds, parse_id, PageParams};
use crate::errors::AppError;
use crate::models::tag::Tag;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub name: Option<String>,
}

/// GET /v1/tags?page=N — page through tags by name, ten per page.
pub async fn list_tags(
    State(state): State<Arc<AppState>>,
    params: Option<Query<PageParams>>,
) -> Result<Json<Vec<Tag>>, AppError> {
    let page = params.and_then(|Query(p)| p.page);
    let (limit, offset) = page_bounds(page);

    let tags = state.tags.list_tags(limit, offset).await?;
    Ok(Json(tags))
}

/// GET /v1/tags/:id
pub async fn get_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Tag>, AppError> {
    let id = parse_id(&id)?;
    let tag = state.tags.find_tag(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(tag))
}

/// POST /v1/tags — tag names are unique across the system.
pub async fn create_tag(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> Result<Json<Tag>, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedJson)?;
    let name = required_field(payload.name.as_deref(), "Name")?;

    let tag = state
        .tags
        .create_tag(&name)
        .await?
        .ok_or_else(|| AppError::Validation("Tag name is already taken".to_string()))?;

    Ok(Json(tag))
}

/// PATCH /v1/tags/:id — rename a tag everywhere it is attached.
pub async fn update_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<TagRequest>, JsonRejection>,
) -> Result<Json<Tag>, AppError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload.map_err(|_| AppError::MalformedJson)?;
    let name = required_field(payload.name.as_deref(), "Name")?;

    let tag = state
        .tags
        .update_tag(id, &name)
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(tag))
}

/// DELETE /v1/tags/:id — 204 on success; notes lose the tag as well.
pub async fn delete_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.tags.delete_tag(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}
