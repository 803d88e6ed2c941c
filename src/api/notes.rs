//! Notes CRUD under `/v1/notes`. Every route here runs behind the bearer
//! introspection middleware, so handlers can rely on the grant extension.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::Deserialize;

use crate::api::{page_bounds, parse_id, PageParams};
use crate::errors::AppError;
use crate::models::note::Note;
use crate::oauth::store::AccessGrant;
use crate::store::{NewNote, UpdateNote};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateNoteRequest {
    pub title: Option<String>,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdateNoteRequest {
    pub title: Option<String>,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// GET /v1/notes?page=N — page through notes, ten per page.
pub async fn list_notes(
    State(state): State<Arc<AppState>>,
    params: Option<Query<PageParams>>,
) -> Result<Json<Vec<Note>>, AppError> {
    let page = params.and_then(|Query(p)| p.page);
    let (limit, offset) = page_bounds(page);

    let notes = state.notes.list_notes(limit, offset).await?;
    Ok(Json(notes))
}

/// GET /v1/notes/:id
pub async fn get_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<Note>, AppError> {
    let id = parse_id(&id)?;
    let note = state.notes.find_note(id).await?.ok_or(AppError::NotFound)?;
    Ok(Json(note))
}

/// POST /v1/notes — create a note owned by the authenticated user.
pub async fn create_note(
    State(state): State<Arc<AppState>>,
    Extension(grant): Extension<AccessGrant>,
    payload: Result<Json<CreateNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, AppError> {
    let Json(payload) = payload.map_err(|_| AppError::MalformedJson)?;
    let title = required_field(payload.title.as_deref(), "Title")?;

    let note = state
        .notes
        .create_note(&NewNote {
            title,
            text: payload.text,
            tags: payload.tags,
            created_by: grant.user.id,
        })
        .await?;

    Ok(Json(note))
}

/// PATCH /v1/notes/:id — partial update; omitted fields stay as they are.
pub async fn update_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    payload: Result<Json<UpdateNoteRequest>, JsonRejection>,
) -> Result<Json<Note>, AppError> {
    let id = parse_id(&id)?;
    let Json(payload) = payload.map_err(|_| AppError::MalformedJson)?;
    if let Some(title) = payload.title.as_deref() {
        required_field(Some(title), "Title")?;
    }

    let note = state
        .notes
        .update_note(
            id,
            &UpdateNote {
                title: payload.title,
                text: payload.text,
                tags: payload.tags,
            },
        )
        .await?
        .ok_or(AppError::NotFound)?;

    Ok(Json(note))
}

/// DELETE /v1/notes/:id — 204 on success, 404 for unknown ids.
pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let id = parse_id(&id)?;
    if state.notes.delete_note(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::NotFound)
    }
}

pub(crate) fn required_field(value: Option<&str>, field: &str) -> Result<String, AppError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v.to_string()),
        _ => Err(AppError::Validation(format!(
            "Field validation for '{}' failed on the 'required' tag",
            field
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn required_field_rejects_missing_and_blank() {
        assert!(required_field(None, "Title").is_err());
        assert!(required_field(Some(""), "Title").is_err());
        assert!(required_field(Some("   "), "Title").is_err());
        assert_eq!(required_field(Some("groceries"), "Title").unwrap(), "groceries");
    }
}
