pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::note::Note;
use crate::models::tag::Tag;

/// Input for creating a note. Tags are given by name; the store reuses
/// existing tags of the same name and creates the rest.
#[derive(Debug, Clone)]
pub struct NewNote {
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
    pub created_by: Uuid,
}

/// Partial update for a note. `None` fields are left untouched;
/// `tags: Some(..)` replaces the full tag set.
#[derive(Debug, Clone, Default)]
pub struct UpdateNote {
    pub title: Option<String>,
    pub text: Option<String>,
    pub tags: Option<Vec<String>>,
}

/// Note persistence. Lookups return `None` for unknown ids, deletes
/// report whether a row existed.
#[async_trait]
pub trait NoteStore: Send + Sync {
    async fn list_notes(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Note>>;
    async fn find_note(&self, id: Uuid) -> anyhow::Result<Option<Note>>;
    async fn create_note(&self, input: &NewNote) -> anyhow::Result<Note>;
    async fn update_note(&self, id: Uuid, input: &UpdateNote) -> anyhow::Result<Option<Note>>;
    async fn delete_note(&self, id: Uuid) -> anyhow::Result<bool>;
}

/// Tag persistence. Tag names are unique; `create_tag` returns `None`
/// when the name is already taken.
#[async_trait]
pub trait TagStore: Send + Sync {
    async fn list_tags(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Tag>>;
    async fn find_tag(&self, id: Uuid) -> anyhow::Result<Option<Tag>>;
    async fn create_tag(&self, name: &str) -> anyhow::Result<Option<Tag>>;
    async fn update_tag(&self, id: Uuid, name: &str) -> anyhow::Result<Option<Tag>>;
    async fn delete_tag(&self, id: Uuid) -> anyhow::Result<bool>;
}
