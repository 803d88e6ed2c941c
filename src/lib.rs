//! OAuth2-protected note keeping service.
//!
//! Library crate backing the `notes-api` binary and the integration tests
//! in `tests/`.

use std::sync::Arc;

pub mod api;
pub mod cli;
pub mod config;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod oauth;
pub mod store;

use oauth::grant::GrantProcessor;
use oauth::store::AuthStore;
use store::{NoteStore, TagStore};

/// Shared application state passed to handlers and middleware.
///
/// Collaborators are injected as trait objects, so the HTTP surface runs
/// unchanged over [`PgStore`](store::postgres::PgStore) in production and
/// [`MemStore`](store::memory::MemStore) in tests.
pub struct AppState {
    pub auth: Arc<dyn AuthStore>,
    pub notes: Arc<dyn NoteStore>,
    pub tags: Arc<dyn TagStore>,
    pub grants: GrantProcessor,
}

impl AppState {
    /// Wire every collaborator to one backing store.
    pub fn with_store<S>(store: Arc<S>) -> Self
    where
        S: AuthStore + NoteStore + TagStore + 'static,
    {
        let auth: Arc<dyn AuthStore> = store.clone();
        Self {
            grants: GrantProcessor::new(auth.clone()),
            auth,
            notes: store.clone(),
            tags: store,
        }
    }
}
