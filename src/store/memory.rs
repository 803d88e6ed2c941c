use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;
use uuid::Uuid;

use crate::models::client::Client;
use crate::models::note::Note;
use crate::models::tag::Tag;
use crate::models::token::{AccessTokenRow, RefreshTokenRow};
use crate::models::user::{NewUser, User};
use crate::oauth::store::{AccessGrant, AuthStore, TokenPair};
use crate::store::{NewNote, NoteStore, TagStore, UpdateNote};

/// In-memory backend implementing the same contracts as
/// [`PgStore`](crate::store::postgres::PgStore). Backs the test suites;
/// nothing survives a restart.
#[derive(Default)]
pub struct MemStore {
    clients: DashMap<String, Client>,
    users: DashMap<Uuid, User>,
    access_tokens: DashMap<String, AccessTokenRow>,
    refresh_tokens: DashMap<String, RefreshTokenRow>,
    notes: DashMap<Uuid, Note>,
    tags: DashMap<Uuid, Tag>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    // -- Seeding --

    pub fn insert_client(&self, id: &str, secret_hash: &str) -> Client {
        let client = Client {
            id: id.to_string(),
            secret_hash: secret_hash.to_string(),
            redirect_uri: String::new(),
            extra: String::new(),
            created_at: Utc::now(),
        };
        self.clients.insert(client.id.clone(), client.clone());
        client
    }

    pub fn insert_user(&self, user: &NewUser) -> User {
        let user = User {
            id: Uuid::new_v4(),
            email: user.email.clone(),
            password_hash: user.password_hash.clone(),
            firstname: user.firstname.clone(),
            lastname: user.lastname.clone(),
            scope: user.scope.clone(),
            created_at: Utc::now(),
        };
        self.users.insert(user.id, user.clone());
        user
    }

    pub fn insert_access_token(&self, row: AccessTokenRow) {
        self.access_tokens.insert(row.token.clone(), row);
    }

    pub fn insert_refresh_token(&self, row: RefreshTokenRow) {
        self.refresh_tokens.insert(row.token.clone(), row);
    }

    // -- Helpers --

    fn upsert_tags(&self, names: &[String]) -> Vec<Tag> {
        let mut tags = Vec::with_capacity(names.len());
        for name in names {
            let existing = self
                .tags
                .iter()
                .find(|entry| entry.value().name == *name)
                .map(|entry| entry.value().clone());
            let tag = match existing {
                Some(tag) => tag,
                None => {
                    let tag = Tag {
                        id: Uuid::new_v4(),
                        name: name.clone(),
                        created_at: Utc::now(),
                    };
                    self.tags.insert(tag.id, tag.clone());
                    tag
                }
            };
            tags.push(tag);
        }
        tags.sort_by(|a, b| a.name.cmp(&b.name));
        tags.dedup_by(|a, b| a.id == b.id);
        tags
    }
}

#[async_trait]
impl AuthStore for MemStore {
    async fn resolve_client(&self, client_id: &str) -> anyhow::Result<Option<Client>> {
        Ok(self.clients.get(client_id).map(|entry| entry.value().clone()))
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        Ok(self
            .users
            .iter()
            .find(|entry| entry.value().email == email)
            .map(|entry| entry.value().clone()))
    }

    async fn create_token_pair(
        &self,
        client: &Client,
        user: &User,
        scope: &str,
    ) -> anyhow::Result<TokenPair> {
        let pair = TokenPair::mint(client, user, scope);

        // Supersede prior pairs for this client+user before inserting.
        let stale: Vec<String> = self
            .access_tokens
            .iter()
            .filter(|entry| {
                entry.value().client_id == client.id && entry.value().user_id == user.id
            })
            .map(|entry| entry.key().clone())
            .collect();
        for token in stale {
            self.access_tokens.remove(&token);
            self.refresh_tokens
                .retain(|_, refresh| refresh.access_token != token);
        }

        self.access_tokens
            .insert(pair.access.token.clone(), pair.access.clone());
        self.refresh_tokens
            .insert(pair.refresh.token.clone(), pair.refresh.clone());

        Ok(pair)
    }

    async fn load_access_token(&self, token: &str) -> anyhow::Result<Option<AccessGrant>> {
        let Some(row) = self.access_tokens.get(token).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        let Some(client) = self
            .clients
            .get(&row.client_id)
            .map(|entry| entry.value().clone())
        else {
            return Ok(None);
        };
        let Some(user) = self.users.get(&row.user_id).map(|entry| entry.value().clone()) else {
            return Ok(None);
        };
        let refresh_token = self
            .refresh_tokens
            .iter()
            .find(|entry| entry.value().access_token == row.token)
            .map(|entry| entry.key().clone());

        Ok(Some(AccessGrant {
            access_token: row.token,
            refresh_token,
            client,
            user,
            scope: row.scope,
            expires_at: row.expires_at,
            created_at: row.created_at,
        }))
    }

    async fn load_refresh_token(&self, token: &str) -> anyhow::Result<Option<AccessGrant>> {
        let access_token = self
            .refresh_tokens
            .get(token)
            .map(|entry| entry.value().access_token.clone());

        match access_token {
            Some(access_token) => self.load_access_token(&access_token).await,
            None => Ok(None),
        }
    }

    async fn remove_access_token(&self, token: &str) -> anyhow::Result<()> {
        self.access_tokens.remove(token);
        // Refresh rows reference access tokens, so they go too.
        self.refresh_tokens
            .retain(|_, refresh| refresh.access_token != token);
        Ok(())
    }

    async fn remove_refresh_token(&self, token: &str) -> anyhow::Result<()> {
        self.refresh_tokens.remove(token);
        Ok(())
    }
}

#[async_trait]
impl NoteStore for MemStore {
    async fn list_notes(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Note>> {
        let mut notes: Vec<Note> = self
            .notes
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        notes.sort_by(|a, b| (a.created_at, a.id).cmp(&(b.created_at, b.id)));

        Ok(notes
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_note(&self, id: Uuid) -> anyhow::Result<Option<Note>> {
        Ok(self.notes.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create_note(&self, input: &NewNote) -> anyhow::Result<Note> {
        let now = Utc::now();
        let note = Note {
            id: Uuid::new_v4(),
            title: input.title.clone(),
            text: input.text.clone(),
            tags: self.upsert_tags(&input.tags),
            created_by: input.created_by,
            created_at: now,
            updated_at: now,
        };
        self.notes.insert(note.id, note.clone());
        Ok(note)
    }

    async fn update_note(&self, id: Uuid, input: &UpdateNote) -> anyhow::Result<Option<Note>> {
        let tags = input.tags.as_ref().map(|names| self.upsert_tags(names));

        let Some(mut entry) = self.notes.get_mut(&id) else {
            return Ok(None);
        };
        let note = entry.value_mut();
        if let Some(title) = &input.title {
            note.title = title.clone();
        }
        if let Some(text) = &input.text {
            note.text = text.clone();
        }
        if let Some(tags) = tags {
            note.tags = tags;
        }
        note.updated_at = Utc::now();

        Ok(Some(note.clone()))
    }

    async fn delete_note(&self, id: Uuid) -> anyhow::Result<bool> {
        Ok(self.notes.remove(&id).is_some())
    }
}

#[async_trait]
impl TagStore for MemStore {
    async fn list_tags(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Tag>> {
        let mut tags: Vec<Tag> = self.tags.iter().map(|entry| entry.value().clone()).collect();
        tags.sort_by(|a, b| a.name.cmp(&b.name));

        Ok(tags
            .into_iter()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .collect())
    }

    async fn find_tag(&self, id: Uuid) -> anyhow::Result<Option<Tag>> {
        Ok(self.tags.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create_tag(&self, name: &str) -> anyhow::Result<Option<Tag>> {
        if self.tags.iter().any(|entry| entry.value().name == name) {
            return Ok(None);
        }
        let tag = Tag {
            id: Uuid::new_v4(),
            name: name.to_string(),
            created_at: Utc::now(),
        };
        self.tags.insert(tag.id, tag.clone());
        Ok(Some(tag))
    }

    async fn update_tag(&self, id: Uuid, name: &str) -> anyhow::Result<Option<Tag>> {
        if self
            .tags
            .iter()
            .any(|entry| entry.value().name == name && *entry.key() != id)
        {
            anyhow::bail!("duplicate tag name");
        }

        let Some(mut entry) = self.tags.get_mut(&id) else {
            return Ok(None);
        };
        entry.value_mut().name = name.to_string();
        let tag = entry.value().clone();
        drop(entry);

        // Notes embed tag copies, keep them in sync with the rename.
        for mut note in self.notes.iter_mut() {
            for embedded in note.value_mut().tags.iter_mut() {
                if embedded.id == id {
                    embedded.name = tag.name.clone();
                }
            }
        }

        Ok(Some(tag))
    }

    async fn delete_tag(&self, id: Uuid) -> anyhow::Result<bool> {
        let existed = self.tags.remove(&id).is_some();
        if existed {
            for mut note in self.notes.iter_mut() {
                note.value_mut().tags.retain(|tag| tag.id != id);
            }
        }
        Ok(existed)
    }
}
