use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::client::Client;
use crate::models::note::{Note, NoteRow};
use crate::models::tag::Tag;
use crate::models::user::{NewUser, User};
use crate::oauth::store::{AccessGrant, AuthStore, TokenPair};
use crate::store::{NewNote, NoteStore, TagStore, UpdateNote};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str) -> anyhow::Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run pending migrations from the migrations/ directory.
    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        Ok(())
    }

    // -- Client Operations --

    pub async fn insert_client(
        &self,
        id: &str,
        secret_hash: &str,
        redirect_uri: &str,
        extra: &str,
    ) -> anyhow::Result<()> {
        sqlx::query(
            "INSERT INTO clients (id, secret_hash, redirect_uri, extra) VALUES ($1, $2, $3, $4)",
        )
        .bind(id)
        .bind(secret_hash)
        .bind(redirect_uri)
        .bind(extra)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    pub async fn list_clients(&self) -> anyhow::Result<Vec<Client>> {
        let rows = sqlx::query_as::<_, Client>(
            "SELECT id, secret_hash, redirect_uri, extra, created_at FROM clients ORDER BY created_at ASC"
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    // -- User Operations --

    pub async fn insert_user(&self, user: &NewUser) -> anyhow::Result<User> {
        let row = sqlx::query_as::<_, User>(
            r#"INSERT INTO users (email, password_hash, firstname, lastname, scope)
               VALUES ($1, $2, $3, $4, $5)
               RETURNING id, email, password_hash, firstname, lastname, scope, created_at"#,
        )
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.firstname)
        .bind(&user.lastname)
        .bind(&user.scope)
        .fetch_one(&self.pool)
        .await?;

        Ok(row)
    }

    // -- Note Helpers --

    async fn tags_for_note(&self, note_id: Uuid) -> anyhow::Result<Vec<Tag>> {
        let tags = sqlx::query_as::<_, Tag>(
            r#"SELECT t.id, t.name, t.created_at
               FROM tags t
               JOIN note_tags nt ON nt.tag_id = t.id
               WHERE nt.note_id = $1
               ORDER BY t.name ASC"#,
        )
        .bind(note_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(tags)
    }
}

#[async_trait]
impl AuthStore for PgStore {
    async fn resolve_client(&self, client_id: &str) -> anyhow::Result<Option<Client>> {
        let row = sqlx::query_as::<_, Client>(
            "SELECT id, secret_hash, redirect_uri, extra, created_at FROM clients WHERE id = $1",
        )
        .bind(client_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn find_user_by_email(&self, email: &str) -> anyhow::Result<Option<User>> {
        let row = sqlx::query_as::<_, User>(
            "SELECT id, email, password_hash, firstname, lastname, scope, created_at FROM users WHERE email = $1"
        )
        .bind(email)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn create_token_pair(
        &self,
        client: &Client,
        user: &User,
        scope: &str,
    ) -> anyhow::Result<TokenPair> {
        let pair = TokenPair::mint(client, user, scope);

        let mut tx = self.pool.begin().await?;

        // Any live pair for this client+user is superseded; the refresh row
        // follows through ON DELETE CASCADE.
        let superseded =
            sqlx::query("DELETE FROM access_tokens WHERE client_id = $1 AND user_id = $2")
                .bind(&client.id)
                .bind(user.id)
                .execute(&mut *tx)
                .await?
                .rows_affected();

        sqlx::query(
            r#"INSERT INTO access_tokens (token, client_id, user_id, scope, expires_at, created_at)
               VALUES ($1, $2, $3, $4, $5, $6)"#,
        )
        .bind(&pair.access.token)
        .bind(&pair.access.client_id)
        .bind(pair.access.user_id)
        .bind(&pair.access.scope)
        .bind(pair.access.expires_at)
        .bind(pair.access.created_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            r#"INSERT INTO refresh_tokens (token, access_token, client_id, user_id, scope, expires_at, created_at)
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(&pair.refresh.token)
        .bind(&pair.refresh.access_token)
        .bind(&pair.refresh.client_id)
        .bind(pair.refresh.user_id)
        .bind(&pair.refresh.scope)
        .bind(pair.refresh.expires_at)
        .bind(pair.refresh.created_at)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        if superseded > 0 {
            tracing::debug!(
                "superseded {} token pair(s) for client {}",
                superseded,
                client.id
            );
        }

        Ok(pair)
    }

    async fn load_access_token(&self, token: &str) -> anyhow::Result<Option<AccessGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"SELECT a.token, a.scope, a.expires_at, a.created_at,
                      r.token AS refresh_token,
                      c.id AS client_id, c.secret_hash, c.redirect_uri, c.extra,
                      c.created_at AS client_created_at,
                      u.id AS user_id, u.email, u.password_hash, u.firstname, u.lastname,
                      u.scope AS user_scope, u.created_at AS user_created_at
               FROM access_tokens a
               JOIN clients c ON c.id = a.client_id
               JOIN users u ON u.id = a.user_id
               LEFT JOIN refresh_tokens r ON r.access_token = a.token
               WHERE a.token = $1"#,
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(GrantRow::into_grant))
    }

    async fn load_refresh_token(&self, token: &str) -> anyhow::Result<Option<AccessGrant>> {
        let access_token = sqlx::query_scalar::<_, String>(
            "SELECT access_token FROM refresh_tokens WHERE token = $1",
        )
        .bind(token)
        .fetch_optional(&self.pool)
        .await?;

        match access_token {
            Some(access_token) => self.load_access_token(&access_token).await,
            None => Ok(None),
        }
    }

    async fn remove_access_token(&self, token: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM access_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn remove_refresh_token(&self, token: &str) -> anyhow::Result<()> {
        sqlx::query("DELETE FROM refresh_tokens WHERE token = $1")
            .bind(token)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}

#[async_trait]
impl NoteStore for PgStore {
    async fn list_notes(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Note>> {
        let rows = sqlx::query_as::<_, NoteRow>(
            "SELECT id, title, text, created_by, created_at, updated_at FROM notes ORDER BY created_at ASC, id ASC LIMIT $1 OFFSET $2"
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut notes = Vec::with_capacity(rows.len());
        for row in rows {
            let tags = self.tags_for_note(row.id).await?;
            notes.push(row.into_note(tags));
        }

        Ok(notes)
    }

    async fn find_note(&self, id: Uuid) -> anyhow::Result<Option<Note>> {
        let row = sqlx::query_as::<_, NoteRow>(
            "SELECT id, title, text, created_by, created_at, updated_at FROM notes WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(row) => {
                let tags = self.tags_for_note(row.id).await?;
                Ok(Some(row.into_note(tags)))
            }
            None => Ok(None),
        }
    }

    async fn create_note(&self, input: &NewNote) -> anyhow::Result<Note> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, NoteRow>(
            r#"INSERT INTO notes (title, text, created_by)
               VALUES ($1, $2, $3)
               RETURNING id, title, text, created_by, created_at, updated_at"#,
        )
        .bind(&input.title)
        .bind(&input.text)
        .bind(input.created_by)
        .fetch_one(&mut *tx)
        .await?;

        let tags = link_tags(&mut tx, row.id, &input.tags).await?;
        tx.commit().await?;

        Ok(row.into_note(tags))
    }

    async fn update_note(&self, id: Uuid, input: &UpdateNote) -> anyhow::Result<Option<Note>> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, NoteRow>(
            r#"UPDATE notes
               SET title = COALESCE($2, title),
                   text = COALESCE($3, text),
                   updated_at = NOW()
               WHERE id = $1
               RETURNING id, title, text, created_by, created_at, updated_at"#,
        )
        .bind(id)
        .bind(input.title.as_deref())
        .bind(input.text.as_deref())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tags = match &input.tags {
            Some(names) => {
                let tags = link_tags(&mut tx, row.id, names).await?;
                tx.commit().await?;
                tags
            }
            None => {
                tx.commit().await?;
                self.tags_for_note(row.id).await?
            }
        };

        Ok(Some(row.into_note(tags)))
    }

    async fn delete_note(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TagStore for PgStore {
    async fn list_tags(&self, limit: i64, offset: i64) -> anyhow::Result<Vec<Tag>> {
        let rows = sqlx::query_as::<_, Tag>(
            "SELECT id, name, created_at FROM tags ORDER BY name ASC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows)
    }

    async fn find_tag(&self, id: Uuid) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query_as::<_, Tag>("SELECT id, name, created_at FROM tags WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row)
    }

    async fn create_tag(&self, name: &str) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query_as::<_, Tag>(
            r#"INSERT INTO tags (name) VALUES ($1)
               ON CONFLICT (name) DO NOTHING
               RETURNING id, name, created_at"#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn update_tag(&self, id: Uuid, name: &str) -> anyhow::Result<Option<Tag>> {
        let row = sqlx::query_as::<_, Tag>(
            "UPDATE tags SET name = $2 WHERE id = $1 RETURNING id, name, created_at",
        )
        .bind(id)
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row)
    }

    async fn delete_tag(&self, id: Uuid) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM tags WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}

/// Replace the tag set of a note inside the caller's transaction. Existing
/// tags are matched by name, missing ones created. Returns the final set
/// sorted by name.
async fn link_tags(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    note_id: Uuid,
    names: &[String],
) -> anyhow::Result<Vec<Tag>> {
    sqlx::query("DELETE FROM note_tags WHERE note_id = $1")
        .bind(note_id)
        .execute(&mut **tx)
        .await?;

    let mut tags = Vec::with_capacity(names.len());
    for name in names {
        let tag = sqlx::query_as::<_, Tag>(
            r#"INSERT INTO tags (name) VALUES ($1)
               ON CONFLICT (name) DO UPDATE SET name = EXCLUDED.name
               RETURNING id, name, created_at"#,
        )
        .bind(name)
        .fetch_one(&mut **tx)
        .await?;

        sqlx::query("INSERT INTO note_tags (note_id, tag_id) VALUES ($1, $2) ON CONFLICT DO NOTHING")
            .bind(note_id)
            .bind(tag.id)
            .execute(&mut **tx)
            .await?;

        tags.push(tag);
    }

    tags.sort_by(|a, b| a.name.cmp(&b.name));
    tags.dedup_by(|a, b| a.id == b.id);

    Ok(tags)
}

/// Flat row of the access-token join; unpacked into an [`AccessGrant`].
#[derive(sqlx::FromRow)]
struct GrantRow {
    token: String,
    scope: String,
    expires_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
    refresh_token: Option<String>,
    client_id: String,
    secret_hash: String,
    redirect_uri: String,
    extra: String,
    client_created_at: DateTime<Utc>,
    user_id: Uuid,
    email: String,
    password_hash: String,
    firstname: String,
    lastname: String,
    user_scope: String,
    user_created_at: DateTime<Utc>,
}

impl GrantRow {
    fn into_grant(self) -> AccessGrant {
        AccessGrant {
            access_token: self.token,
            refresh_token: self.refresh_token,
            client: Client {
                id: self.client_id,
                secret_hash: self.secret_hash,
                redirect_uri: self.redirect_uri,
                extra: self.extra,
                created_at: self.client_created_at,
            },
            user: User {
                id: self.user_id,
                email: self.email,
                password_hash: self.password_hash,
                firstname: self.firstname,
                lastname: self.lastname,
                scope: self.user_scope,
                created_at: self.user_created_at,
            },
            scope: self.scope,
            expires_at: self.expires_at,
            created_at: self.created_at,
        }
    }
}
