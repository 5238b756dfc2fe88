//! Row-level access to the `notes` and `summaries` tables.
//!
//! The `Store` trait is deliberately dumb: it does what it's told, scoped by
//! `user_id` where a user is involved, and reports "nothing matched" as
//! `None` / `false` rather than as an error. Deciding whether that means
//! "not found" or "forbidden" is the repositories' job.

use super::{
    errors::Result,
    models::{NewNote, Note, Summary},
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query, query_as,
    types::Json,
};
use uuid::Uuid;

#[async_trait]
pub trait Store: Send + Sync {
    async fn insert_note(&self, note: &NewNote) -> Result<Note>;
    /// All of one user's notes, in `models::display_order`
    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>>;
    /// Unscoped on purpose, so that callers can tell a missing note apart
    /// from somebody else's.
    async fn get_note(&self, id: Uuid) -> Result<Option<Note>>;
    /// Returns whether a row was deleted. Deleting a note deletes its summary.
    async fn delete_note(&self, user_id: Uuid, id: Uuid) -> Result<bool>;
    /// `pinned_at: None` unpins. Returns whether a row was updated.
    async fn set_pinned(
        &self,
        user_id: Uuid,
        id: Uuid,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<bool>;
    async fn get_summary(&self, note_id: Uuid) -> Result<Option<Summary>>;
    /// Insert, or overwrite the existing summary for `note_id` in place.
    /// `updated_at` always moves forward.
    async fn upsert_summary(
        &self,
        note_id: Uuid,
        summary_text: &str,
        bullet_points: &[String],
    ) -> Result<Summary>;
}

pub async fn create_pg_pool(
    db_url: &str,
    max_connections: u32,
) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await
}

pub async fn migrate(db: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!().run(db).await
}

#[derive(Clone, Debug)]
pub struct PgStore {
    db: PgPool,
}

impl PgStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[derive(sqlx::FromRow)]
struct SummaryRow {
    id: Uuid,
    note_id: Uuid,
    summary_text: String,
    bullet_points: Json<Vec<String>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SummaryRow> for Summary {
    fn from(row: SummaryRow) -> Self {
        Summary {
            id: row.id,
            note_id: row.note_id,
            summary_text: row.summary_text,
            bullet_points: row.bullet_points.0,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn insert_note(&self, note: &NewNote) -> Result<Note> {
        let note = query_as::<_, Note>(
            "insert into notes (user_id, title, content)
            values ($1, $2, $3)
            returning id, user_id, title, content, created_at, pinned, pinned_at",
        )
        .bind(note.user_id)
        .bind(&note.title)
        .bind(&note.content)
        .fetch_one(&self.db)
        .await?;

        Ok(note)
    }

    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>> {
        let notes = query_as::<_, Note>(
            "select id, user_id, title, content, created_at, pinned, pinned_at
            from notes
            where user_id = $1
            order by pinned desc, pinned_at desc nulls last, created_at desc",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await?;

        Ok(notes)
    }

    async fn get_note(&self, id: Uuid) -> Result<Option<Note>> {
        let note = query_as::<_, Note>(
            "select id, user_id, title, content, created_at, pinned, pinned_at
            from notes
            where id = $1",
        )
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(note)
    }

    async fn delete_note(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let res = query("delete from notes where id = $1 and user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.db)
            .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn set_pinned(
        &self,
        user_id: Uuid,
        id: Uuid,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let res = query(
            "update notes
            set
                pinned = $1,
                pinned_at = $2
            where id = $3 and user_id = $4",
        )
        .bind(pinned_at.is_some())
        .bind(pinned_at)
        .bind(id)
        .bind(user_id)
        .execute(&self.db)
        .await?;

        Ok(res.rows_affected() > 0)
    }

    async fn get_summary(&self, note_id: Uuid) -> Result<Option<Summary>> {
        let row = query_as::<_, SummaryRow>(
            "select id, note_id, summary_text, bullet_points, created_at, updated_at
            from summaries
            where note_id = $1",
        )
        .bind(note_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Summary::from))
    }

    async fn upsert_summary(
        &self,
        note_id: Uuid,
        summary_text: &str,
        bullet_points: &[String],
    ) -> Result<Summary> {
        // `now()` is the transaction start time, so two upserts landing in
        // the same microsecond would otherwise tie.
        let row = query_as::<_, SummaryRow>(
            "insert into summaries (note_id, summary_text, bullet_points)
            values ($1, $2, $3)
            on conflict (note_id) do update
            set
                summary_text = excluded.summary_text,
                bullet_points = excluded.bullet_points,
                updated_at = greatest(
                    now(),
                    summaries.updated_at + interval '1 microsecond'
                )
            returning id, note_id, summary_text, bullet_points, created_at, updated_at",
        )
        .bind(note_id)
        .bind(summary_text)
        .bind(Json(bullet_points.to_vec()))
        .fetch_one(&self.db)
        .await?;

        Ok(row.into())
    }
}
