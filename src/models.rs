use super::{
    completion::CompletionService, config::SessionConfig, db_ops::Store,
    identity::IdentityProvider,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::{cmp::Ordering, sync::Arc};
use uuid::Uuid;

/// Every external collaborator is an explicit, injectable value. The
/// binary wires up the real clients in `main`; tests swap in fakes.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub identity: Arc<dyn IdentityProvider>,
    pub completion: Arc<dyn CompletionService>,
    pub session: SessionConfig,
    pub site_url: String,
}

/// A user as the identity provider knows them. We never store users
/// ourselves; notes only reference `id`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, sqlx::FromRow)]
pub struct Note {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub pinned: bool,
    /// `Some` if and only if `pinned`
    pub pinned_at: Option<DateTime<Utc>>,
}

/// Validated input for a note that doesn't exist yet.
#[derive(Clone, Debug)]
pub struct NewNote {
    pub user_id: Uuid,
    pub title: String,
    pub content: String,
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Summary {
    pub id: Uuid,
    pub note_id: Uuid,
    pub summary_text: String,
    pub bullet_points: Vec<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// The wire shape of a summary, as both summary endpoints return it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct SummaryResponse {
    pub summary: String,
    pub bullets: Vec<String>,
    pub updated_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl From<Summary> for SummaryResponse {
    fn from(s: Summary) -> Self {
        Self {
            summary: s.summary_text,
            bullets: s.bullet_points,
            updated_at: s.updated_at,
            created_at: s.created_at,
        }
    }
}

/// Pinned notes come first, most recently pinned on top; everything else
/// follows, newest first.
pub fn display_order(a: &Note, b: &Note) -> Ordering {
    b.pinned
        .cmp(&a.pinned)
        .then_with(|| b.pinned_at.cmp(&a.pinned_at))
        .then_with(|| b.created_at.cmp(&a.created_at))
}
