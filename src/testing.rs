//! In-process stand-ins for the database, the identity provider, and the
//! completion service.

use super::{
    completion::CompletionService,
    config::SessionConfig,
    crypto,
    db_ops::Store,
    errors::{Error, Result},
    identity::{AuthSession, IdentityProvider, SignUpOutcome},
    models::{display_order, AppState, AuthUser, NewNote, Note, Summary},
};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};
use uuid::Uuid;

pub const SESSION_SECRET: &[u8] = b"test-secret";

pub fn alice() -> AuthUser {
    AuthUser {
        id: Uuid::from_u128(0xa11ce),
        email: Some("alice@example.com".to_string()),
    }
}

pub fn bob() -> AuthUser {
    AuthUser {
        id: Uuid::from_u128(0xb0b),
        email: Some("bob@example.com".to_string()),
    }
}

#[derive(Default)]
struct Tables {
    notes: Vec<Note>,
    summaries: HashMap<Uuid, Summary>,
    last_tick: Option<DateTime<Utc>>,
}

impl Tables {
    /// Wall-clock time, nudged forward so no two writes share a timestamp.
    fn tick(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let now = match self.last_tick {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_tick = Some(now);
        now
    }
}

#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn summary_count(&self) -> usize {
        self.tables.lock().unwrap().summaries.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn insert_note(&self, note: &NewNote) -> Result<Note> {
        let mut t = self.tables.lock().unwrap();
        let note = Note {
            id: Uuid::new_v4(),
            user_id: note.user_id,
            title: note.title.clone(),
            content: note.content.clone(),
            created_at: t.tick(),
            pinned: false,
            pinned_at: None,
        };
        t.notes.push(note.clone());
        Ok(note)
    }

    async fn list_notes(&self, user_id: Uuid) -> Result<Vec<Note>> {
        let t = self.tables.lock().unwrap();
        let mut notes: Vec<Note> = t
            .notes
            .iter()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect();
        notes.sort_by(display_order);
        Ok(notes)
    }

    async fn get_note(&self, id: Uuid) -> Result<Option<Note>> {
        let t = self.tables.lock().unwrap();
        Ok(t.notes.iter().find(|n| n.id == id).cloned())
    }

    async fn delete_note(&self, user_id: Uuid, id: Uuid) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        let before = t.notes.len();
        t.notes.retain(|n| !(n.id == id && n.user_id == user_id));
        let deleted = t.notes.len() != before;
        if deleted {
            t.summaries.remove(&id);
        }
        Ok(deleted)
    }

    async fn set_pinned(
        &self,
        user_id: Uuid,
        id: Uuid,
        pinned_at: Option<DateTime<Utc>>,
    ) -> Result<bool> {
        let mut t = self.tables.lock().unwrap();
        match t
            .notes
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(note) => {
                note.pinned = pinned_at.is_some();
                note.pinned_at = pinned_at;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn get_summary(&self, note_id: Uuid) -> Result<Option<Summary>> {
        let t = self.tables.lock().unwrap();
        Ok(t.summaries.get(&note_id).cloned())
    }

    async fn upsert_summary(
        &self,
        note_id: Uuid,
        summary_text: &str,
        bullet_points: &[String],
    ) -> Result<Summary> {
        let mut t = self.tables.lock().unwrap();
        if !t.notes.iter().any(|n| n.id == note_id) {
            return Err(Error::Upstream("foreign key violation".into()));
        }
        let now = t.tick();
        let summary = match t.summaries.get(&note_id) {
            Some(existing) => Summary {
                summary_text: summary_text.to_string(),
                bullet_points: bullet_points.to_vec(),
                updated_at: now,
                ..existing.clone()
            },
            None => Summary {
                id: Uuid::new_v4(),
                note_id,
                summary_text: summary_text.to_string(),
                bullet_points: bullet_points.to_vec(),
                created_at: now,
                updated_at: now,
            },
        };
        t.summaries.insert(note_id, summary.clone());
        Ok(summary)
    }
}

/// Knows alice and bob. Their access tokens are `token-for-alice` and
/// `token-for-bob`, and the password is always `hunter22`. Every
/// confirmation link carries `CONFIRMATION_CODE` and confirms alice.
#[derive(Default)]
pub struct FakeIdentity {
    challenges: Mutex<Vec<String>>,
}

pub const CONFIRMATION_CODE: &str = "confirm-me";

fn token_for(user: &AuthUser) -> String {
    let email = user.email.as_deref().unwrap_or_default();
    format!("token-for-{}", email.split('@').next().unwrap_or_default())
}

#[async_trait]
impl IdentityProvider for FakeIdentity {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        _redirect_to: &str,
        code_challenge: &str,
    ) -> Result<SignUpOutcome> {
        if password.len() < 6 {
            return Err(Error::validation(
                "Password should be at least 6 characters.",
            ));
        }
        if [alice(), bob()]
            .iter()
            .any(|u| u.email.as_deref() == Some(email))
        {
            return Err(Error::validation("User already registered"));
        }
        self.challenges
            .lock()
            .unwrap()
            .push(code_challenge.to_string());
        Ok(SignUpOutcome::ConfirmationRequired)
    }

    async fn exchange_code(
        &self,
        auth_code: &str,
        code_verifier: &str,
    ) -> Result<AuthSession> {
        let challenge = crypto::code_challenge(code_verifier);
        let known = self.challenges.lock().unwrap().contains(&challenge);
        if auth_code != CONFIRMATION_CODE || !known {
            return Err(Error::validation(
                "invalid flow state, no valid flow state found",
            ));
        }
        Ok(AuthSession {
            access_token: token_for(&alice()),
            expires_in: 3600,
            user: alice(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession> {
        [alice(), bob()]
            .into_iter()
            .find(|u| u.email.as_deref() == Some(email) && password == "hunter22")
            .map(|user| AuthSession {
                access_token: token_for(&user),
                expires_in: 3600,
                user,
            })
            .ok_or_else(|| Error::validation("Invalid login credentials"))
    }

    async fn get_user(&self, access_token: &str) -> Result<Option<AuthUser>> {
        Ok([alice(), bob()]
            .into_iter()
            .find(|u| token_for(u) == access_token))
    }

    async fn sign_out(&self, _access_token: &str) -> Result<()> {
        Ok(())
    }
}

/// Plays back canned completions in order, and remembers the prompts it
/// was sent.
#[derive(Default)]
pub struct ScriptedCompletion {
    replies: Mutex<VecDeque<Option<String>>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedCompletion {
    pub fn new(replies: Vec<Option<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::default(),
        }
    }

    pub fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn complete_json(
        &self,
        _system_prompt: &str,
        user_prompt: &str,
    ) -> Result<Option<String>> {
        self.prompts.lock().unwrap().push(user_prompt.to_string());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| Error::Upstream("completion script ran out".into()))
    }
}

pub fn state_with(
    completion: ScriptedCompletion,
) -> (AppState, Arc<MemoryStore>, Arc<ScriptedCompletion>) {
    let store = Arc::new(MemoryStore::default());
    let completion = Arc::new(completion);
    let state = AppState {
        store: store.clone(),
        identity: Arc::new(FakeIdentity::default()),
        completion: completion.clone(),
        session: SessionConfig {
            secret: SESSION_SECRET.to_vec(),
            max_age_secs: 3600,
        },
        site_url: "http://localhost:8000".to_string(),
    };
    (state, store, completion)
}

pub fn state() -> AppState {
    state_with(ScriptedCompletion::default()).0
}
