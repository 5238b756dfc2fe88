//! Notes, always as seen by one authenticated user. Ownership is checked
//! here rather than left to the database.

use super::{
    config::{CONTENT_MAX_CHARS, TITLE_MAX_CHARS},
    db_ops::Store,
    errors::{Error, Result},
    models::{display_order, AuthUser, NewNote, Note},
};
use chrono::Utc;
use uuid::Uuid;

pub async fn create(
    store: &dyn Store,
    user: &AuthUser,
    title: &str,
    content: &str,
) -> Result<Note> {
    let title = title.trim();
    let content = content.trim();
    if title.is_empty() || content.is_empty() {
        return Err(Error::validation("Title and content are required"));
    }
    if title.chars().count() > TITLE_MAX_CHARS {
        return Err(Error::validation(format!(
            "Title must be at most {TITLE_MAX_CHARS} characters"
        )));
    }
    if content.chars().count() > CONTENT_MAX_CHARS {
        return Err(Error::validation(format!(
            "Content must be at most {CONTENT_MAX_CHARS} characters"
        )));
    }

    let note = store
        .insert_note(&NewNote {
            user_id: user.id,
            title: title.to_string(),
            content: content.to_string(),
        })
        .await?;
    tracing::info!(note_id = %note.id, user_id = %user.id, "created note");

    Ok(note)
}

pub async fn list(store: &dyn Store, user: &AuthUser) -> Result<Vec<Note>> {
    let mut notes = store.list_notes(user.id).await?;
    notes.sort_by(display_order);

    Ok(notes)
}

/// The note, if it exists and belongs to `user`.
pub async fn get(store: &dyn Store, user: &AuthUser, id: Uuid) -> Result<Note> {
    let note = store.get_note(id).await?.ok_or(Error::NotFound)?;
    if note.user_id != user.id {
        tracing::warn!(note_id = %id, user_id = %user.id, "cross-user note access");
        return Err(Error::Forbidden);
    }

    Ok(note)
}

pub async fn delete(store: &dyn Store, user: &AuthUser, id: Uuid) -> Result<()> {
    get(store, user, id).await?;
    // Someone may have beaten us to it.
    if !store.delete_note(user.id, id).await? {
        return Err(Error::NotFound);
    }
    tracing::info!(note_id = %id, user_id = %user.id, "deleted note");

    Ok(())
}

/// Pinning again moves the note back to the top of the pinned group.
pub async fn pin(store: &dyn Store, user: &AuthUser, id: Uuid) -> Result<()> {
    set_pinned(store, user, id, true).await
}

pub async fn unpin(store: &dyn Store, user: &AuthUser, id: Uuid) -> Result<()> {
    set_pinned(store, user, id, false).await
}

async fn set_pinned(
    store: &dyn Store,
    user: &AuthUser,
    id: Uuid,
    pinned: bool,
) -> Result<()> {
    get(store, user, id).await?;
    let pinned_at = if pinned { Some(Utc::now()) } else { None };
    if !store.set_pinned(user.id, id, pinned_at).await? {
        return Err(Error::NotFound);
    }

    Ok(())
}
