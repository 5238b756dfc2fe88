use super::{
    db_ops::Store,
    errors::{Error, Result},
    models::{AuthUser, Summary},
    notes,
};
use uuid::Uuid;

/// `Ok(None)` means there is nothing to show: nobody has summarized the note
/// yet, or the note is gone. Someone else's note is still `Forbidden`.
pub async fn get_by_note_id(
    store: &dyn Store,
    user: &AuthUser,
    note_id: Uuid,
) -> Result<Option<Summary>> {
    match notes::get(store, user, note_id).await {
        Ok(_) => store.get_summary(note_id).await,
        Err(Error::NotFound) => Ok(None),
        Err(e) => Err(e),
    }
}

/// Create the note's summary, or overwrite the one it already has. The
/// summary keeps its id and `created_at` across overwrites.
pub async fn upsert(
    store: &dyn Store,
    user: &AuthUser,
    note_id: Uuid,
    summary_text: &str,
    bullets: &[String],
) -> Result<Summary> {
    notes::get(store, user, note_id).await?;
    let summary = store.upsert_summary(note_id, summary_text, bullets).await?;
    tracing::info!(
        note_id = %note_id,
        summary_id = %summary.id,
        bullets = bullets.len(),
        "saved summary"
    );

    Ok(summary)
}
