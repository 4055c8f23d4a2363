use bytes::Bytes;
use tracing::{info, warn};
use uuid::Uuid;

use crate::captions::repo::Caption;
use crate::state::AppState;

/// Failure modes of the caption pipeline, kept distinct so the HTTP layer
/// can map client faults and server faults to different status codes.
#[derive(Debug, thiserror::Error)]
pub enum CaptionError {
    #[error("{0}")]
    Decode(String),
    #[error("{0}")]
    Inference(String),
    #[error("could not persist caption")]
    Database(#[source] anyhow::Error),
}

/// Decodes the upload, runs the caption model and persists the result with
/// the original image bytes.
pub async fn generate_caption(
    state: &AppState,
    user_id: Uuid,
    image_bytes: Bytes,
) -> Result<Caption, CaptionError> {
    image::load_from_memory(&image_bytes).map_err(|e| {
        warn!(user_id = %user_id, error = %e, "uploaded bytes are not a decodable image");
        CaptionError::Decode(e.to_string())
    })?;

    let caption_text = state
        .captioner
        .caption(image_bytes.clone())
        .await
        .map_err(|e| CaptionError::Inference(e.to_string()))?;

    let row = Caption::insert(&state.db, user_id, &caption_text, &image_bytes)
        .await
        .map_err(CaptionError::Database)?;

    info!(user_id = %user_id, caption_id = %row.id, "caption generated");
    Ok(row)
}

pub async fn get_user_captions(state: &AppState, user_id: Uuid) -> anyhow::Result<Vec<Caption>> {
    Caption::list_by_user(&state.db, user_id).await
}

pub async fn get_all_captions(state: &AppState) -> anyhow::Result<Vec<Caption>> {
    Caption::list_all(&state.db).await
}

pub async fn delete_user_captions(state: &AppState, user_id: Uuid) -> anyhow::Result<u64> {
    let deleted = Caption::delete_by_user(&state.db, user_id).await?;
    info!(user_id = %user_id, deleted, "user captions deleted");
    Ok(deleted)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Decode failure must be classified before the model or the database is
    // ever touched; the fake state's lazy pool would error loudly otherwise.
    #[tokio::test]
    async fn garbage_bytes_fail_as_decode_error() {
        let state = AppState::fake();
        let err = generate_caption(
            &state,
            Uuid::new_v4(),
            Bytes::from_static(b"definitely not an image"),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, CaptionError::Decode(_)));
    }
}
