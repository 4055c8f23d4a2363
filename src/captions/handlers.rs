use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use bytes::Bytes;
use tracing::instrument;
use uuid::Uuid;

use crate::auth::jwt::AuthUser;
use crate::captions::dto::{CaptionItem, DeleteResponse, GenerateCaptionResponse, UserQuery};
use crate::captions::services;
use crate::error::ApiError;
use crate::state::AppState;

const ALLOWED_EXTENSIONS: [&str; 3] = ["jpg", "jpeg", "png"];
const MAX_UPLOAD_BYTES: usize = 20 * 1024 * 1024;

pub fn caption_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/generate-caption",
            post(generate_caption).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/captions", get(list_user_captions))
        .route(
            "/all-captions",
            get(list_all_captions).delete(delete_user_captions),
        )
}

/// POST /generate-caption (multipart): `user_id` and `file` fields.
#[instrument(skip(state, multipart))]
async fn generate_caption(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<GenerateCaptionResponse>, ApiError> {
    let mut user_id: Option<Uuid> = None;
    let mut file_bytes: Option<Bytes> = None;
    let mut filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Validation(format!("malformed multipart body: {e}")))?
    {
        let name = field.name().map(|s| s.to_string());
        match name.as_deref() {
            Some("user_id") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(format!("could not read user_id: {e}")))?;
                user_id = Some(raw.trim().parse().map_err(|_| {
                    ApiError::Validation("user_id must be a valid UUID".into())
                })?);
            }
            Some("file") => {
                filename = field.file_name().map(|s| s.to_string());
                file_bytes = Some(field.bytes().await.map_err(|e| {
                    ApiError::Validation(format!("could not read upload: {e}"))
                })?);
            }
            _ => {}
        }
    }

    let user_id = user_id.ok_or_else(|| ApiError::Validation("user_id field is required".into()))?;
    let file_bytes =
        file_bytes.ok_or_else(|| ApiError::Validation("file field is required".into()))?;

    // Extension allow-list comes before any model work
    check_extension(filename.as_deref())?;

    let row = services::generate_caption(&state, user_id, file_bytes).await?;

    Ok(Json(GenerateCaptionResponse {
        caption: row.caption,
        image_base64: BASE64.encode(&row.image_data),
    }))
}

/// GET /captions?user_id= — one user's captions, newest first.
#[instrument(skip(state))]
async fn list_user_captions(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Query(q): Query<UserQuery>,
) -> Result<Json<Vec<CaptionItem>>, ApiError> {
    let rows = services::get_user_captions(&state, q.user_id).await?;
    Ok(Json(rows.into_iter().map(CaptionItem::from).collect()))
}

/// GET /all-captions — every stored caption (administrative).
#[instrument(skip(state))]
async fn list_all_captions(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
) -> Result<Json<Vec<CaptionItem>>, ApiError> {
    let rows = services::get_all_captions(&state).await?;
    Ok(Json(rows.into_iter().map(CaptionItem::from).collect()))
}

/// DELETE /all-captions?user_id= — bulk delete for one user.
#[instrument(skip(state))]
async fn delete_user_captions(
    State(state): State<AppState>,
    AuthUser(_subject): AuthUser,
    Query(q): Query<UserQuery>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted_count = services::delete_user_captions(&state, q.user_id).await?;
    Ok(Json(DeleteResponse { deleted_count }))
}

/// Allow-list on the upload filename; uploads without a filename pass through.
fn check_extension(filename: Option<&str>) -> Result<(), ApiError> {
    let Some(filename) = filename else {
        return Ok(());
    };
    let ext = filename
        .rsplit_once('.')
        .map(|(_, e)| e.to_ascii_lowercase());
    match ext {
        Some(e) if ALLOWED_EXTENSIONS.contains(&e.as_str()) => Ok(()),
        _ => Err(ApiError::Validation(format!(
            "file extension not allowed; expected one of: {}",
            ALLOWED_EXTENSIONS.join(", ")
        ))),
    }
}
