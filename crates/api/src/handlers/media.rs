//! Handlers for memorial photos and videos.
//!
//! Files reach the CDN either directly from the client using a signed
//! upload (then registered here) or through the multipart upload endpoint.

use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use gather_cloud::media::video_thumbnail_url;
use gather_cloud::{SignedUpload, UploadRequest};
use gather_core::error::CoreError;
use gather_core::media::{image_dimensions, validate_asset_count, validate_caption, validate_upload};
use gather_core::status::{MediaKind, MemorialStatus};
use gather_core::types::DbId;
use gather_db::models::media::{CreateMediaAsset, MediaAsset, UpdateMediaAsset};
use gather_db::models::memorial::Memorial;
use gather_db::repositories::MediaAssetRepo;
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::access::{load_owned, load_readable};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::middleware::memorial_access::MemorialAccessToken;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SignatureRequest {
    pub kind: MediaKind,
}

/// Request body for registering a direct client upload.
#[derive(Debug, Deserialize)]
pub struct RegisterMediaRequest {
    pub provider_public_id: String,
    pub url: String,
    pub thumbnail_url: Option<String>,
    pub mime_type: String,
    pub bytes: i64,
    pub caption: Option<String>,
    pub width: Option<i32>,
    pub height: Option<i32>,
    pub duration_secs: Option<f64>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/memorials/{id}/media/signature
pub async fn upload_signature(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(memorial_id): Path<DbId>,
    Json(input): Json<SignatureRequest>,
) -> AppResult<Json<DataResponse<SignedUpload>>> {
    let memorial = load_owned(&state, memorial_id, &auth).await?;
    ensure_accepts_media(&memorial)?;
    let provider = state.media_provider()?;

    let signed = provider.sign_upload(
        input.kind,
        &memorial_folder(&state, memorial_id),
        Utc::now().timestamp(),
    );
    Ok(Json(DataResponse { data: signed }))
}

/// POST /api/v1/memorials/{id}/media
///
/// Record an asset the client already uploaded with a signed upload.
pub async fn register_media(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(memorial_id): Path<DbId>,
    Json(input): Json<RegisterMediaRequest>,
) -> AppResult<impl IntoResponse> {
    let memorial = load_owned(&state, memorial_id, &auth).await?;
    ensure_accepts_media(&memorial)?;

    let kind = validate_upload(&input.mime_type, input.bytes)?;
    if input.provider_public_id.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "provider_public_id must not be empty".into(),
        )));
    }
    if !input.url.starts_with("https://") {
        return Err(AppError::Core(CoreError::Validation(
            "url must be an https URL".into(),
        )));
    }
    let caption = clean_caption(input.caption);
    validate_caption(caption.as_deref())?;
    validate_asset_count(MediaAssetRepo::count_for_memorial(&state.pool, memorial_id).await?)?;

    let thumbnail_url = match (kind, input.thumbnail_url) {
        (_, Some(url)) => Some(url),
        (MediaKind::Video, None) => Some(video_thumbnail_url(&input.url)),
        (MediaKind::Photo, None) => None,
    };

    let asset = MediaAssetRepo::create(
        &state.pool,
        &CreateMediaAsset {
            memorial_id,
            uploaded_by: auth.user_id,
            kind,
            provider_public_id: input.provider_public_id,
            url: input.url,
            thumbnail_url,
            mime_type: input.mime_type.to_ascii_lowercase(),
            caption,
            width: input.width,
            height: input.height,
            duration_secs: input.duration_secs,
            bytes: input.bytes,
        },
    )
    .await?;

    tracing::info!(memorial_id, asset_id = asset.id, kind = %asset.kind, "Media registered");
    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// POST /api/v1/memorials/{id}/media/upload
///
/// Multipart form with a `file` part and an optional `caption` part.
pub async fn upload_media(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(memorial_id): Path<DbId>,
    mut multipart: Multipart,
) -> AppResult<impl IntoResponse> {
    let memorial = load_owned(&state, memorial_id, &auth).await?;
    ensure_accepts_media(&memorial)?;
    let provider = state.media_provider()?;

    let mut file: Option<(String, String, Vec<u8>)> = None;
    let mut caption = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::BadRequest(format!("Invalid multipart body: {e}")))?
    {
        match field.name() {
            Some("file") => {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let mime_type = field
                    .content_type()
                    .unwrap_or("application/octet-stream")
                    .to_ascii_lowercase();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read file: {e}")))?;
                file = Some((file_name, mime_type, data.to_vec()));
            }
            Some("caption") => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::BadRequest(format!("Failed to read caption: {e}")))?;
                caption = clean_caption(Some(text));
            }
            _ => {}
        }
    }

    let Some((file_name, mime_type, data)) = file else {
        return Err(AppError::BadRequest("Missing 'file' part".into()));
    };
    let byte_len = i64::try_from(data.len())
        .map_err(|_| AppError::BadRequest("File is too large".into()))?;
    let kind = validate_upload(&mime_type, byte_len)?;
    validate_caption(caption.as_deref())?;
    validate_asset_count(MediaAssetRepo::count_for_memorial(&state.pool, memorial_id).await?)?;

    let local_dimensions = match kind {
        MediaKind::Photo => image_dimensions(&data),
        MediaKind::Video => None,
    };

    let uploaded = provider
        .upload(UploadRequest {
            kind,
            folder: memorial_folder(&state, memorial_id),
            file_name,
            mime_type: mime_type.clone(),
            data,
        })
        .await?;

    let (width, height) = match (uploaded.width, uploaded.height, local_dimensions) {
        (Some(w), Some(h), _) => (Some(w), Some(h)),
        (_, _, Some((w, h))) => (i32::try_from(w).ok(), i32::try_from(h).ok()),
        _ => (None, None),
    };
    let thumbnail_url = match kind {
        MediaKind::Video => Some(video_thumbnail_url(&uploaded.secure_url)),
        MediaKind::Photo => None,
    };

    let asset = MediaAssetRepo::create(
        &state.pool,
        &CreateMediaAsset {
            memorial_id,
            uploaded_by: auth.user_id,
            kind,
            provider_public_id: uploaded.public_id,
            url: uploaded.secure_url,
            thumbnail_url,
            mime_type,
            caption,
            width,
            height,
            duration_secs: uploaded.duration,
            bytes: byte_len,
        },
    )
    .await?;

    tracing::info!(
        memorial_id,
        asset_id = asset.id,
        kind = %asset.kind,
        bytes = byte_len,
        "Media uploaded"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: asset })))
}

/// GET /api/v1/memorials/{id}/media
pub async fn list_media(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    MemorialAccessToken(token): MemorialAccessToken,
    Path(memorial_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<MediaAsset>>>> {
    load_readable(&state, memorial_id, user.as_ref(), token.as_deref()).await?;
    let assets = MediaAssetRepo::list_for_memorial(&state.pool, memorial_id).await?;
    Ok(Json(DataResponse { data: assets }))
}

/// PATCH /api/v1/media/{id}
pub async fn update_media(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(asset_id): Path<DbId>,
    Json(mut input): Json<UpdateMediaAsset>,
) -> AppResult<Json<DataResponse<MediaAsset>>> {
    let asset = ensure_asset_exists(&state, asset_id).await?;
    let memorial = load_owned(&state, asset.memorial_id, &auth).await?;
    ensure_accepts_media(&memorial)?;

    input.caption = input.caption.map(|c| c.trim().to_string());
    validate_caption(input.caption.as_deref())?;
    if input.sort_order.is_some_and(|o| o < 0) {
        return Err(AppError::Core(CoreError::Validation(
            "sort_order must not be negative".into(),
        )));
    }

    let updated = MediaAssetRepo::update(&state.pool, asset_id, &input)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MediaAsset",
            id: asset_id,
        }))?;
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/media/{id}
///
/// A CDN failure is logged and the row is removed anyway.
pub async fn delete_media(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(asset_id): Path<DbId>,
) -> AppResult<StatusCode> {
    let asset = ensure_asset_exists(&state, asset_id).await?;
    load_owned(&state, asset.memorial_id, &auth).await?;

    match state.media.as_deref() {
        Some(media) => {
            if let Err(e) = media.destroy(&asset.provider_public_id, asset.kind).await {
                tracing::error!(error = %e, asset_id, "Failed to delete media from CDN");
            }
        }
        None => {
            tracing::warn!(asset_id, "Media CDN not configured, removing row only");
        }
    }

    MediaAssetRepo::delete(&state.pool, asset_id).await?;
    tracing::info!(user_id = auth.user_id, asset_id, "Media deleted");
    Ok(StatusCode::NO_CONTENT)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn ensure_asset_exists(state: &AppState, id: DbId) -> AppResult<MediaAsset> {
    MediaAssetRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "MediaAsset",
            id,
        }))
}

fn ensure_accepts_media(memorial: &Memorial) -> AppResult<()> {
    if memorial.status == MemorialStatus::Deleted {
        return Err(AppError::Core(CoreError::Conflict(
            "Deleted memorials cannot be edited".into(),
        )));
    }
    Ok(())
}

fn memorial_folder(state: &AppState, memorial_id: DbId) -> String {
    format!("{}/memorials/{memorial_id}", state.config.media_folder)
}

fn clean_caption(caption: Option<String>) -> Option<String> {
    caption
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
}
