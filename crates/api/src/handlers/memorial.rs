//! Handlers for the `/memorials` resource: lifecycle, edits and reads.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc};
use gather_core::error::CoreError;
use gather_core::memorial::{
    ensure_transition, read_access, validate_custom_url, validate_life_dates,
    validate_optional_text, validate_privacy_password, validate_required_name, DeleteMode,
    ReadAccess, MAX_LONG_TEXT_LENGTH, MAX_NAME_LENGTH, MAX_PLACE_LENGTH,
};
use gather_core::platform_events::{
    ENTITY_MEMORIAL, MEMORIAL_ARCHIVED, MEMORIAL_CREATED, MEMORIAL_DELETED, MEMORIAL_PUBLISHED,
    MEMORIAL_UNARCHIVED,
};
use gather_core::rate_limit::{memorial_unlock_bucket, UNLOCK_POLICY};
use gather_core::status::{MemorialStatus, PrivacyLevel};
use gather_core::types::{DbId, Timestamp};
use gather_db::models::memorial::{CreateMemorial, Memorial, UpdateMemorial};
use gather_db::repositories::{MediaAssetRepo, MemorialRepo, PaymentRepo, RateLimitRepo};
use gather_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::auth::memorial_access::generate_memorial_access_token;
use crate::auth::password::{hash_password, verify_password};
use crate::error::{AppError, AppResult};
use crate::handlers::access::{enforce_read_access, load_owned, load_readable, viewer_for};
use crate::middleware::auth::{AuthUser, MaybeAuthUser};
use crate::middleware::memorial_access::MemorialAccessToken;
use crate::query::StatusFilterParams;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

/// Request body for `PATCH /memorials/{id}`.
///
/// `expected_updated_at` is the `updated_at` the client last saw; the edit
/// is refused with 409 when the row has moved on since.
#[derive(Debug, Deserialize)]
pub struct UpdateMemorialRequest {
    pub expected_updated_at: Timestamp,
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub death_place: Option<String>,
    pub biography: Option<String>,
    pub obituary: Option<String>,
    pub cover_photo_url: Option<String>,
    pub profile_photo_url: Option<String>,
    pub privacy: Option<PrivacyLevel>,
    /// Plaintext memorial password; stored only as an argon2id hash.
    pub password: Option<String>,
    pub custom_url: Option<String>,
    pub guestbook_enabled: Option<bool>,
    pub guestbook_moderated: Option<bool>,
}

/// Request body for `POST /memorials/{id}/unlock`.
#[derive(Debug, Deserialize)]
pub struct UnlockRequest {
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct UnlockResponse {
    pub memorial_id: DbId,
    pub access_token: String,
    /// Token lifetime in seconds.
    pub expires_in: i64,
}

#[derive(Debug, Deserialize)]
pub struct AvailabilityParams {
    /// Memorial being edited, so its own URL counts as available.
    pub exclude_id: Option<DbId>,
}

#[derive(Debug, Serialize)]
pub struct CustomUrlAvailability {
    pub custom_url: String,
    pub available: bool,
    /// Why the slug cannot be used, when it is not available.
    pub reason: Option<String>,
}

/// Free-text fields shared by create, edit and autosave.
#[derive(Debug, Default, Clone, Copy)]
pub struct BiographicalFields<'a> {
    pub first_name: Option<&'a str>,
    pub middle_name: Option<&'a str>,
    pub last_name: Option<&'a str>,
    pub nickname: Option<&'a str>,
    pub birth_place: Option<&'a str>,
    pub death_place: Option<&'a str>,
    pub biography: Option<&'a str>,
    pub obituary: Option<&'a str>,
}

impl BiographicalFields<'_> {
    /// Supplied names must be non-empty; every field is length-checked.
    pub fn validate(&self) -> Result<(), CoreError> {
        if let Some(first) = self.first_name {
            validate_required_name("first_name", first)?;
        }
        if let Some(last) = self.last_name {
            validate_required_name("last_name", last)?;
        }
        validate_optional_text("middle_name", self.middle_name, MAX_NAME_LENGTH)?;
        validate_optional_text("nickname", self.nickname, MAX_NAME_LENGTH)?;
        validate_optional_text("birth_place", self.birth_place, MAX_PLACE_LENGTH)?;
        validate_optional_text("death_place", self.death_place, MAX_PLACE_LENGTH)?;
        validate_optional_text("biography", self.biography, MAX_LONG_TEXT_LENGTH)?;
        validate_optional_text("obituary", self.obituary, MAX_LONG_TEXT_LENGTH)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/memorials
///
/// Start a new draft at wizard step 1.
pub async fn create_memorial(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<CreateMemorial>,
) -> AppResult<impl IntoResponse> {
    BiographicalFields {
        first_name: Some(&input.first_name),
        middle_name: input.middle_name.as_deref(),
        last_name: Some(&input.last_name),
        nickname: input.nickname.as_deref(),
        birth_place: input.birth_place.as_deref(),
        death_place: input.death_place.as_deref(),
        biography: input.biography.as_deref(),
        obituary: input.obituary.as_deref(),
    }
    .validate()?;
    validate_life_dates(input.birth_date, input.death_date, today())?;

    let memorial = MemorialRepo::create(&state.pool, auth.user_id, &input).await?;

    tracing::info!(
        user_id = auth.user_id,
        memorial_id = memorial.id,
        "Memorial draft created"
    );
    publish_lifecycle_event(&state, MEMORIAL_CREATED, &memorial, auth.user_id);

    Ok((StatusCode::CREATED, Json(DataResponse { data: memorial })))
}

/// GET /api/v1/memorials
///
/// The caller's memorials, newest first. Deleted ones only with
/// `?status=deleted`.
pub async fn list_my_memorials(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<StatusFilterParams>,
) -> AppResult<Json<DataResponse<Vec<Memorial>>>> {
    let status = params
        .status
        .as_deref()
        .map(|s| {
            MemorialStatus::parse(s)
                .ok_or_else(|| AppError::BadRequest(format!("Unknown memorial status '{s}'")))
        })
        .transpose()?;
    let memorials = MemorialRepo::list_by_owner(&state.pool, auth.user_id, status).await?;
    Ok(Json(DataResponse { data: memorials }))
}

/// GET /api/v1/memorials/{id}
pub async fn get_memorial(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    MemorialAccessToken(token): MemorialAccessToken,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Memorial>>> {
    let memorial = load_readable(&state, id, user.as_ref(), token.as_deref()).await?;
    Ok(Json(DataResponse { data: memorial }))
}

/// GET /api/v1/memorials/by-url/{custom_url}
pub async fn get_memorial_by_url(
    State(state): State<AppState>,
    MaybeAuthUser(user): MaybeAuthUser,
    MemorialAccessToken(token): MemorialAccessToken,
    Path(custom_url): Path<String>,
) -> AppResult<Json<DataResponse<Memorial>>> {
    let memorial = MemorialRepo::find_by_custom_url(&state.pool, &custom_url)
        .await?
        .ok_or(AppError::Database(sqlx::Error::RowNotFound))?;

    let viewer = viewer_for(&state, &memorial, user.as_ref(), token.as_deref()).await?;
    match read_access(memorial.status, memorial.privacy, viewer) {
        // Do not reveal the id behind an unpublished slug.
        ReadAccess::Hidden => return Err(AppError::Database(sqlx::Error::RowNotFound)),
        access => enforce_read_access(&memorial, access)?,
    }
    Ok(Json(DataResponse { data: memorial }))
}

/// GET /api/v1/memorials/custom-url/{slug}/availability
pub async fn check_custom_url(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    Query(params): Query<AvailabilityParams>,
) -> AppResult<Json<DataResponse<CustomUrlAvailability>>> {
    if let Err(CoreError::Validation(reason)) = validate_custom_url(&slug) {
        return Ok(Json(DataResponse {
            data: CustomUrlAvailability {
                custom_url: slug,
                available: false,
                reason: Some(reason),
            },
        }));
    }

    let available =
        MemorialRepo::custom_url_available(&state.pool, &slug, params.exclude_id).await?;
    Ok(Json(DataResponse {
        data: CustomUrlAvailability {
            custom_url: slug,
            available,
            reason: (!available).then(|| "Custom URL is already taken".to_string()),
        },
    }))
}

/// PATCH /api/v1/memorials/{id}
///
/// Owner edit with optimistic locking on `updated_at`.
pub async fn update_memorial(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateMemorialRequest>,
) -> AppResult<Json<DataResponse<Memorial>>> {
    let memorial = load_owned(&state, id, &auth).await?;
    if memorial.status == MemorialStatus::Deleted {
        return Err(AppError::Core(CoreError::Conflict(
            "Deleted memorials cannot be edited".into(),
        )));
    }

    BiographicalFields {
        first_name: input.first_name.as_deref(),
        middle_name: input.middle_name.as_deref(),
        last_name: input.last_name.as_deref(),
        nickname: input.nickname.as_deref(),
        birth_place: input.birth_place.as_deref(),
        death_place: input.death_place.as_deref(),
        biography: input.biography.as_deref(),
        obituary: input.obituary.as_deref(),
    }
    .validate()?;
    validate_life_dates(
        input.birth_date.or(memorial.birth_date),
        input.death_date.or(memorial.death_date),
        today(),
    )?;

    let custom_url = input.custom_url.as_deref().map(str::trim);
    if let Some(slug) = custom_url {
        validate_custom_url(slug)?;
        if !MemorialRepo::custom_url_available(&state.pool, slug, Some(id)).await? {
            return Err(AppError::Core(CoreError::Conflict(format!(
                "Custom URL '{slug}' is already taken"
            ))));
        }
    }

    if input.privacy.is_some() || input.password.is_some() {
        validate_privacy_password(
            input.privacy.unwrap_or(memorial.privacy),
            input.password.as_deref(),
            memorial.has_password,
        )?;
    }
    let password_hash = input
        .password
        .as_deref()
        .map(hash_password)
        .transpose()
        .map_err(|e| AppError::InternalError(format!("Password hashing error: {e}")))?;

    let changes = UpdateMemorial {
        first_name: input.first_name.map(|s| s.trim().to_string()),
        middle_name: input.middle_name,
        last_name: input.last_name.map(|s| s.trim().to_string()),
        nickname: input.nickname,
        birth_date: input.birth_date,
        death_date: input.death_date,
        birth_place: input.birth_place,
        death_place: input.death_place,
        biography: input.biography,
        obituary: input.obituary,
        cover_photo_url: input.cover_photo_url,
        profile_photo_url: input.profile_photo_url,
        privacy: input.privacy,
        password_hash,
        custom_url: custom_url.map(str::to_string),
        guestbook_enabled: input.guestbook_enabled,
        guestbook_moderated: input.guestbook_moderated,
    };

    let updated = MemorialRepo::update(&state.pool, id, input.expected_updated_at, &changes)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Memorial was modified by another request. Reload and try again".into(),
            ))
        })?;

    tracing::info!(user_id = auth.user_id, memorial_id = id, "Memorial updated");
    Ok(Json(DataResponse { data: updated }))
}

/// DELETE /api/v1/memorials/{id}
///
/// Drafts are removed outright; published and archived memorials are
/// soft-deleted and stay readable by their owner as `deleted`.
pub async fn delete_memorial(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    let memorial = load_owned(&state, id, &auth).await?;

    match memorial.status.delete_mode() {
        Some(DeleteMode::Hard) => {
            purge_cdn_assets(&state, id).await;
            if !MemorialRepo::hard_delete_draft(&state.pool, id).await? {
                return Err(state_changed());
            }
            tracing::info!(user_id = auth.user_id, memorial_id = id, "Draft memorial removed");
        }
        Some(DeleteMode::Soft) => {
            ensure_transition(memorial.status, MemorialStatus::Deleted)?;
            MemorialRepo::transition(&state.pool, id, memorial.status, MemorialStatus::Deleted)
                .await?
                .ok_or_else(state_changed)?;
            tracing::info!(user_id = auth.user_id, memorial_id = id, "Memorial soft-deleted");
        }
        None => {
            return Err(AppError::Core(CoreError::Conflict(
                "Memorial is already deleted".into(),
            )));
        }
    }

    publish_lifecycle_event(&state, MEMORIAL_DELETED, &memorial, auth.user_id);
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/memorials/{id}/publish
///
/// Requires a completed payment for the memorial.
pub async fn publish_memorial(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Memorial>>> {
    let memorial = load_owned(&state, id, &auth).await?;
    if memorial.status != MemorialStatus::Draft {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Only drafts can be published; memorial is '{}'",
            memorial.status
        ))));
    }
    validate_required_name("first_name", &memorial.first_name)?;
    validate_required_name("last_name", &memorial.last_name)?;

    if !PaymentRepo::has_paid(&state.pool, id).await? {
        return Err(AppError::Core(CoreError::PaymentRequired(
            "Publishing a memorial requires payment".into(),
        )));
    }

    let published = transition(&state, &memorial, MemorialStatus::Published).await?;
    tracing::info!(user_id = auth.user_id, memorial_id = id, "Memorial published");
    publish_lifecycle_event(&state, MEMORIAL_PUBLISHED, &published, auth.user_id);
    Ok(Json(DataResponse { data: published }))
}

/// POST /api/v1/memorials/{id}/archive
pub async fn archive_memorial(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Memorial>>> {
    let memorial = load_owned(&state, id, &auth).await?;
    let archived = transition(&state, &memorial, MemorialStatus::Archived).await?;
    tracing::info!(user_id = auth.user_id, memorial_id = id, "Memorial archived");
    publish_lifecycle_event(&state, MEMORIAL_ARCHIVED, &archived, auth.user_id);
    Ok(Json(DataResponse { data: archived }))
}

/// POST /api/v1/memorials/{id}/unarchive
pub async fn unarchive_memorial(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Memorial>>> {
    let memorial = load_owned(&state, id, &auth).await?;
    if memorial.status != MemorialStatus::Archived {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Only archived memorials can be unarchived; memorial is '{}'",
            memorial.status
        ))));
    }
    let restored = transition(&state, &memorial, MemorialStatus::Published).await?;
    tracing::info!(user_id = auth.user_id, memorial_id = id, "Memorial unarchived");
    publish_lifecycle_event(&state, MEMORIAL_UNARCHIVED, &restored, auth.user_id);
    Ok(Json(DataResponse { data: restored }))
}

/// POST /api/v1/memorials/{id}/unlock
///
/// Exchange a memorial password for a short-lived access token to send in
/// the `X-Memorial-Access` header.
///
/// Attempts are throttled per memorial, so spreading guesses across clients
/// does not help.
pub async fn unlock_memorial(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UnlockRequest>,
) -> AppResult<Json<DataResponse<UnlockResponse>>> {
    let memorial = MemorialRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|m| m.status.is_visible_to_visitors())
        .ok_or(AppError::Core(CoreError::NotFound {
            entity: "Memorial",
            id,
        }))?;

    let hash = match (memorial.privacy, memorial.password_hash.as_deref()) {
        (PrivacyLevel::Password, Some(hash)) => hash,
        _ => {
            return Err(AppError::BadRequest(
                "This memorial is not password protected".into(),
            ))
        }
    };

    RateLimitRepo::check_and_record(&state.pool, &memorial_unlock_bucket(id), &UNLOCK_POLICY)
        .await?
        .into_result()?;

    let valid = verify_password(&input.password, hash)
        .map_err(|e| AppError::InternalError(format!("Password verification error: {e}")))?;
    if !valid {
        tracing::warn!(memorial_id = id, "Incorrect memorial password");
        return Err(AppError::Core(CoreError::Forbidden(
            "Incorrect memorial password".into(),
        )));
    }

    let expiry_mins = state.config.memorial_access_expiry_mins;
    let access_token = generate_memorial_access_token(id, expiry_mins, &state.config.jwt)
        .map_err(|e| AppError::InternalError(format!("Token generation error: {e}")))?;

    Ok(Json(DataResponse {
        data: UnlockResponse {
            memorial_id: id,
            access_token,
            expires_in: expiry_mins * 60,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn today() -> NaiveDate {
    Utc::now().date_naive()
}

fn state_changed() -> AppError {
    AppError::Core(CoreError::Conflict(
        "Memorial status changed concurrently. Reload and try again".into(),
    ))
}

/// Apply a checked status transition.
async fn transition(
    state: &AppState,
    memorial: &Memorial,
    to: MemorialStatus,
) -> AppResult<Memorial> {
    ensure_transition(memorial.status, to)?;
    MemorialRepo::transition(&state.pool, memorial.id, memorial.status, to)
        .await?
        .ok_or_else(state_changed)
}

pub(crate) fn publish_lifecycle_event(
    state: &AppState,
    event_type: &str,
    memorial: &Memorial,
    actor: DbId,
) {
    state.event_bus.publish(
        PlatformEvent::new(event_type)
            .with_source(ENTITY_MEMORIAL, memorial.id)
            .with_actor(actor)
            .with_payload(json!({
                "owner_id": memorial.owner_id,
                "memorial_name": memorial.display_name(),
                "status": memorial.status,
            })),
    );
}

/// Remove a draft's media from the CDN before its rows cascade away.
/// Failures are logged; the database delete goes ahead regardless.
async fn purge_cdn_assets(state: &AppState, memorial_id: DbId) {
    let Some(media) = state.media.as_deref() else {
        return;
    };
    let assets = match MediaAssetRepo::list_for_memorial(&state.pool, memorial_id).await {
        Ok(assets) => assets,
        Err(e) => {
            tracing::error!(error = %e, memorial_id, "Failed to list media for CDN cleanup");
            return;
        }
    };
    for asset in assets {
        if let Err(e) = media.destroy(&asset.provider_public_id, asset.kind).await {
            tracing::error!(
                error = %e,
                memorial_id,
                asset_id = asset.id,
                "Failed to delete media from CDN"
            );
        }
    }
}
