//! Handlers for the caller's prayer list and upcoming anniversaries.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::Utc;
use gather_core::error::CoreError;
use gather_core::prayer_list::{
    upcoming_for_memorial, validate_notes, validate_window_days, UpcomingAnniversary,
};
use gather_core::status::MemorialStatus;
use gather_core::types::DbId;
use gather_db::models::prayer_list::PrayerListItem;
use gather_db::repositories::PrayerListRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::handlers::access::load_readable;
use crate::middleware::auth::AuthUser;
use crate::middleware::memorial_access::MemorialAccessToken;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddToPrayerListRequest {
    pub notes: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct PrayerListStatus {
    pub on_list: bool,
}

#[derive(Debug, Deserialize)]
pub struct AnniversaryParams {
    pub days: Option<i64>,
}

/// An anniversary plus enough memorial detail to render it.
#[derive(Debug, Serialize)]
pub struct AnniversaryItem {
    #[serde(flatten)]
    pub anniversary: UpcomingAnniversary,
    pub first_name: String,
    pub last_name: String,
    pub custom_url: Option<String>,
}

/// POST /api/v1/memorials/{id}/prayer-list
///
/// Re-adding a removed memorial reactivates the old entry.
pub async fn add_to_prayer_list(
    State(state): State<AppState>,
    auth: AuthUser,
    MemorialAccessToken(token): MemorialAccessToken,
    Path(memorial_id): Path<DbId>,
    Json(input): Json<AddToPrayerListRequest>,
) -> AppResult<impl IntoResponse> {
    let memorial = load_readable(&state, memorial_id, Some(&auth), token.as_deref()).await?;
    if memorial.status != MemorialStatus::Published {
        return Err(AppError::Core(CoreError::Conflict(
            "Only published memorials can be added to a prayer list".into(),
        )));
    }

    let notes = input.notes.as_deref().map(str::trim).filter(|n| !n.is_empty());
    validate_notes(notes)?;

    let entry = PrayerListRepo::add(&state.pool, auth.user_id, memorial_id, notes).await?;
    tracing::debug!(user_id = auth.user_id, memorial_id, "Added to prayer list");
    Ok((StatusCode::CREATED, Json(DataResponse { data: entry })))
}

/// DELETE /api/v1/memorials/{id}/prayer-list
pub async fn remove_from_prayer_list(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(memorial_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !PrayerListRepo::remove(&state.pool, auth.user_id, memorial_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "PrayerListEntry",
            id: memorial_id,
        }));
    }
    tracing::debug!(user_id = auth.user_id, memorial_id, "Removed from prayer list");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/memorials/{id}/prayer-list/status
pub async fn prayer_list_status(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(memorial_id): Path<DbId>,
) -> AppResult<Json<DataResponse<PrayerListStatus>>> {
    let on_list = PrayerListRepo::is_on_list(&state.pool, auth.user_id, memorial_id).await?;
    Ok(Json(DataResponse {
        data: PrayerListStatus { on_list },
    }))
}

/// GET /api/v1/prayer-list
pub async fn list_prayer_list(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<PrayerListItem>>>> {
    let items = PrayerListRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: items }))
}

/// GET /api/v1/prayer-list/anniversaries
///
/// Birth and death anniversaries of listed memorials within `days`
/// (inclusive of today), soonest first.
pub async fn upcoming_anniversaries(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<AnniversaryParams>,
) -> AppResult<Json<DataResponse<Vec<AnniversaryItem>>>> {
    let window = validate_window_days(params.days)?;
    let today = Utc::now().date_naive();

    let items = PrayerListRepo::list_for_user(&state.pool, auth.user_id).await?;
    let mut upcoming: Vec<AnniversaryItem> = items
        .into_iter()
        .flat_map(|item| {
            upcoming_for_memorial(
                item.memorial_id,
                item.birth_date,
                item.death_date,
                today,
                window,
            )
            .into_iter()
            .map(move |anniversary| AnniversaryItem {
                anniversary,
                first_name: item.first_name.clone(),
                last_name: item.last_name.clone(),
                custom_url: item.custom_url.clone(),
            })
        })
        .collect();

    upcoming.sort_by(|a, b| {
        a.anniversary
            .date
            .cmp(&b.anniversary.date)
            .then(a.anniversary.memorial_id.cmp(&b.anniversary.memorial_id))
    });
    Ok(Json(DataResponse { data: upcoming }))
}
