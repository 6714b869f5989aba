//! Handler for wizard autosave.

use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use gather_core::error::CoreError;
use gather_core::memorial::{normalize_completed_steps, validate_life_dates, validate_wizard_step};
use gather_core::rate_limit::{autosave_bucket, AUTOSAVE_POLICY};
use gather_core::status::MemorialStatus;
use gather_core::types::{DbId, Timestamp};
use gather_db::models::memorial::AutosaveMemorial;
use gather_db::repositories::{MemorialRepo, RateLimitRepo};
use serde::Serialize;

use crate::error::{AppError, AppResult};
use crate::handlers::access::load_owned;
use crate::handlers::memorial::BiographicalFields;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct AutosaveResponse {
    pub memorial_id: DbId,
    pub current_step: i32,
    pub completed_steps: Vec<i32>,
    pub last_saved_at: Option<Timestamp>,
    /// Send this as `expected_updated_at` on the next PATCH.
    pub updated_at: Timestamp,
}

/// PUT /api/v1/memorials/{id}/autosave
///
/// Apply the supplied subset of wizard fields. Last write wins; no
/// optimistic locking.
pub async fn autosave_memorial(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(id): Path<DbId>,
    Json(mut input): Json<AutosaveMemorial>,
) -> AppResult<Json<DataResponse<AutosaveResponse>>> {
    let memorial = load_owned(&state, id, &auth).await?;
    if memorial.status == MemorialStatus::Deleted {
        return Err(AppError::Core(CoreError::Conflict(
            "Deleted memorials cannot be edited".into(),
        )));
    }

    RateLimitRepo::check_and_record(
        &state.pool,
        &autosave_bucket(auth.user_id, id),
        &AUTOSAVE_POLICY,
    )
    .await?
    .into_result()?;

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
        Utc::now().date_naive(),
    )?;
    if let Some(step) = input.current_step {
        validate_wizard_step(step)?;
    }
    if let Some(steps) = input.completed_steps.take() {
        input.completed_steps = Some(normalize_completed_steps(&steps)?);
    }

    let saved = MemorialRepo::autosave(&state.pool, id, &input)
        .await?
        .ok_or_else(|| {
            AppError::Core(CoreError::Conflict(
                "Memorial was deleted while saving".into(),
            ))
        })?;

    tracing::debug!(user_id = auth.user_id, memorial_id = id, "Memorial autosaved");
    Ok(Json(DataResponse {
        data: AutosaveResponse {
            memorial_id: saved.id,
            current_step: saved.current_step,
            completed_steps: saved.completed_steps,
            last_saved_at: saved.last_saved_at,
            updated_at: saved.updated_at,
        },
    }))
}
