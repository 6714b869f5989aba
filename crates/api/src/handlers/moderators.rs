//! Owner-managed delegated moderators for a memorial's guestbook.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use gather_core::error::CoreError;
use gather_core::types::DbId;
use gather_db::models::moderator::ModeratorListing;
use gather_db::repositories::{MemorialModeratorRepo, UserRepo};
use serde::Deserialize;

use crate::error::{AppError, AppResult};
use crate::handlers::access::load_owned;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct AddModeratorRequest {
    pub user_id: DbId,
}

/// GET /api/v1/memorials/{id}/moderators
pub async fn list_moderators(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(memorial_id): Path<DbId>,
) -> AppResult<Json<DataResponse<Vec<ModeratorListing>>>> {
    load_owned(&state, memorial_id, &auth).await?;
    let moderators = MemorialModeratorRepo::list_for_memorial(&state.pool, memorial_id).await?;
    Ok(Json(DataResponse { data: moderators }))
}

/// POST /api/v1/memorials/{id}/moderators
///
/// Granting the same user twice is a 409.
pub async fn add_moderator(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(memorial_id): Path<DbId>,
    Json(input): Json<AddModeratorRequest>,
) -> AppResult<impl IntoResponse> {
    let memorial = load_owned(&state, memorial_id, &auth).await?;
    if input.user_id == memorial.owner_id {
        return Err(AppError::BadRequest(
            "The owner already moderates this memorial".into(),
        ));
    }
    if UserRepo::find_by_id(&state.pool, input.user_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: input.user_id,
        }));
    }

    let moderator =
        MemorialModeratorRepo::add(&state.pool, memorial_id, input.user_id, auth.user_id).await?;
    tracing::info!(memorial_id, moderator_id = input.user_id, "Moderator added");
    Ok((StatusCode::CREATED, Json(DataResponse { data: moderator })))
}

/// DELETE /api/v1/memorials/{id}/moderators/{user_id}
pub async fn remove_moderator(
    State(state): State<AppState>,
    auth: AuthUser,
    Path((memorial_id, user_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    load_owned(&state, memorial_id, &auth).await?;
    if !MemorialModeratorRepo::remove(&state.pool, memorial_id, user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "MemorialModerator",
            id: user_id,
        }));
    }
    tracing::info!(memorial_id, moderator_id = user_id, "Moderator removed");
    Ok(StatusCode::NO_CONTENT)
}
