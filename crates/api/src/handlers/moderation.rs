//! Handlers for the moderation dashboard: queue, stats, bulk decisions and
//! the owner's block list.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use gather_core::error::CoreError;
use gather_core::guestbook::{validate_bulk_ids, validate_moderation_reason, ModerationAction};
use gather_core::platform_events::{ENTITY_USER, USER_BLOCKED};
use gather_core::types::DbId;
use gather_db::models::blocked_user::BlockedUser;
use gather_db::models::guestbook::{GuestbookEntry, ModerationStats};
use gather_db::repositories::{BlockedUserRepo, GuestbookRepo, UserRepo};
use gather_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::error::{AppError, AppResult};
use crate::handlers::guestbook::apply_moderation;
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Request body for `POST /moderation/bulk`.
#[derive(Debug, Deserialize)]
pub struct BulkModerationRequest {
    pub entry_ids: Vec<DbId>,
    pub action: ModerationAction,
    pub reason: Option<String>,
}

/// Request body for `POST /moderation/blocks`.
#[derive(Debug, Deserialize)]
pub struct BlockUserRequest {
    pub user_id: DbId,
    pub reason: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct BlockUserResponse {
    pub block: BlockedUser,
    /// Pending entries by the blocked user that were rejected.
    pub rejected_count: usize,
}

/// GET /api/v1/moderation/queue
///
/// Pending entries across every memorial the caller owns or moderates,
/// oldest first.
pub async fn moderation_queue(
    State(state): State<AppState>,
    auth: AuthUser,
    Query(params): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<GuestbookEntry>>>> {
    let (limit, offset) = params.resolve();
    let entries =
        GuestbookRepo::moderation_queue(&state.pool, auth.user_id, auth.is_admin(), limit, offset)
            .await?;
    Ok(Json(DataResponse { data: entries }))
}

/// GET /api/v1/moderation/stats
pub async fn moderation_stats(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<ModerationStats>>> {
    let stats = GuestbookRepo::moderation_stats(&state.pool, auth.user_id, auth.is_admin()).await?;
    Ok(Json(DataResponse { data: stats }))
}

/// POST /api/v1/moderation/bulk
///
/// All or nothing: a single missing, foreign or already-moderated entry
/// fails the whole batch.
pub async fn bulk_moderate(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<BulkModerationRequest>,
) -> AppResult<Json<DataResponse<Vec<GuestbookEntry>>>> {
    let ids = validate_bulk_ids(&input.entry_ids)?;
    let entries =
        apply_moderation(&state, &auth, &ids, input.action, input.reason.as_deref()).await?;
    Ok(Json(DataResponse { data: entries }))
}

/// POST /api/v1/moderation/blocks
///
/// Block a user from every memorial the caller owns and reject their
/// pending entries.
pub async fn block_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(input): Json<BlockUserRequest>,
) -> AppResult<impl IntoResponse> {
    if input.user_id == auth.user_id {
        return Err(AppError::BadRequest("You cannot block yourself".into()));
    }
    let reason = input.reason.as_deref().map(str::trim).filter(|r| !r.is_empty());
    validate_moderation_reason(reason)?;

    if UserRepo::find_by_id(&state.pool, input.user_id).await?.is_none() {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "User",
            id: input.user_id,
        }));
    }

    let result = BlockedUserRepo::block(&state.pool, auth.user_id, input.user_id, reason).await?;
    let rejected_count = result.rejected_entries.len();

    tracing::info!(
        owner_id = auth.user_id,
        blocked_user_id = input.user_id,
        rejected_count,
        "User blocked"
    );
    state.event_bus.publish(
        PlatformEvent::new(USER_BLOCKED)
            .with_source(ENTITY_USER, input.user_id)
            .with_actor(auth.user_id)
            .with_payload(json!({
                "owner_id": auth.user_id,
                "rejected_entry_ids": result.rejected_entries.iter().map(|e| e.id).collect::<Vec<_>>(),
            })),
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: BlockUserResponse {
                block: result.block,
                rejected_count,
            },
        }),
    ))
}

/// GET /api/v1/moderation/blocks
pub async fn list_blocks(
    State(state): State<AppState>,
    auth: AuthUser,
) -> AppResult<Json<DataResponse<Vec<BlockedUser>>>> {
    let blocks = BlockedUserRepo::list_for_owner(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: blocks }))
}

/// DELETE /api/v1/moderation/blocks/{user_id}
pub async fn unblock_user(
    State(state): State<AppState>,
    auth: AuthUser,
    Path(user_id): Path<DbId>,
) -> AppResult<StatusCode> {
    if !BlockedUserRepo::unblock(&state.pool, auth.user_id, user_id).await? {
        return Err(AppError::Core(CoreError::NotFound {
            entity: "BlockedUser",
            id: user_id,
        }));
    }
    tracing::info!(owner_id = auth.user_id, blocked_user_id = user_id, "User unblocked");
    Ok(StatusCode::NO_CONTENT)
}
