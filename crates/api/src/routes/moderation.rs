//! Route definitions for the `/moderation` resource.
//!
//! All endpoints require authentication and are scoped to the memorials
//! the caller owns or moderates.

use axum::routing::{delete, get, post};
use axum::Router;

use crate::handlers::moderation;
use crate::state::AppState;

/// Routes mounted at `/moderation`.
///
/// ```text
/// GET    /queue              -> moderation_queue (?limit, offset)
/// GET    /stats              -> moderation_stats
/// POST   /bulk               -> bulk_moderate
///
/// GET    /blocks             -> list_blocks
/// POST   /blocks             -> block_user
/// DELETE /blocks/{user_id}   -> unblock_user
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queue", get(moderation::moderation_queue))
        .route("/stats", get(moderation::moderation_stats))
        .route("/bulk", post(moderation::bulk_moderate))
        .route(
            "/blocks",
            get(moderation::list_blocks).post(moderation::block_user),
        )
        .route("/blocks/{user_id}", delete(moderation::unblock_user))
}
