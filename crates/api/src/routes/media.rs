//! Route definitions for the `/media` resource.

use axum::routing::patch;
use axum::Router;

use crate::handlers::media;
use crate::state::AppState;

/// Routes mounted at `/media`.
///
/// ```text
/// PATCH  /{id}  -> update_media
/// DELETE /{id}  -> delete_media
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/{id}",
        patch(media::update_media).delete(media::delete_media),
    )
}
