//! Route definitions for the `/guestbook` resource.

use axum::routing::{delete, post};
use axum::Router;

use crate::handlers::guestbook;
use crate::state::AppState;

/// Routes mounted at `/guestbook`.
///
/// ```text
/// DELETE /{id}           -> delete_entry
/// POST   /{id}/moderate  -> moderate_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/{id}", delete(guestbook::delete_entry))
        .route("/{id}/moderate", post(guestbook::moderate_entry))
}
