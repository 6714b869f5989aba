//! Route definitions for the `/prayer-list` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::prayer_list;
use crate::state::AppState;

/// Routes mounted at `/prayer-list`.
///
/// ```text
/// GET /                -> list_prayer_list
/// GET /anniversaries   -> upcoming_anniversaries (?days)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(prayer_list::list_prayer_list))
        .route("/anniversaries", get(prayer_list::upcoming_anniversaries))
}
