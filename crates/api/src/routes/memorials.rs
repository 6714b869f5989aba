//! Route definitions for the `/memorials` resource and everything scoped
//! to a single memorial.

use axum::extract::DefaultBodyLimit;
use axum::routing::{delete, get, post, put};
use axum::Router;
use gather_core::media::MAX_VIDEO_BYTES;

use crate::handlers::{autosave, guestbook, media, memorial, moderators, payment, prayer_list};
use crate::state::AppState;

/// Multipart uploads may carry a full-size video plus form overhead.
const UPLOAD_BODY_LIMIT: usize = MAX_VIDEO_BYTES as usize + 1024 * 1024;

/// Routes mounted at `/memorials`.
///
/// ```text
/// GET    /                                   -> list_my_memorials (?status)
/// POST   /                                   -> create_memorial
/// GET    /by-url/{custom_url}                -> get_memorial_by_url
/// GET    /custom-url/{slug}/availability     -> check_custom_url (?exclude_id)
/// GET    /{id}                               -> get_memorial
/// PATCH  /{id}                               -> update_memorial
/// DELETE /{id}                               -> delete_memorial
/// PUT    /{id}/autosave                      -> autosave_memorial
/// POST   /{id}/publish                       -> publish_memorial
/// POST   /{id}/archive                       -> archive_memorial
/// POST   /{id}/unarchive                     -> unarchive_memorial
/// POST   /{id}/unlock                        -> unlock_memorial
/// POST   /{id}/checkout                      -> create_checkout
///
/// GET    /{id}/guestbook                     -> list_entries (?status, limit, offset)
/// POST   /{id}/guestbook                     -> submit_entry
///
/// GET    /{id}/moderators                    -> list_moderators
/// POST   /{id}/moderators                    -> add_moderator
/// DELETE /{id}/moderators/{user_id}          -> remove_moderator
///
/// POST   /{id}/prayer-list                   -> add_to_prayer_list
/// DELETE /{id}/prayer-list                   -> remove_from_prayer_list
/// GET    /{id}/prayer-list/status            -> prayer_list_status
///
/// GET    /{id}/media                         -> list_media
/// POST   /{id}/media                         -> register_media
/// POST   /{id}/media/signature               -> upload_signature
/// POST   /{id}/media/upload                  -> upload_media (multipart)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(memorial::list_my_memorials).post(memorial::create_memorial),
        )
        .route("/by-url/{custom_url}", get(memorial::get_memorial_by_url))
        .route(
            "/custom-url/{slug}/availability",
            get(memorial::check_custom_url),
        )
        .route(
            "/{id}",
            get(memorial::get_memorial)
                .patch(memorial::update_memorial)
                .delete(memorial::delete_memorial),
        )
        .route("/{id}/autosave", put(autosave::autosave_memorial))
        .route("/{id}/publish", post(memorial::publish_memorial))
        .route("/{id}/archive", post(memorial::archive_memorial))
        .route("/{id}/unarchive", post(memorial::unarchive_memorial))
        .route("/{id}/unlock", post(memorial::unlock_memorial))
        .route("/{id}/checkout", post(payment::create_checkout))
        // Guestbook
        .route(
            "/{id}/guestbook",
            get(guestbook::list_entries).post(guestbook::submit_entry),
        )
        // Delegated moderators
        .route(
            "/{id}/moderators",
            get(moderators::list_moderators).post(moderators::add_moderator),
        )
        .route(
            "/{id}/moderators/{user_id}",
            delete(moderators::remove_moderator),
        )
        // Prayer list
        .route(
            "/{id}/prayer-list",
            post(prayer_list::add_to_prayer_list).delete(prayer_list::remove_from_prayer_list),
        )
        .route(
            "/{id}/prayer-list/status",
            get(prayer_list::prayer_list_status),
        )
        // Media
        .route(
            "/{id}/media",
            get(media::list_media).post(media::register_media),
        )
        .route("/{id}/media/signature", post(media::upload_signature))
        .route(
            "/{id}/media/upload",
            post(media::upload_media).layer(DefaultBodyLimit::max(UPLOAD_BODY_LIMIT)),
        )
}
