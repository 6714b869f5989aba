pub mod auth;
pub mod guestbook;
pub mod health;
pub mod media;
pub mod memorials;
pub mod moderation;
pub mod payments;
pub mod prayer_list;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/register                                   register (public)
/// /auth/login                                      login (public)
/// /auth/refresh                                    refresh (public)
/// /auth/logout                                     logout (requires auth)
/// /auth/me                                         current user (requires auth)
///
/// /memorials                                       list mine, create
/// /memorials/by-url/{custom_url}                   get by custom URL
/// /memorials/custom-url/{slug}/availability        custom URL check
/// /memorials/{id}                                  get, update, delete
/// /memorials/{id}/autosave                         wizard autosave (PUT)
/// /memorials/{id}/publish                          publish (POST)
/// /memorials/{id}/archive                          archive (POST)
/// /memorials/{id}/unarchive                        unarchive (POST)
/// /memorials/{id}/unlock                           password unlock (POST)
/// /memorials/{id}/checkout                         start publish checkout (POST)
/// /memorials/{id}/guestbook                        list, submit
/// /memorials/{id}/moderators                       list, add (owner only)
/// /memorials/{id}/moderators/{user_id}             remove (owner only)
/// /memorials/{id}/prayer-list                      add, remove (POST, DELETE)
/// /memorials/{id}/prayer-list/status               on-list check (GET)
/// /memorials/{id}/media                            list, register
/// /memorials/{id}/media/signature                  signed direct upload (POST)
/// /memorials/{id}/media/upload                     multipart upload (POST)
///
/// /guestbook/{id}                                  delete (author or owner)
/// /guestbook/{id}/moderate                         approve / reject (POST)
///
/// /moderation/queue                                pending entries (GET)
/// /moderation/stats                                counts per status (GET)
/// /moderation/bulk                                 bulk approve / reject (POST)
/// /moderation/blocks                               list, block (GET, POST)
/// /moderation/blocks/{user_id}                     unblock (DELETE)
///
/// /prayer-list                                     caller's list (GET)
/// /prayer-list/anniversaries                       upcoming anniversaries (GET)
///
/// /media/{id}                                      update, delete (PATCH, DELETE)
///
/// /payments/verify                                 verify checkout (POST)
/// /payments/webhook                                processor webhook (POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/auth", auth::router())
        .nest("/memorials", memorials::router())
        .nest("/guestbook", guestbook::router())
        .nest("/moderation", moderation::router())
        .nest("/prayer-list", prayer_list::router())
        .nest("/media", media::router())
        .nest("/payments", payments::router())
}
