//! Memorial lookups combined with the caller's read and write rights.
//!
//! Every handler that touches a memorial-scoped resource goes through one of
//! these helpers so privacy gating and ownership are decided in one place.

use gather_core::error::CoreError;
use gather_core::memorial::{read_access, ReadAccess, Viewer};
use gather_core::status::PrivacyLevel;
use gather_core::types::DbId;
use gather_db::models::memorial::Memorial;
use gather_db::repositories::{MemorialModeratorRepo, MemorialRepo};

use crate::auth::memorial_access::token_unlocks;
use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::state::AppState;

/// Whether `user` has owner rights over `memorial` (owner or admin).
pub fn is_owner(memorial: &Memorial, user: Option<&AuthUser>) -> bool {
    user.is_some_and(|u| u.user_id == memorial.owner_id || u.is_admin())
}

/// Work out how the caller relates to `memorial`.
///
/// Delegated moderators are only looked up when privacy would otherwise
/// keep them out.
pub async fn viewer_for(
    state: &AppState,
    memorial: &Memorial,
    user: Option<&AuthUser>,
    access_token: Option<&str>,
) -> AppResult<Viewer> {
    if is_owner(memorial, user) {
        return Ok(Viewer::Owner);
    }
    if let Some(user) = user.filter(|_| memorial.privacy != PrivacyLevel::Public) {
        if MemorialModeratorRepo::is_moderator(&state.pool, memorial.id, user.user_id).await? {
            return Ok(Viewer::Moderator);
        }
    }
    let unlocked =
        access_token.is_some_and(|t| token_unlocks(t, memorial.id, &state.config.jwt));
    Ok(Viewer::Visitor { unlocked })
}

/// Turn a privacy decision into the matching error.
pub fn enforce_read_access(memorial: &Memorial, access: ReadAccess) -> AppResult<()> {
    match access {
        ReadAccess::Allowed => Ok(()),
        ReadAccess::Hidden => Err(not_found(memorial.id)),
        ReadAccess::Private => Err(AppError::Core(CoreError::Forbidden(
            "This memorial is private".into(),
        ))),
        ReadAccess::PasswordRequired => Err(AppError::Core(CoreError::Forbidden(
            "This memorial is password protected".into(),
        ))),
    }
}

/// Check that the caller may read an already-loaded memorial.
pub async fn ensure_readable(
    state: &AppState,
    memorial: &Memorial,
    user: Option<&AuthUser>,
    access_token: Option<&str>,
) -> AppResult<()> {
    let viewer = viewer_for(state, memorial, user, access_token).await?;
    enforce_read_access(memorial, read_access(memorial.status, memorial.privacy, viewer))
}

/// Load a memorial the caller is allowed to read.
pub async fn load_readable(
    state: &AppState,
    id: DbId,
    user: Option<&AuthUser>,
    access_token: Option<&str>,
) -> AppResult<Memorial> {
    let memorial = load(state, id).await?;
    ensure_readable(state, &memorial, user, access_token).await?;
    Ok(memorial)
}

/// Load a memorial the caller owns.
///
/// Non-owners get 404 for memorials they could not see anyway and 403
/// otherwise.
pub async fn load_owned(state: &AppState, id: DbId, user: &AuthUser) -> AppResult<Memorial> {
    let memorial = load(state, id).await?;
    if is_owner(&memorial, Some(user)) {
        return Ok(memorial);
    }
    if !memorial.status.is_visible_to_visitors() {
        return Err(not_found(id));
    }
    Err(AppError::Core(CoreError::Forbidden(
        "Only the memorial owner can do this".into(),
    )))
}

/// Whether the caller may moderate the memorial's guestbook.
pub async fn can_moderate(
    state: &AppState,
    memorial: &Memorial,
    user: Option<&AuthUser>,
) -> AppResult<bool> {
    let Some(user) = user else {
        return Ok(false);
    };
    if is_owner(memorial, Some(user)) {
        return Ok(true);
    }
    Ok(MemorialModeratorRepo::is_moderator(&state.pool, memorial.id, user.user_id).await?)
}

/* --------------------------------------------------------------------------
Helpers
-------------------------------------------------------------------------- */

async fn load(state: &AppState, id: DbId) -> AppResult<Memorial> {
    MemorialRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found(id))
}

fn not_found(id: DbId) -> AppError {
    AppError::Core(CoreError::NotFound {
        entity: "Memorial",
        id,
    })
}
