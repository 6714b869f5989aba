//! Delegated guestbook moderators.

use gather_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `memorial_moderators` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MemorialModerator {
    pub id: DbId,
    pub memorial_id: DbId,
    pub user_id: DbId,
    pub added_by: DbId,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Moderator joined with the user's public identity for listings.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct ModeratorListing {
    pub user_id: DbId,
    pub username: String,
    pub display_name: String,
    pub added_by: DbId,
    pub created_at: Timestamp,
}
