use gather_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

use crate::models::guestbook::GuestbookEntry;

/// A row from the `blocked_users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BlockedUser {
    pub id: DbId,
    pub owner_id: DbId,
    pub blocked_user_id: DbId,
    pub reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// The block row plus the pending entries it rejected.
#[derive(Debug, Clone)]
pub struct BlockResult {
    pub block: BlockedUser,
    pub rejected_entries: Vec<GuestbookEntry>,
}
