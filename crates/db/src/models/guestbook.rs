//! Guestbook entry model, DTOs and moderation results.

use gather_core::status::GuestbookEntryStatus;
use gather_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `guestbook_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct GuestbookEntry {
    pub id: DbId,
    pub memorial_id: DbId,
    pub author_id: DbId,
    pub author_name: String,
    pub relationship: Option<String>,
    pub message: String,
    pub photo_url: Option<String>,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: GuestbookEntryStatus,
    pub moderated_by: Option<DbId>,
    pub moderated_at: Option<Timestamp>,
    pub moderation_reason: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for inserting a validated submission.
#[derive(Debug, Clone)]
pub struct CreateGuestbookEntry {
    pub memorial_id: DbId,
    pub author_id: DbId,
    pub author_name: String,
    pub relationship: Option<String>,
    pub message: String,
    pub photo_url: Option<String>,
    pub status: GuestbookEntryStatus,
}

/// Outcome of an all-or-nothing moderation batch.
///
/// Anything other than `Applied` means the transaction was rolled back and
/// no entry changed.
#[derive(Debug, Clone)]
pub enum ModerationOutcome {
    Applied(Vec<GuestbookEntry>),
    NotFound(DbId),
    Forbidden(DbId),
    NotPending {
        entry_id: DbId,
        status: GuestbookEntryStatus,
    },
}

/// Entry counts per status over a moderator's memorials.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModerationStats {
    pub pending: i64,
    pub approved: i64,
    pub rejected: i64,
    pub total: i64,
}
