//! Prayer list entries and the joined listing shown to their owner.

use chrono::NaiveDate;
use gather_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `prayer_list_entries` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PrayerListEntry {
    pub id: DbId,
    pub user_id: DbId,
    pub memorial_id: DbId,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// An active entry joined with the memorial it points at.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PrayerListItem {
    pub id: DbId,
    pub memorial_id: DbId,
    pub notes: Option<String>,
    pub added_at: Timestamp,
    pub first_name: String,
    pub last_name: String,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub custom_url: Option<String>,
    pub profile_photo_url: Option<String>,
}
