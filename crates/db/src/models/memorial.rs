//! Memorial entity model and DTOs.

use chrono::NaiveDate;
use gather_core::status::{MemorialStatus, PrivacyLevel};
use gather_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `memorials` table.
///
/// The password hash is selected for unlock checks but never serialized;
/// `has_password` tells clients whether one is set.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Memorial {
    pub id: DbId,
    pub owner_id: DbId,
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub nickname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub death_place: Option<String>,
    pub biography: Option<String>,
    pub obituary: Option<String>,
    pub cover_photo_url: Option<String>,
    pub profile_photo_url: Option<String>,
    #[sqlx(rename = "status_id", try_from = "i16")]
    pub status: MemorialStatus,
    #[sqlx(rename = "privacy_id", try_from = "i16")]
    pub privacy: PrivacyLevel,
    #[serde(skip_serializing)]
    pub password_hash: Option<String>,
    pub has_password: bool,
    pub custom_url: Option<String>,
    pub guestbook_enabled: bool,
    pub guestbook_moderated: bool,
    pub current_step: i32,
    pub completed_steps: Vec<i32>,
    pub last_saved_at: Option<Timestamp>,
    pub published_at: Option<Timestamp>,
    pub archived_at: Option<Timestamp>,
    pub deleted_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl Memorial {
    pub fn display_name(&self) -> String {
        gather_core::memorial::display_name(&self.first_name, &self.last_name)
    }
}

/// DTO for creating a draft memorial.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateMemorial {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub nickname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub death_place: Option<String>,
    pub biography: Option<String>,
    pub obituary: Option<String>,
    pub guestbook_enabled: Option<bool>,
    pub guestbook_moderated: Option<bool>,
}

/// DTO for an owner edit. `None` fields are left unchanged.
///
/// The memorial password arrives in plaintext on the request type and is
/// hashed before it reaches this struct.
#[derive(Debug, Clone, Default)]
pub struct UpdateMemorial {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub death_place: Option<String>,
    pub biography: Option<String>,
    pub obituary: Option<String>,
    pub cover_photo_url: Option<String>,
    pub profile_photo_url: Option<String>,
    pub privacy: Option<PrivacyLevel>,
    pub password_hash: Option<String>,
    pub custom_url: Option<String>,
    pub guestbook_enabled: Option<bool>,
    pub guestbook_moderated: Option<bool>,
}

/// Partial wizard save. Every field is optional; supplied ones overwrite.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AutosaveMemorial {
    pub first_name: Option<String>,
    pub middle_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub death_date: Option<NaiveDate>,
    pub birth_place: Option<String>,
    pub death_place: Option<String>,
    pub biography: Option<String>,
    pub obituary: Option<String>,
    pub current_step: Option<i32>,
    pub completed_steps: Option<Vec<i32>>,
}
