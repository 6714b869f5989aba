//! Repository for the `prayer_list_entries` table.

use gather_core::status::MemorialStatus;
use gather_core::types::DbId;
use sqlx::PgPool;

use crate::models::prayer_list::{PrayerListEntry, PrayerListItem};

const COLUMNS: &str = "id, user_id, memorial_id, notes, is_active, created_at, updated_at";

/// Per-user prayer lists. Removal is soft (`is_active = false`).
pub struct PrayerListRepo;

impl PrayerListRepo {
    /// Add a memorial to a user's list, reactivating a removed entry.
    ///
    /// New notes replace old ones; omitted notes keep what was stored.
    pub async fn add(
        pool: &PgPool,
        user_id: DbId,
        memorial_id: DbId,
        notes: Option<&str>,
    ) -> Result<PrayerListEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO prayer_list_entries (user_id, memorial_id, notes)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_prayer_list_entries_user_memorial
             DO UPDATE SET is_active = true,
                           notes = COALESCE(EXCLUDED.notes, prayer_list_entries.notes)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, PrayerListEntry>(&query)
            .bind(user_id)
            .bind(memorial_id)
            .bind(notes)
            .fetch_one(pool)
            .await
    }

    /// Deactivate an entry. Returns `false` when it was not on the list.
    pub async fn remove(pool: &PgPool, user_id: DbId, memorial_id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE prayer_list_entries SET is_active = false
             WHERE user_id = $1 AND memorial_id = $2 AND is_active = true",
        )
        .bind(user_id)
        .bind(memorial_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_on_list(
        pool: &PgPool,
        user_id: DbId,
        memorial_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM prayer_list_entries
                WHERE user_id = $1 AND memorial_id = $2 AND is_active = true
             )",
        )
        .bind(user_id)
        .bind(memorial_id)
        .fetch_one(pool)
        .await
    }

    /// Active entries joined with their memorials, most recently added first.
    ///
    /// Memorials that have since been deleted or unpublished drop out.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PrayerListItem>, sqlx::Error> {
        sqlx::query_as::<_, PrayerListItem>(
            "SELECT p.id, p.memorial_id, p.notes, p.created_at AS added_at,
                    m.first_name, m.last_name, m.birth_date, m.death_date,
                    m.custom_url, m.profile_photo_url
             FROM prayer_list_entries p
             JOIN memorials m ON m.id = p.memorial_id
             WHERE p.user_id = $1 AND p.is_active = true AND m.status_id IN ($2, $3)
             ORDER BY p.created_at DESC, p.id DESC",
        )
        .bind(user_id)
        .bind(MemorialStatus::Published.id())
        .bind(MemorialStatus::Archived.id())
        .fetch_all(pool)
        .await
    }
}
