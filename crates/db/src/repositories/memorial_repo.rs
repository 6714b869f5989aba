//! Repository for the `memorials` table.
//!
//! Status changes go through guarded `UPDATE ... WHERE status_id = $from`
//! statements so a concurrent transition can never be overwritten; callers
//! treat `None` as "the row was not in the expected state".

use gather_core::status::MemorialStatus;
use gather_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::memorial::{AutosaveMemorial, CreateMemorial, Memorial, UpdateMemorial};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, owner_id, first_name, middle_name, last_name, nickname, \
                        birth_date, death_date, birth_place, death_place, biography, obituary, \
                        cover_photo_url, profile_photo_url, status_id, privacy_id, password_hash, \
                        (password_hash IS NOT NULL) AS has_password, custom_url, \
                        guestbook_enabled, guestbook_moderated, current_step, completed_steps, \
                        last_saved_at, published_at, archived_at, deleted_at, created_at, updated_at";

/// Provides CRUD and lifecycle operations for memorials.
pub struct MemorialRepo;

impl MemorialRepo {
    /// Insert a new draft owned by `owner_id`.
    pub async fn create(
        pool: &PgPool,
        owner_id: DbId,
        input: &CreateMemorial,
    ) -> Result<Memorial, sqlx::Error> {
        let query = format!(
            "INSERT INTO memorials
                (owner_id, first_name, middle_name, last_name, nickname, birth_date, death_date,
                 birth_place, death_place, biography, obituary,
                 guestbook_enabled, guestbook_moderated, status_id, current_step)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11,
                     COALESCE($12, true), COALESCE($13, true), $14, 1)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Memorial>(&query)
            .bind(owner_id)
            .bind(input.first_name.trim())
            .bind(&input.middle_name)
            .bind(input.last_name.trim())
            .bind(&input.nickname)
            .bind(input.birth_date)
            .bind(input.death_date)
            .bind(&input.birth_place)
            .bind(&input.death_place)
            .bind(&input.biography)
            .bind(&input.obituary)
            .bind(input.guestbook_enabled)
            .bind(input.guestbook_moderated)
            .bind(MemorialStatus::Draft.id())
            .fetch_one(pool)
            .await
    }

    /// Find a memorial by ID regardless of status.
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Memorial>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM memorials WHERE id = $1");
        sqlx::query_as::<_, Memorial>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a memorial by its custom URL slug regardless of status.
    pub async fn find_by_custom_url(
        pool: &PgPool,
        custom_url: &str,
    ) -> Result<Option<Memorial>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM memorials WHERE custom_url = $1");
        sqlx::query_as::<_, Memorial>(&query)
            .bind(custom_url)
            .fetch_optional(pool)
            .await
    }

    /// List an owner's memorials, newest first.
    ///
    /// Without a status filter, deleted memorials are left out.
    pub async fn list_by_owner(
        pool: &PgPool,
        owner_id: DbId,
        status: Option<MemorialStatus>,
    ) -> Result<Vec<Memorial>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM memorials
             WHERE owner_id = $1
               AND (($2::SMALLINT IS NULL AND status_id <> $3) OR status_id = $2)
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, Memorial>(&query)
            .bind(owner_id)
            .bind(status.map(MemorialStatus::id))
            .bind(MemorialStatus::Deleted.id())
            .fetch_all(pool)
            .await
    }

    /// Whether `custom_url` is free, ignoring memorial `exclude_id`.
    pub async fn custom_url_available(
        pool: &PgPool,
        custom_url: &str,
        exclude_id: Option<DbId>,
    ) -> Result<bool, sqlx::Error> {
        let taken: bool = sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM memorials
                WHERE custom_url = $1 AND ($2::BIGINT IS NULL OR id <> $2)
             )",
        )
        .bind(custom_url)
        .bind(exclude_id)
        .fetch_one(pool)
        .await?;
        Ok(!taken)
    }

    /// Apply an owner edit with optimistic locking.
    ///
    /// The row is only written when its `updated_at` still equals
    /// `expected_updated_at` and it is not deleted. Returns `None` otherwise,
    /// leaving the row untouched. A colliding custom URL surfaces as a
    /// `uq_memorials_custom_url` unique violation.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        expected_updated_at: Timestamp,
        input: &UpdateMemorial,
    ) -> Result<Option<Memorial>, sqlx::Error> {
        let query = format!(
            "UPDATE memorials SET
                first_name = COALESCE($3, first_name),
                middle_name = COALESCE($4, middle_name),
                last_name = COALESCE($5, last_name),
                nickname = COALESCE($6, nickname),
                birth_date = COALESCE($7, birth_date),
                death_date = COALESCE($8, death_date),
                birth_place = COALESCE($9, birth_place),
                death_place = COALESCE($10, death_place),
                biography = COALESCE($11, biography),
                obituary = COALESCE($12, obituary),
                cover_photo_url = COALESCE($13, cover_photo_url),
                profile_photo_url = COALESCE($14, profile_photo_url),
                privacy_id = COALESCE($15, privacy_id),
                password_hash = COALESCE($16, password_hash),
                custom_url = COALESCE($17, custom_url),
                guestbook_enabled = COALESCE($18, guestbook_enabled),
                guestbook_moderated = COALESCE($19, guestbook_moderated)
             WHERE id = $1 AND updated_at = $2 AND status_id <> $20
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Memorial>(&query)
            .bind(id)
            .bind(expected_updated_at)
            .bind(&input.first_name)
            .bind(&input.middle_name)
            .bind(&input.last_name)
            .bind(&input.nickname)
            .bind(input.birth_date)
            .bind(input.death_date)
            .bind(&input.birth_place)
            .bind(&input.death_place)
            .bind(&input.biography)
            .bind(&input.obituary)
            .bind(&input.cover_photo_url)
            .bind(&input.profile_photo_url)
            .bind(input.privacy.map(|p| p.id()))
            .bind(&input.password_hash)
            .bind(&input.custom_url)
            .bind(input.guestbook_enabled)
            .bind(input.guestbook_moderated)
            .bind(MemorialStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Apply a partial wizard save without optimistic locking.
    ///
    /// Stamps `last_saved_at`. Returns `None` when the memorial is missing or
    /// deleted.
    pub async fn autosave(
        pool: &PgPool,
        id: DbId,
        input: &AutosaveMemorial,
    ) -> Result<Option<Memorial>, sqlx::Error> {
        let query = format!(
            "UPDATE memorials SET
                first_name = COALESCE($2, first_name),
                middle_name = COALESCE($3, middle_name),
                last_name = COALESCE($4, last_name),
                nickname = COALESCE($5, nickname),
                birth_date = COALESCE($6, birth_date),
                death_date = COALESCE($7, death_date),
                birth_place = COALESCE($8, birth_place),
                death_place = COALESCE($9, death_place),
                biography = COALESCE($10, biography),
                obituary = COALESCE($11, obituary),
                current_step = COALESCE($12, current_step),
                completed_steps = COALESCE($13, completed_steps),
                last_saved_at = NOW()
             WHERE id = $1 AND status_id <> $14
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Memorial>(&query)
            .bind(id)
            .bind(&input.first_name)
            .bind(&input.middle_name)
            .bind(&input.last_name)
            .bind(&input.nickname)
            .bind(input.birth_date)
            .bind(input.death_date)
            .bind(&input.birth_place)
            .bind(&input.death_place)
            .bind(&input.biography)
            .bind(&input.obituary)
            .bind(input.current_step)
            .bind(&input.completed_steps)
            .bind(MemorialStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Move a memorial from `from` to `to`, stamping the matching lifecycle
    /// timestamp. Returns `None` if the row was not in `from`.
    ///
    /// `published_at` is only set the first time a memorial is published, so
    /// unarchiving keeps the original date.
    pub async fn transition(
        pool: &PgPool,
        id: DbId,
        from: MemorialStatus,
        to: MemorialStatus,
    ) -> Result<Option<Memorial>, sqlx::Error> {
        let query = format!(
            "UPDATE memorials SET
                status_id = $3,
                published_at = CASE WHEN $3 = $4 THEN COALESCE(published_at, NOW())
                                    ELSE published_at END,
                archived_at = CASE WHEN $3 = $5 THEN NOW()
                                   WHEN $3 = $4 THEN NULL
                                   ELSE archived_at END,
                deleted_at = CASE WHEN $3 = $6 THEN NOW() ELSE deleted_at END
             WHERE id = $1 AND status_id = $2
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Memorial>(&query)
            .bind(id)
            .bind(from.id())
            .bind(to.id())
            .bind(MemorialStatus::Published.id())
            .bind(MemorialStatus::Archived.id())
            .bind(MemorialStatus::Deleted.id())
            .fetch_optional(pool)
            .await
    }

    /// Permanently remove a draft and everything hanging off it.
    ///
    /// Returns `true` if a draft row was deleted.
    pub async fn hard_delete_draft(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM memorials WHERE id = $1 AND status_id = $2")
            .bind(id)
            .bind(MemorialStatus::Draft.id())
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
