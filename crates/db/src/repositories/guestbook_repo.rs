//! Repository for the `guestbook_entries` table.
//!
//! Every status write carries a `status_id = pending` guard, matching the
//! one-way state machine in `gather_core::guestbook`.

use gather_core::guestbook::ModerationAction;
use gather_core::status::GuestbookEntryStatus;
use gather_core::types::DbId;
use sqlx::PgPool;

use crate::models::guestbook::{
    CreateGuestbookEntry, GuestbookEntry, ModerationOutcome, ModerationStats,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, memorial_id, author_id, author_name, relationship, message, photo_url, \
                        status_id, moderated_by, moderated_at, moderation_reason, \
                        created_at, updated_at";

/// Memorials a user may moderate: owned, delegated, or all of them for admins.
///
/// Expects the user id in `$1` and the admin flag in `$2`.
const MODERATED_MEMORIALS: &str = "SELECT id FROM memorials
     WHERE $2 OR owner_id = $1
        OR id IN (SELECT memorial_id FROM memorial_moderators WHERE user_id = $1)";

/// Row returned when locking entries for a moderation batch.
#[derive(sqlx::FromRow)]
struct LockedEntry {
    id: DbId,
    status_id: i16,
    may_moderate: bool,
}

/// Provides submission, listing and moderation operations for guestbook entries.
pub struct GuestbookRepo;

impl GuestbookRepo {
    /// Insert a submission. Entries created directly as approved get
    /// `moderated_at` stamped with no moderator.
    pub async fn create(
        pool: &PgPool,
        input: &CreateGuestbookEntry,
    ) -> Result<GuestbookEntry, sqlx::Error> {
        let query = format!(
            "INSERT INTO guestbook_entries
                (memorial_id, author_id, author_name, relationship, message, photo_url,
                 status_id, moderated_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, CASE WHEN $7 = $8 THEN NOW() END)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, GuestbookEntry>(&query)
            .bind(input.memorial_id)
            .bind(input.author_id)
            .bind(&input.author_name)
            .bind(&input.relationship)
            .bind(&input.message)
            .bind(&input.photo_url)
            .bind(input.status.id())
            .bind(GuestbookEntryStatus::Approved.id())
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<GuestbookEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM guestbook_entries WHERE id = $1");
        sqlx::query_as::<_, GuestbookEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a memorial's entries, newest first, optionally filtered by status.
    pub async fn list_for_memorial(
        pool: &PgPool,
        memorial_id: DbId,
        status: Option<GuestbookEntryStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GuestbookEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM guestbook_entries
             WHERE memorial_id = $1 AND ($2::SMALLINT IS NULL OR status_id = $2)
             ORDER BY created_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, GuestbookEntry>(&query)
            .bind(memorial_id)
            .bind(status.map(GuestbookEntryStatus::id))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Hard-delete an entry. Returns `true` if the row existed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM guestbook_entries WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Apply one moderation decision to every entry in `entry_ids`, all or
    /// nothing.
    ///
    /// The entries are locked with `SELECT ... FOR UPDATE`; if any id is
    /// missing, not moderatable by `moderator_id`, or no longer pending, the
    /// transaction is rolled back and the first offending id is reported.
    pub async fn moderate(
        pool: &PgPool,
        entry_ids: &[DbId],
        moderator_id: DbId,
        is_admin: bool,
        action: ModerationAction,
        reason: Option<&str>,
    ) -> Result<ModerationOutcome, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let locked = sqlx::query_as::<_, LockedEntry>(&format!(
            "SELECT e.id, e.status_id, e.memorial_id IN ({MODERATED_MEMORIALS}) AS may_moderate
             FROM guestbook_entries e
             WHERE e.id = ANY($3)
             ORDER BY e.id
             FOR UPDATE OF e"
        ))
        .bind(moderator_id)
        .bind(is_admin)
        .bind(entry_ids)
        .fetch_all(&mut *tx)
        .await?;

        if let Some(missing) = entry_ids
            .iter()
            .find(|id| !locked.iter().any(|row| row.id == **id))
        {
            return Ok(ModerationOutcome::NotFound(*missing));
        }
        if let Some(row) = locked.iter().find(|row| !row.may_moderate) {
            return Ok(ModerationOutcome::Forbidden(row.id));
        }
        let target = action.target_status();
        for row in &locked {
            let current = GuestbookEntryStatus::try_from(row.status_id)
                .map_err(|e| sqlx::Error::Decode(Box::new(e)))?;
            if !current.can_transition_to(target) {
                return Ok(ModerationOutcome::NotPending {
                    entry_id: row.id,
                    status: current,
                });
            }
        }

        let query = format!(
            "UPDATE guestbook_entries SET
                status_id = $2,
                moderated_by = $3,
                moderated_at = NOW(),
                moderation_reason = $4
             WHERE id = ANY($1) AND status_id = $5
             RETURNING {COLUMNS}"
        );
        let mut updated = sqlx::query_as::<_, GuestbookEntry>(&query)
            .bind(entry_ids)
            .bind(target.id())
            .bind(moderator_id)
            .bind(reason)
            .bind(GuestbookEntryStatus::Pending.id())
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        updated.sort_by_key(|e| e.id);
        Ok(ModerationOutcome::Applied(updated))
    }

    /// Pending entries across every memorial the user moderates, oldest first.
    pub async fn moderation_queue(
        pool: &PgPool,
        user_id: DbId,
        is_admin: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<GuestbookEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM guestbook_entries
             WHERE status_id = $3 AND memorial_id IN ({MODERATED_MEMORIALS})
             ORDER BY created_at ASC, id ASC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, GuestbookEntry>(&query)
            .bind(user_id)
            .bind(is_admin)
            .bind(GuestbookEntryStatus::Pending.id())
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Entry counts per status across every memorial the user moderates.
    pub async fn moderation_stats(
        pool: &PgPool,
        user_id: DbId,
        is_admin: bool,
    ) -> Result<ModerationStats, sqlx::Error> {
        let rows: Vec<(i16, i64)> = sqlx::query_as(&format!(
            "SELECT status_id, COUNT(*) FROM guestbook_entries
             WHERE memorial_id IN ({MODERATED_MEMORIALS})
             GROUP BY status_id"
        ))
        .bind(user_id)
        .bind(is_admin)
        .fetch_all(pool)
        .await?;

        let mut stats = ModerationStats::default();
        for (status_id, count) in rows {
            match GuestbookEntryStatus::from_id(status_id) {
                Some(GuestbookEntryStatus::Pending) => stats.pending = count,
                Some(GuestbookEntryStatus::Approved) => stats.approved = count,
                Some(GuestbookEntryStatus::Rejected) => stats.rejected = count,
                None => {}
            }
            stats.total += count;
        }
        Ok(stats)
    }
}
