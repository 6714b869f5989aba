//! Repository for the `blocked_users` table.

use gather_core::guestbook::BLOCKED_AUTHOR_REASON;
use gather_core::status::GuestbookEntryStatus;
use gather_core::types::DbId;
use sqlx::PgPool;

use crate::models::blocked_user::{BlockResult, BlockedUser};
use crate::models::guestbook::GuestbookEntry;

const COLUMNS: &str = "id, owner_id, blocked_user_id, reason, created_at, updated_at";

const ENTRY_COLUMNS: &str = "id, memorial_id, author_id, author_name, relationship, message, \
                              photo_url, status_id, moderated_by, moderated_at, moderation_reason, \
                              created_at, updated_at";

/// Owner-scoped user blocks.
pub struct BlockedUserRepo;

impl BlockedUserRepo {
    /// Block `blocked_user_id` from every memorial `owner_id` owns.
    ///
    /// In one transaction: upserts the block row (re-blocking keeps the
    /// original row and refreshes the reason) and rejects all of that user's
    /// still-pending entries on the owner's memorials.
    pub async fn block(
        pool: &PgPool,
        owner_id: DbId,
        blocked_user_id: DbId,
        reason: Option<&str>,
    ) -> Result<BlockResult, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO blocked_users (owner_id, blocked_user_id, reason)
             VALUES ($1, $2, $3)
             ON CONFLICT ON CONSTRAINT uq_blocked_users_owner_blocked
             DO UPDATE SET reason = COALESCE(EXCLUDED.reason, blocked_users.reason)
             RETURNING {COLUMNS}"
        );
        let block = sqlx::query_as::<_, BlockedUser>(&query)
            .bind(owner_id)
            .bind(blocked_user_id)
            .bind(reason)
            .fetch_one(&mut *tx)
            .await?;

        let query = format!(
            "UPDATE guestbook_entries SET
                status_id = $3,
                moderated_by = $1,
                moderated_at = NOW(),
                moderation_reason = $5
             WHERE author_id = $2
               AND status_id = $4
               AND memorial_id IN (SELECT id FROM memorials WHERE owner_id = $1)
             RETURNING {ENTRY_COLUMNS}"
        );
        let rejected_entries = sqlx::query_as::<_, GuestbookEntry>(&query)
            .bind(owner_id)
            .bind(blocked_user_id)
            .bind(GuestbookEntryStatus::Rejected.id())
            .bind(GuestbookEntryStatus::Pending.id())
            .bind(BLOCKED_AUTHOR_REASON)
            .fetch_all(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(BlockResult {
            block,
            rejected_entries,
        })
    }

    /// Remove a block. Returns `true` if one existed.
    pub async fn unblock(
        pool: &PgPool,
        owner_id: DbId,
        blocked_user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM blocked_users WHERE owner_id = $1 AND blocked_user_id = $2")
                .bind(owner_id)
                .bind(blocked_user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Whether `owner_id` has blocked `user_id`.
    pub async fn is_blocked(
        pool: &PgPool,
        owner_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM blocked_users WHERE owner_id = $1 AND blocked_user_id = $2
             )",
        )
        .bind(owner_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// List an owner's blocks, newest first.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_id: DbId,
    ) -> Result<Vec<BlockedUser>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM blocked_users WHERE owner_id = $1 ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, BlockedUser>(&query)
            .bind(owner_id)
            .fetch_all(pool)
            .await
    }
}
