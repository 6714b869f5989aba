//! Repository for the `memorial_moderators` table.

use gather_core::types::DbId;
use sqlx::PgPool;

use crate::models::moderator::{MemorialModerator, ModeratorListing};

const COLUMNS: &str = "id, memorial_id, user_id, added_by, created_at, updated_at";

/// Delegated moderation rights per memorial.
pub struct MemorialModeratorRepo;

impl MemorialModeratorRepo {
    /// Grant `user_id` moderation rights on a memorial.
    ///
    /// A duplicate grant violates `uq_memorial_moderators_memorial_user`.
    pub async fn add(
        pool: &PgPool,
        memorial_id: DbId,
        user_id: DbId,
        added_by: DbId,
    ) -> Result<MemorialModerator, sqlx::Error> {
        let query = format!(
            "INSERT INTO memorial_moderators (memorial_id, user_id, added_by)
             VALUES ($1, $2, $3)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MemorialModerator>(&query)
            .bind(memorial_id)
            .bind(user_id)
            .bind(added_by)
            .fetch_one(pool)
            .await
    }

    /// Revoke moderation rights. Returns `true` if a grant existed.
    pub async fn remove(pool: &PgPool, memorial_id: DbId, user_id: DbId) -> Result<bool, sqlx::Error> {
        let result =
            sqlx::query("DELETE FROM memorial_moderators WHERE memorial_id = $1 AND user_id = $2")
                .bind(memorial_id)
                .bind(user_id)
                .execute(pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn is_moderator(
        pool: &PgPool,
        memorial_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM memorial_moderators WHERE memorial_id = $1 AND user_id = $2
             )",
        )
        .bind(memorial_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// List a memorial's moderators with their public identity.
    pub async fn list_for_memorial(
        pool: &PgPool,
        memorial_id: DbId,
    ) -> Result<Vec<ModeratorListing>, sqlx::Error> {
        sqlx::query_as::<_, ModeratorListing>(
            "SELECT mm.user_id, u.username, u.display_name, mm.added_by, mm.created_at
             FROM memorial_moderators mm
             JOIN users u ON u.id = mm.user_id
             WHERE mm.memorial_id = $1
             ORDER BY mm.created_at ASC",
        )
        .bind(memorial_id)
        .fetch_all(pool)
        .await
    }
}
