//! Refresh-token sessions.
//!
//! A refresh token is single use: exchanging it revokes its row and opens a
//! successor in the same transaction. A revoked row is kept for a while so a
//! replayed token can still be traced back to its owner.

use gather_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::session::{NewSession, RefreshSession};

const COLUMNS: &str = "id, user_id, refresh_token_hash, expires_at, is_revoked, user_agent, created_at";

pub struct SessionRepo;

impl SessionRepo {
    pub async fn open(pool: &PgPool, input: &NewSession<'_>) -> Result<RefreshSession, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at, user_agent)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, RefreshSession>(&query)
            .bind(input.user_id)
            .bind(input.token_hash)
            .bind(input.expires_at)
            .bind(input.user_agent)
            .fetch_one(pool)
            .await
    }

    /// A session that is neither revoked nor expired.
    pub async fn find_live(
        pool: &PgPool,
        token_hash: &str,
    ) -> Result<Option<RefreshSession>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM user_sessions
             WHERE refresh_token_hash = $1 AND NOT is_revoked AND expires_at > NOW()"
        );
        sqlx::query_as::<_, RefreshSession>(&query)
            .bind(token_hash)
            .fetch_optional(pool)
            .await
    }

    /// Exchange a live token for a new one.
    ///
    /// The successor inherits the owner of the presented token. Returns it,
    /// or `None` when `presented_hash` is unknown,
    /// expired or already spent. Two concurrent exchanges of the same token
    /// cannot both succeed.
    pub async fn rotate(
        pool: &PgPool,
        presented_hash: &str,
        next_hash: &str,
        next_expires_at: Timestamp,
        user_agent: Option<&str>,
    ) -> Result<Option<RefreshSession>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let owner: Option<DbId> = sqlx::query_scalar(
            "UPDATE user_sessions SET is_revoked = TRUE
             WHERE refresh_token_hash = $1 AND NOT is_revoked AND expires_at > NOW()
             RETURNING user_id",
        )
        .bind(presented_hash)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(user_id) = owner else {
            return Ok(None);
        };

        let query = format!(
            "INSERT INTO user_sessions (user_id, refresh_token_hash, expires_at, user_agent)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        let successor = sqlx::query_as::<_, RefreshSession>(&query)
            .bind(user_id)
            .bind(next_hash)
            .bind(next_expires_at)
            .bind(user_agent)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(Some(successor))
    }

    /// Owner of a token that was already revoked, for replay detection.
    pub async fn revoked_owner(pool: &PgPool, token_hash: &str) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT user_id FROM user_sessions WHERE refresh_token_hash = $1 AND is_revoked",
        )
        .bind(token_hash)
        .fetch_optional(pool)
        .await
    }

    /// Revoke every live session of a user. Returns how many were live.
    pub async fn end_all_for_user(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let done = sqlx::query(
            "UPDATE user_sessions SET is_revoked = TRUE WHERE user_id = $1 AND NOT is_revoked",
        )
        .bind(user_id)
        .execute(pool)
        .await?;
        Ok(done.rows_affected())
    }

    /// Delete expired sessions, and revoked ones last touched before `revoked_before`.
    pub async fn purge_unusable(pool: &PgPool, revoked_before: Timestamp) -> Result<u64, sqlx::Error> {
        let done = sqlx::query(
            "DELETE FROM user_sessions
             WHERE expires_at < NOW() OR (is_revoked AND updated_at < $1)",
        )
        .bind(revoked_before)
        .execute(pool)
        .await?;
        Ok(done.rows_affected())
    }
}
