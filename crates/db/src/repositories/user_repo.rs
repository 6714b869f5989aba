//! Accounts, always read together with their role name.

use gather_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::user::{NewUser, User};

const SELECT: &str = "SELECT u.id, u.username, u.email, u.display_name, u.password_hash, \
                      u.role_id, r.name AS role, u.is_active, u.last_login_at, \
                      u.failed_login_count, u.locked_until, u.created_at, u.updated_at";

pub struct UserRepo;

impl UserRepo {
    /// Insert an account and read it back joined with its role.
    pub async fn create(pool: &PgPool, input: &NewUser<'_>) -> Result<User, sqlx::Error> {
        let query = format!(
            "WITH u AS (
                INSERT INTO users (username, email, display_name, password_hash, role_id)
                VALUES ($1, $2, $3, $4, $5)
                RETURNING *
             )
             {SELECT} FROM u JOIN roles r ON r.id = u.role_id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(input.username)
            .bind(input.email)
            .bind(input.display_name)
            .bind(input.password_hash)
            .bind(input.role_id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("{SELECT} FROM users u JOIN roles r ON r.id = u.role_id WHERE u.id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Resolve a login name: an exact username, or an email in any case.
    pub async fn find_by_login(pool: &PgPool, login: &str) -> Result<Option<User>, sqlx::Error> {
        let query = format!(
            "{SELECT} FROM users u JOIN roles r ON r.id = u.role_id
             WHERE u.username = $1 OR lower(u.email) = lower($1)
             ORDER BY (u.username = $1) DESC
             LIMIT 1"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(login)
            .fetch_optional(pool)
            .await
    }

    pub async fn email_taken(pool: &PgPool, email: &str) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE lower(email) = lower($1))")
            .bind(email)
            .fetch_one(pool)
            .await
    }

    /// Count a failed password in one statement.
    ///
    /// Reaching `max_failures` locks the account for `lockout_mins` and
    /// restarts the count. Returns the lock expiry when this failure set it.
    pub async fn register_failed_login(
        pool: &PgPool,
        id: DbId,
        max_failures: i32,
        lockout_mins: i32,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        let row: Option<(bool, Option<Timestamp>)> = sqlx::query_as(
            "UPDATE users SET
                failed_login_count = CASE
                    WHEN failed_login_count + 1 >= $2 THEN 0
                    ELSE failed_login_count + 1
                END,
                locked_until = CASE
                    WHEN failed_login_count + 1 >= $2 THEN NOW() + make_interval(mins => $3)
                    ELSE locked_until
                END
             WHERE id = $1
             RETURNING failed_login_count = 0, locked_until",
        )
        .bind(id)
        .bind(max_failures)
        .bind(lockout_mins)
        .fetch_optional(pool)
        .await?;

        Ok(row.and_then(|(just_locked, until)| if just_locked { until } else { None }))
    }

    /// Clear the failure counter and lock, and stamp `last_login_at`.
    pub async fn record_login(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE users
             SET failed_login_count = 0, locked_until = NULL, last_login_at = NOW()
             WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
