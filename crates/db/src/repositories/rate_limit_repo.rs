//! Shared sliding-window rate-limit store (`rate_limit_hits`).
//!
//! Checks for one bucket are serialized with a transaction-scoped advisory
//! lock, so concurrent requests across server instances see a consistent
//! count.

use gather_core::rate_limit::{RateLimitDecision, RateLimitPolicy};
use gather_core::types::Timestamp;
use sqlx::PgPool;

pub struct RateLimitRepo;

impl RateLimitRepo {
    /// Check `bucket` against `policy`, recording a hit only when allowed.
    pub async fn check_and_record(
        pool: &PgPool,
        bucket: &str,
        policy: &RateLimitPolicy,
    ) -> Result<RateLimitDecision, sqlx::Error> {
        let mut tx = pool.begin().await?;

        sqlx::query("SELECT pg_advisory_xact_lock(hashtext($1))")
            .bind(bucket)
            .execute(&mut *tx)
            .await?;

        let now: Timestamp = sqlx::query_scalar("SELECT clock_timestamp()")
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM rate_limit_hits WHERE bucket = $1 AND hit_at <= $2")
            .bind(bucket)
            .bind(policy.window_start(now))
            .execute(&mut *tx)
            .await?;

        let (count, oldest): (i64, Option<Timestamp>) = sqlx::query_as(
            "SELECT COUNT(*), MIN(hit_at) FROM rate_limit_hits WHERE bucket = $1",
        )
        .bind(bucket)
        .fetch_one(&mut *tx)
        .await?;

        let decision = policy.decide(count, oldest, now);
        if decision.is_allowed() {
            sqlx::query("INSERT INTO rate_limit_hits (bucket, hit_at) VALUES ($1, $2)")
                .bind(bucket)
                .bind(now)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(decision)
    }

    /// Delete hits older than `max_age_secs` across all buckets.
    pub async fn purge_older_than(pool: &PgPool, max_age_secs: i64) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM rate_limit_hits WHERE hit_at < NOW() - make_interval(secs => $1)",
        )
        .bind(max_age_secs as f64)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
