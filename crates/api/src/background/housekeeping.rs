//! Periodic cleanup of rate-limit hits and dead sessions.
//!
//! Rate-limit checks already prune their own bucket, but buckets that stop
//! receiving requests keep their rows until this job removes them.

use std::time::Duration;

use gather_core::account::REVOKED_SESSION_RETENTION_HOURS;
use gather_core::rate_limit::{AUTOSAVE_POLICY, GUESTBOOK_POLICY, UNLOCK_POLICY};
use gather_db::repositories::{RateLimitRepo, SessionRepo};
use gather_db::DbPool;
use tokio_util::sync::CancellationToken;

/// How often the cleanup job runs.
const CLEANUP_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Hits older than the longest policy window can no longer affect a decision.
fn max_window_secs() -> i64 {
    [GUESTBOOK_POLICY, AUTOSAVE_POLICY, UNLOCK_POLICY]
        .iter()
        .map(|p| i64::from(p.window_secs))
        .max()
        .unwrap_or_default()
}

/// Run the cleanup loop until `cancel` is triggered.
pub async fn run(pool: DbPool, cancel: CancellationToken) {
    let max_age_secs = max_window_secs();
    tracing::info!(
        max_age_secs,
        interval_secs = CLEANUP_INTERVAL.as_secs(),
        "Housekeeping job started"
    );

    let mut interval = tokio::time::interval(CLEANUP_INTERVAL);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Housekeeping job stopping");
                break;
            }
            _ = interval.tick() => {
                match RateLimitRepo::purge_older_than(&pool, max_age_secs).await {
                    Ok(0) => tracing::debug!("Housekeeping: no rate-limit hits to purge"),
                    Ok(deleted) => tracing::info!(deleted, "Housekeeping: purged rate-limit hits"),
                    Err(e) => tracing::error!(error = %e, "Housekeeping: rate-limit purge failed"),
                }
                let revoked_before =
                    chrono::Utc::now() - chrono::Duration::hours(REVOKED_SESSION_RETENTION_HOURS);
                match SessionRepo::purge_unusable(&pool, revoked_before).await {
                    Ok(0) => {}
                    Ok(deleted) => tracing::info!(deleted, "Housekeeping: removed dead sessions"),
                    Err(e) => tracing::error!(error = %e, "Housekeeping: session cleanup failed"),
                }
            }
        }
    }
}
