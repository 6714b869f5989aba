//! Sliding-window rate-limit policies and decision maths.
//!
//! The hit store lives in Postgres (`rate_limit_hits`); this module only
//! decides, given the hits still inside the window, whether another request
//! is allowed and how long the caller has to wait otherwise.

use chrono::Duration;

use crate::error::CoreError;
use crate::types::{DbId, Timestamp};

/// A fixed number of requests per sliding window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitPolicy {
    pub max_requests: u32,
    pub window_secs: u32,
}

/// Guestbook submissions: 5 per user per minute.
pub const GUESTBOOK_POLICY: RateLimitPolicy = RateLimitPolicy {
    max_requests: 5,
    window_secs: 60,
};

/// Autosave writes: 30 per user+memorial per minute.
pub const AUTOSAVE_POLICY: RateLimitPolicy = RateLimitPolicy {
    max_requests: 30,
    window_secs: 60,
};

/// Memorial password attempts: 10 per memorial per 15 minutes, whoever
/// is guessing.
pub const UNLOCK_POLICY: RateLimitPolicy = RateLimitPolicy {
    max_requests: 10,
    window_secs: 15 * 60,
};

impl RateLimitPolicy {
    pub fn window(&self) -> Duration {
        Duration::seconds(i64::from(self.window_secs))
    }

    /// Hits at or before this instant have left the window.
    pub fn window_start(&self, now: Timestamp) -> Timestamp {
        now - self.window()
    }

    /// Decide on a request given the timestamps of hits still in the window.
    ///
    /// `oldest_hit` is the earliest of those hits; it determines when a slot
    /// frees up.
    pub fn decide(
        &self,
        hits_in_window: i64,
        oldest_hit: Option<Timestamp>,
        now: Timestamp,
    ) -> RateLimitDecision {
        if hits_in_window < i64::from(self.max_requests) {
            return RateLimitDecision::Allowed {
                remaining: (i64::from(self.max_requests) - hits_in_window - 1).max(0) as u32,
            };
        }
        let retry_after_secs = match oldest_hit {
            Some(oldest) => {
                let frees_at = oldest + self.window();
                let millis = (frees_at - now).num_milliseconds().max(0);
                // Round up so the client never retries a moment too early.
                ((millis + 999) / 1000).max(1) as u64
            }
            None => u64::from(self.window_secs),
        };
        RateLimitDecision::Limited { retry_after_secs }
    }
}

/// Result of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed { remaining: u32 },
    Limited { retry_after_secs: u64 },
}

impl RateLimitDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitDecision::Allowed { .. })
    }

    /// Convert into a `Result`, mapping a refusal to [`CoreError::RateLimited`].
    pub fn into_result(self) -> Result<(), CoreError> {
        match self {
            RateLimitDecision::Allowed { .. } => Ok(()),
            RateLimitDecision::Limited { retry_after_secs } => {
                Err(CoreError::RateLimited { retry_after_secs })
            }
        }
    }
}

/// Bucket key for guestbook submissions.
pub fn guestbook_bucket(user_id: DbId) -> String {
    format!("guestbook:{user_id}")
}

/// Bucket key for autosave writes.
pub fn autosave_bucket(user_id: DbId, memorial_id: DbId) -> String {
    format!("autosave:{user_id}:{memorial_id}")
}

/// Bucket key for password attempts against one memorial.
pub fn memorial_unlock_bucket(memorial_id: DbId) -> String {
    format!("memorial_unlock:{memorial_id}")
}
