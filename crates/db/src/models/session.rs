//! Refresh-token sessions. Only the SHA-256 of a refresh token is stored.

use gather_core::types::{DbId, Timestamp};
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct RefreshSession {
    pub id: DbId,
    pub user_id: DbId,
    pub refresh_token_hash: String,
    pub expires_at: Timestamp,
    pub is_revoked: bool,
    pub user_agent: Option<String>,
    pub created_at: Timestamp,
}

impl RefreshSession {
    /// Whether the token may still be exchanged at `now`.
    pub fn is_live(&self, now: Timestamp) -> bool {
        !self.is_revoked && self.expires_at > now
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NewSession<'a> {
    pub user_id: DbId,
    pub token_hash: &'a str,
    pub expires_at: Timestamp,
    pub user_agent: Option<&'a str>,
}
