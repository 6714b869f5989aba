//! Short-lived tokens proving a visitor entered a memorial's password.
//!
//! Signed with the same HS256 secret as access tokens but carrying a
//! distinct claim shape and scope, so neither token type decodes as the
//! other.

use gather_core::types::DbId;
use jsonwebtoken::{decode, encode, Header, Validation};
use serde::{Deserialize, Serialize};

use crate::auth::jwt::JwtConfig;

const MEMORIAL_ACCESS_SCOPE: &str = "memorial_access";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MemorialAccessClaims {
    pub memorial_id: DbId,
    pub scope: String,
    pub exp: i64,
    pub iat: i64,
}

/// Issue an unlock token for `memorial_id`, valid for `expiry_mins`.
pub fn generate_memorial_access_token(
    memorial_id: DbId,
    expiry_mins: i64,
    config: &JwtConfig,
) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now().timestamp();
    let claims = MemorialAccessClaims {
        memorial_id,
        scope: MEMORIAL_ACCESS_SCOPE.to_string(),
        exp: now + expiry_mins * 60,
        iat: now,
    };
    encode(
        &Header::default(),
        &claims,
        &config.encoding_key(),
    )
}

/// Whether `token` is a valid, unexpired unlock token for `memorial_id`.
pub fn token_unlocks(token: &str, memorial_id: DbId, config: &JwtConfig) -> bool {
    decode::<MemorialAccessClaims>(
        token,
        &config.decoding_key(),
        &Validation::default(),
    )
    .map(|data| {
        data.claims.scope == MEMORIAL_ACCESS_SCOPE && data.claims.memorial_id == memorial_id
    })
    .unwrap_or(false)
}
