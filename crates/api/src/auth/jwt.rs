//! Signed access tokens and opaque refresh tokens.
//!
//! An access token is an HS256 JWT naming the account and its role. A
//! refresh token is a random string the server only ever stores hashed.

use std::fmt;

use chrono::{Duration, Utc};
use gather_core::account::{generate_token, REFRESH_TOKEN_LENGTH};
use gather_core::hashing::sha256_hex;
use gather_core::types::DbId;
use jsonwebtoken::errors::Error as JwtError;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Signing secret and token lifetimes.
#[derive(Clone)]
pub struct JwtConfig {
    secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtConfig")
            .field("secret", &"<redacted>")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

impl JwtConfig {
    pub const DEFAULT_ACCESS_MINS: i64 = 15;
    pub const DEFAULT_REFRESH_DAYS: i64 = 7;

    /// A config with the default lifetimes.
    pub fn with_secret(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            access_ttl: Duration::minutes(Self::DEFAULT_ACCESS_MINS),
            refresh_ttl: Duration::days(Self::DEFAULT_REFRESH_DAYS),
        }
    }

    /// Reads `JWT_SECRET` (required), `JWT_ACCESS_EXPIRY_MINS` and
    /// `JWT_REFRESH_EXPIRY_DAYS`.
    ///
    /// # Panics
    ///
    /// On a missing or empty secret, or a lifetime that is not a positive
    /// integer. Called once at startup.
    pub fn from_env() -> Self {
        let secret = std::env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
            .expect("JWT_SECRET must be set to a non-empty value");

        Self {
            access_ttl: Duration::minutes(positive_env(
                "JWT_ACCESS_EXPIRY_MINS",
                Self::DEFAULT_ACCESS_MINS,
            )),
            refresh_ttl: Duration::days(positive_env(
                "JWT_REFRESH_EXPIRY_DAYS",
                Self::DEFAULT_REFRESH_DAYS,
            )),
            ..Self::with_secret(secret)
        }
    }

    pub(crate) fn encoding_key(&self) -> EncodingKey {
        EncodingKey::from_secret(self.secret.as_bytes())
    }

    pub(crate) fn decoding_key(&self) -> DecodingKey {
        DecodingKey::from_secret(self.secret.as_bytes())
    }
}

fn positive_env(name: &str, default: i64) -> i64 {
    match std::env::var(name) {
        Ok(raw) => match raw.trim().parse::<i64>() {
            Ok(n) if n > 0 => n,
            _ => panic!("{name} must be a positive integer, got {raw:?}"),
        },
        Err(_) => default,
    }
}

/// Payload of an access token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessClaims {
    pub sub: DbId,
    pub role: String,
    pub iat: i64,
    pub exp: i64,
    pub jti: Uuid,
}

pub fn issue_access_token(user_id: DbId, role: &str, config: &JwtConfig) -> Result<String, JwtError> {
    issue_access_token_at(user_id, role, Utc::now().timestamp(), config)
}

/// Issue a token as if it were signed at `issued_at` (Unix seconds).
pub fn issue_access_token_at(
    user_id: DbId,
    role: &str,
    issued_at: i64,
    config: &JwtConfig,
) -> Result<String, JwtError> {
    let claims = AccessClaims {
        sub: user_id,
        role: role.to_owned(),
        iat: issued_at,
        exp: issued_at + config.access_ttl.num_seconds(),
        jti: Uuid::new_v4(),
    };
    jsonwebtoken::encode(&Header::default(), &claims, &config.encoding_key())
}

/// Check signature and expiry, then hand back the claims.
pub fn decode_access_token(token: &str, config: &JwtConfig) -> Result<AccessClaims, JwtError> {
    jsonwebtoken::decode::<AccessClaims>(token, &config.decoding_key(), &Validation::default())
        .map(|data| data.claims)
}

/// A freshly minted refresh token. `plaintext` goes to the client once;
/// `hash` is what `user_sessions` keeps.
#[derive(Debug)]
pub struct RefreshToken {
    pub plaintext: String,
    pub hash: String,
}

impl RefreshToken {
    pub fn generate() -> Self {
        let plaintext = generate_token(REFRESH_TOKEN_LENGTH);
        let hash = Self::hash_of(&plaintext);
        Self { plaintext, hash }
    }

    pub fn hash_of(plaintext: &str) -> String {
        sha256_hex(plaintext.as_bytes())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use jsonwebtoken::errors::ErrorKind;

    fn config() -> JwtConfig {
        JwtConfig::with_secret("access-token-unit-test-secret")
    }

    #[test]
    fn claims_carry_identity_and_lifetime() {
        let token = issue_access_token(42, "admin", &config()).unwrap();
        let claims = decode_access_token(&token, &config()).unwrap();

        assert_eq!(claims.sub, 42);
        assert_eq!(claims.role, "admin");
        assert_eq!(claims.exp - claims.iat, 15 * 60);
    }

    #[test]
    fn every_token_gets_its_own_id() {
        let a = decode_access_token(&issue_access_token(1, "member", &config()).unwrap(), &config());
        let b = decode_access_token(&issue_access_token(1, "member", &config()).unwrap(), &config());
        assert_ne!(a.unwrap().jti, b.unwrap().jti);
    }

    #[test]
    fn stale_token_is_rejected() {
        // Past the validator's 60 second leeway.
        let issued = Utc::now().timestamp() - 15 * 60 - 120;
        let token = issue_access_token_at(1, "member", issued, &config()).unwrap();

        let err = decode_access_token(&token, &config()).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::ExpiredSignature);
    }

    #[test]
    fn foreign_secret_is_rejected() {
        let token = issue_access_token(1, "member", &JwtConfig::with_secret("someone-else")).unwrap();

        let err = decode_access_token(&token, &config()).unwrap_err();
        assert_matches!(err.kind(), ErrorKind::InvalidSignature);
    }

    #[test]
    fn refresh_token_hash_is_stable() {
        let token = RefreshToken::generate();

        assert_eq!(token.plaintext.len(), REFRESH_TOKEN_LENGTH);
        assert_eq!(token.hash.len(), 64);
        assert_eq!(RefreshToken::hash_of(&token.plaintext), token.hash);
        assert_ne!(RefreshToken::generate().plaintext, token.plaintext);
    }

    #[test]
    fn debug_output_hides_the_secret() {
        let rendered = format!("{:?}", config());
        assert!(!rendered.contains("unit-test-secret"));
    }
}
