//! Argon2id hashes for account and memorial passwords, stored in PHC form.

use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{Error as HashError, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Hash of a throwaway secret, verified against when a login names no
/// account so that unknown and known usernames cost the same.
static DECOY_HASH: LazyLock<Option<String>> =
    LazyLock::new(|| hash_password("decoy-password-never-matches").ok());

pub fn hash_password(plain: &str) -> Result<String, HashError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(plain.as_bytes(), &salt)
        .map(|phc| phc.to_string())
}

/// `Ok(false)` on a mismatch. A stored value that is not a PHC string is an
/// error, not a mismatch.
pub fn verify_password(plain: &str, stored: &str) -> Result<bool, HashError> {
    let parsed = PasswordHash::new(stored)?;
    match Argon2::default().verify_password(plain.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(HashError::Password) => Ok(false),
        Err(other) => Err(other),
    }
}

/// Spend one verification's worth of work and discard the result.
pub fn verify_decoy(plain: &str) {
    if let Some(decoy) = DECOY_HASH.as_deref() {
        let _ = verify_password(plain, decoy);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hashes_are_salted_argon2id() {
        let first = hash_password("correct-horse-battery-staple").unwrap();
        let second = hash_password("correct-horse-battery-staple").unwrap();

        assert!(first.starts_with("$argon2id$"));
        assert_ne!(first, second);
        assert!(verify_password("correct-horse-battery-staple", &first).unwrap());
        assert!(verify_password("correct-horse-battery-staple", &second).unwrap());
    }

    #[test]
    fn mismatch_is_false_not_error() {
        let stored = hash_password("rosebud").unwrap();
        assert!(!verify_password("Rosebud", &stored).unwrap());
    }

    #[test]
    fn garbage_stored_value_is_an_error() {
        assert!(verify_password("anything", "plaintext-from-an-old-row").is_err());
    }

    #[test]
    fn decoy_hash_is_usable() {
        let decoy = DECOY_HASH.as_deref().unwrap();
        assert!(!verify_password("guess", decoy).unwrap());
        verify_decoy("guess");
    }
}
