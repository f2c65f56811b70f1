//! Account validation and salted SHA-256 password digests

use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::error::{ChatError, ChatResult};

pub const MIN_PASSWORD_LEN: usize = 8;

const SALT_LEN: usize = 16;

/// Lookup key for an email address
pub(super) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Check a registration and return the normalized email
pub(super) fn validate_registration(email: &str, password: &str) -> ChatResult<String> {
    let key = normalize_email(email);
    if key.is_empty() || !key.contains('@') {
        return Err(ChatError::auth("invalid email address"));
    }
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ChatError::auth(format!(
            "password must be at least {} characters",
            MIN_PASSWORD_LEN
        )));
    }
    Ok(key)
}

pub(super) fn new_salt() -> String {
    let mut salt = [0u8; SALT_LEN];
    rand::thread_rng().fill_bytes(&mut salt);
    hex::encode(salt)
}

pub(super) fn password_digest(salt: &str, password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}

pub(super) fn duplicate_account() -> ChatError {
    ChatError::auth("an account with this email already exists")
}

pub(super) fn invalid_credentials() -> ChatError {
    ChatError::auth("invalid credentials")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_registration() {
        assert_eq!(
            validate_registration("  Ada@Example.com ", "password1").unwrap(),
            "ada@example.com"
        );
        assert!(validate_registration("not-an-email", "password1").is_err());
        assert!(validate_registration("", "password1").is_err());
        assert!(validate_registration("a@b.c", "short").is_err());
        // counted in chars, not bytes
        assert!(validate_registration("a@b.c", "ééééééé").is_err());
    }

    #[test]
    fn test_digest_depends_on_salt() {
        let a = new_salt();
        let b = new_salt();
        assert_eq!(a.len(), SALT_LEN * 2);
        assert_ne!(a, b);
        assert_ne!(password_digest(&a, "pw"), password_digest(&b, "pw"));
        assert_eq!(password_digest(&a, "pw"), password_digest(&a, "pw"));
    }
}
