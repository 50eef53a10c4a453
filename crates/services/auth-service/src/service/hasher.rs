//! Password hashing primitive.

use common::AppResult;
use domain::Password;

#[cfg(any(test, feature = "test-utils"))]
use mockall::automock;

/// One-way hash plus constant-time verify.
#[cfg_attr(any(test, feature = "test-utils"), automock)]
pub trait CredentialHasher: Send + Sync {
    /// Hash a plain text password for storage.
    fn hash(&self, plain_text: &str) -> AppResult<String>;

    /// Check a plain text password against a stored hash.
    fn verify(&self, plain_text: &str, hash: &str) -> bool;
}

/// Argon2id hasher backed by the domain [`Password`] value object.
#[derive(Debug, Default, Clone, Copy)]
pub struct Argon2Hasher;

impl CredentialHasher for Argon2Hasher {
    fn hash(&self, plain_text: &str) -> AppResult<String> {
        Ok(Password::new(plain_text)?.into_string())
    }

    fn verify(&self, plain_text: &str, hash: &str) -> bool {
        Password::from_hash(hash).verify(plain_text)
    }
}
