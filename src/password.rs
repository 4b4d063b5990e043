//! Password hashing and credential verification.
//!
//! Passwords are stored as argon2id PHC strings. The one exception is the
//! bootstrap admin, which is seeded with a one-time plaintext credential that is
//! accepted by literal comparison until it is rotated into a hash on first use.

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};

#[derive(Debug, thiserror::Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    Hash(String),
}

/// Well-formed hash with default parameters that no password matches. Verified
/// against when the account is unknown so both failure paths do the same work.
const UNKNOWN_ACCOUNT_HASH: &str =
    "$argon2id$v=19$m=19456,t=2,p=1$c29tZXNhbHRzb21lc2FsdA$AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA";

/// Hash a password with argon2id. Returns a PHC-formatted string.
pub fn hash_password(plaintext: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    Argon2::default()
        .hash_password(plaintext.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| PasswordError::Hash(e.to_string()))
}

/// Verify a plaintext password against a PHC hash. Malformed hashes never match.
pub fn verify_password(hash: &str, plaintext: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };

    Argon2::default()
        .verify_password(plaintext.as_bytes(), &parsed)
        .is_ok()
}

/// Whether a stored password value is a PHC hash rather than a seeded literal.
pub fn is_password_hash(stored: &str) -> bool {
    PasswordHash::new(stored).is_ok()
}

/// How a credential was accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialMatch {
    /// Regular argon2 verification.
    Hashed,
    /// Literal match of the bootstrap admin's one-time credential. The caller
    /// must rotate the stored value into a hash.
    BootstrapLiteral,
}

/// Checks login credentials against stored password values.
#[derive(Debug, Clone)]
pub struct CredentialVerifier {
    bootstrap_email: String,
}

impl CredentialVerifier {
    pub fn new(bootstrap_email: impl Into<String>) -> Self {
        Self {
            bootstrap_email: bootstrap_email.into(),
        }
    }

    pub fn verify(&self, email: &str, stored: &str, plaintext: &str) -> Option<CredentialMatch> {
        if email == self.bootstrap_email && !is_password_hash(stored) {
            return (!plaintext.is_empty() && plaintext == stored)
                .then_some(CredentialMatch::BootstrapLiteral);
        }

        verify_password(stored, plaintext).then_some(CredentialMatch::Hashed)
    }

    /// Reject a login for an account that does not exist, at the cost of a
    /// regular verification.
    pub fn verify_unknown(&self, plaintext: &str) -> Option<CredentialMatch> {
        let _ = verify_password(UNKNOWN_ACCOUNT_HASH, plaintext);
        None
    }
}
