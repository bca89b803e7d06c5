//! Argon2id password hashing, verification, and length rules.
//!
//! All password hashes use the Argon2id variant with a cryptographically random
//! salt generated via [`OsRng`]. The PHC string format is used for storage so
//! that algorithm parameters and salt are embedded in the hash itself.
//!
//! Hashing is deliberately slow; async callers go through
//! [`hash_password_blocking`] and [`verify_password_blocking`] so the work
//! runs on the blocking pool instead of a runtime worker.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use forum_core::validation::rule_error;
use validator::ValidationError;

use crate::error::AppError;

/// Shortest accepted password, in bytes.
pub const MIN_PASSWORD_BYTES: usize = 8;

/// Longest accepted password, in bytes.
pub const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a plaintext password using Argon2id with a random salt.
///
/// Returns the PHC-formatted hash string (includes algorithm, params, salt, and hash).
pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default(); // Argon2id with default params
    let hash = argon2.hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// Verify a plaintext password against a stored PHC-formatted Argon2id hash.
///
/// Returns `Ok(true)` if the password matches, `Ok(false)` if it does not.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed_hash = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

pub async fn hash_password_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::InternalError(format!("password hashing task failed: {e}")))?
        .map_err(|e| AppError::InternalError(format!("password hashing failed: {e}")))
}

pub async fn verify_password_blocking(password: String, hash: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| AppError::InternalError(format!("password verification task failed: {e}")))?
        .map_err(|e| AppError::InternalError(format!("password verification failed: {e}")))
}

/// Field rule for new passwords: 8 to 72 bytes.
pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(rule_error("required", "must be provided"));
    }
    if password.len() < MIN_PASSWORD_BYTES {
        return Err(rule_error(
            "length",
            format!("must be at least {MIN_PASSWORD_BYTES} bytes long"),
        ));
    }
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(rule_error(
            "length",
            format!("must not be more than {MAX_PASSWORD_BYTES} bytes long"),
        ));
    }
    Ok(())
}
