//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`tokens`] -- issuing, validating and revoking scoped bearer tokens.

pub mod password;
pub mod tokens;
