//! Scoped bearer token generation and digests.
//!
//! A token is [`TOKEN_BYTES`] bytes from the thread-local CSPRNG. The client
//! receives those bytes as unpadded URL-safe base64 ([`PLAINTEXT_LEN`]
//! characters); the server stores only the SHA-256 digest of the raw bytes.
//! The random value already carries 128 bits of entropy, so a fast digest is
//! sufficient and lookups stay a single indexed equality match.

use std::fmt;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::types::{DbId, Timestamp};

/// Number of random bytes in a token.
pub const TOKEN_BYTES: usize = 16;

/// Length of the transport encoding of [`TOKEN_BYTES`] bytes.
pub const PLAINTEXT_LEN: usize = 22;

/// Lifetime of an authentication token.
pub const AUTHENTICATION_TTL: Duration = Duration::hours(24);

/// Lifetime of an account activation token.
pub const ACTIVATION_TTL: Duration = Duration::days(3);

/// Lifetime of a password reset token.
pub const PASSWORD_RESET_TTL: Duration = Duration::minutes(45);

/// What a token may be used for. A token minted for one scope never
/// validates for another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TokenScope {
    Activation,
    Authentication,
    PasswordReset,
}

impl TokenScope {
    pub const fn as_str(self) -> &'static str {
        match self {
            TokenScope::Activation => "activation",
            TokenScope::Authentication => "authentication",
            TokenScope::PasswordReset => "password-reset",
        }
    }
}

impl fmt::Display for TokenScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The token text did not have the shape of an issued token.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("token must be {PLAINTEXT_LEN} characters of URL-safe base64")]
pub struct MalformedToken;

/// A freshly generated token. `plaintext` goes to the client once; the rest
/// is what gets persisted.
#[derive(Clone)]
pub struct GeneratedToken {
    pub plaintext: String,
    pub hash: Vec<u8>,
    pub user_id: DbId,
    pub expiry: Timestamp,
    pub scope: TokenScope,
}

impl fmt::Debug for GeneratedToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GeneratedToken")
            .field("plaintext", &"[redacted]")
            .field("user_id", &self.user_id)
            .field("expiry", &self.expiry)
            .field("scope", &self.scope)
            .finish()
    }
}

/// Generate a token for `user_id` that expires `ttl` after `now`.
pub fn generate(user_id: DbId, ttl: Duration, scope: TokenScope, now: Timestamp) -> GeneratedToken {
    let raw: [u8; TOKEN_BYTES] = rand::random();
    GeneratedToken {
        plaintext: URL_SAFE_NO_PAD.encode(raw),
        hash: digest(&raw),
        user_id,
        expiry: now + ttl,
        scope,
    }
}

/// Decode a client-supplied token back into its raw bytes.
///
/// Rejects anything that is not exactly [`PLAINTEXT_LEN`] characters of
/// canonical unpadded URL-safe base64.
pub fn decode(plaintext: &str) -> Result<[u8; TOKEN_BYTES], MalformedToken> {
    if plaintext.len() != PLAINTEXT_LEN {
        return Err(MalformedToken);
    }
    let bytes = URL_SAFE_NO_PAD
        .decode(plaintext)
        .map_err(|_| MalformedToken)?;
    bytes.try_into().map_err(|_| MalformedToken)
}

/// Digest a client-supplied token for lookup.
pub fn hash_plaintext(plaintext: &str) -> Result<Vec<u8>, MalformedToken> {
    decode(plaintext).map(|raw| digest(&raw))
}

fn digest(raw: &[u8]) -> Vec<u8> {
    Sha256::digest(raw).to_vec()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use chrono::Utc;

    #[test]
    fn generated_token_has_transport_shape() {
        let token = generate(42, AUTHENTICATION_TTL, TokenScope::Authentication, Utc::now());
        assert_eq!(token.plaintext.len(), PLAINTEXT_LEN);
        assert_eq!(token.hash.len(), 32);
        assert_eq!(token.user_id, 42);
    }

    #[test]
    fn expiry_is_now_plus_ttl() {
        let now = Utc::now();
        let token = generate(1, ACTIVATION_TTL, TokenScope::Activation, now);
        assert_eq!(token.expiry - now, Duration::days(3));
    }

    #[test]
    fn hash_is_deterministic_and_matches_issue() {
        let token = generate(1, AUTHENTICATION_TTL, TokenScope::Authentication, Utc::now());
        let rehashed = hash_plaintext(&token.plaintext).expect("issued token must decode");
        assert_eq!(rehashed, token.hash);
        assert_eq!(hash_plaintext(&token.plaintext).unwrap(), rehashed);
    }

    #[test]
    fn hash_does_not_contain_plaintext_or_raw_bytes() {
        let token = generate(1, AUTHENTICATION_TTL, TokenScope::Authentication, Utc::now());
        let raw = decode(&token.plaintext).unwrap();
        assert_ne!(&token.hash[..TOKEN_BYTES], &raw[..]);
        assert!(!token
            .hash
            .windows(TOKEN_BYTES)
            .any(|window| window == raw.as_slice()));
        assert!(!token
            .hash
            .windows(PLAINTEXT_LEN)
            .any(|window| window == token.plaintext.as_bytes()));
    }

    #[test]
    fn tokens_are_unique() {
        let a = generate(1, AUTHENTICATION_TTL, TokenScope::Authentication, Utc::now());
        let b = generate(1, AUTHENTICATION_TTL, TokenScope::Authentication, Utc::now());
        assert_ne!(a.plaintext, b.plaintext);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn wrong_length_is_malformed() {
        assert_matches!(decode(""), Err(MalformedToken));
        assert_matches!(decode("abc"), Err(MalformedToken));
        assert_matches!(decode(&"A".repeat(PLAINTEXT_LEN + 1)), Err(MalformedToken));
    }

    #[test]
    fn bad_alphabet_is_malformed() {
        let bad = format!("{}*", "A".repeat(PLAINTEXT_LEN - 1));
        assert_matches!(decode(&bad), Err(MalformedToken));
        let padded = format!("{}==", "A".repeat(PLAINTEXT_LEN - 2));
        assert_matches!(decode(&padded), Err(MalformedToken));
    }

    #[test]
    fn debug_output_redacts_plaintext() {
        let token = generate(7, AUTHENTICATION_TTL, TokenScope::Authentication, Utc::now());
        let debug = format!("{token:?}");
        assert!(!debug.contains(&token.plaintext));
        assert!(debug.contains("[redacted]"));
    }

    #[test]
    fn scope_names_are_stable() {
        assert_eq!(TokenScope::Activation.as_str(), "activation");
        assert_eq!(TokenScope::Authentication.as_str(), "authentication");
        assert_eq!(TokenScope::PasswordReset.to_string(), "password-reset");
    }
}
