//! Token issuance, validation and revocation.
//!
//! [`TokenService`] ties the pure token functions in `forum_core::tokens` to
//! the token and user stores and to the injected [`Clock`]. Plaintexts leave
//! this module exactly once, inside the [`GeneratedToken`] returned by
//! [`TokenService::issue`], and are never logged.

use std::sync::Arc;

use chrono::Duration;
use forum_core::clock::Clock;
use forum_core::tokens::{self, GeneratedToken, MalformedToken, TokenScope};
use forum_core::types::DbId;
use forum_db::models::user::User;
use forum_db::store::{TokenStore, UserStore};
use forum_db::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// The presented text cannot be an issued token. No lookup was made.
    #[error(transparent)]
    Malformed(#[from] MalformedToken),

    #[error(transparent)]
    Store(#[from] StoreError),
}

pub struct TokenService {
    tokens: Arc<dyn TokenStore>,
    users: Arc<dyn UserStore>,
    clock: Arc<dyn Clock>,
}

impl TokenService {
    pub fn new(tokens: Arc<dyn TokenStore>, users: Arc<dyn UserStore>, clock: Arc<dyn Clock>) -> Self {
        Self {
            tokens,
            users,
            clock,
        }
    }

    /// Mint and persist a token for `user_id` valid for `ttl`.
    pub async fn issue(
        &self,
        user_id: DbId,
        ttl: Duration,
        scope: TokenScope,
    ) -> Result<GeneratedToken, StoreError> {
        let token = tokens::generate(user_id, ttl, scope, self.clock.now());
        self.tokens.insert(&token).await?;
        tracing::debug!(user_id, %scope, expiry = %token.expiry, "Issued token");
        Ok(token)
    }

    /// Resolve `plaintext` to the owning user.
    ///
    /// `Ok(None)` covers unknown, expired and wrong-scope tokens alike.
    /// Malformed input is rejected before any store access.
    pub async fn validate(
        &self,
        plaintext: &str,
        scope: TokenScope,
    ) -> Result<Option<User>, TokenError> {
        let hash = tokens::hash_plaintext(plaintext)?;
        let user = self
            .users
            .get_for_token(scope, &hash, self.clock.now())
            .await?;
        Ok(user)
    }

    /// Delete every token of `user_id` in `scope`. Idempotent.
    pub async fn revoke_all(&self, user_id: DbId, scope: TokenScope) -> Result<u64, StoreError> {
        let removed = self.tokens.delete_all_for_user(scope, user_id).await?;
        tracing::debug!(user_id, %scope, removed, "Revoked tokens");
        Ok(removed)
    }

    /// Delete tokens that have already expired.
    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.tokens.delete_expired(self.clock.now()).await
    }
}
