//! Token digests.

use async_trait::async_trait;
use forum_core::tokens::{GeneratedToken, TokenScope};
use forum_core::types::{DbId, Timestamp};

use super::PgDb;
use crate::error::StoreError;
use crate::store::TokenStore;

#[async_trait]
impl TokenStore for PgDb {
    async fn insert(&self, token: &GeneratedToken) -> Result<(), StoreError> {
        self.timed(
            sqlx::query(
                "INSERT INTO tokens (hash, user_id, expiry, scope) VALUES ($1, $2, $3, $4)",
            )
            .bind(&token.hash)
            .bind(token.user_id)
            .bind(token.expiry)
            .bind(token.scope.as_str())
            .execute(self.pool()),
        )
        .await?;
        Ok(())
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: DbId,
    ) -> Result<u64, StoreError> {
        let result = self
            .timed(
                sqlx::query("DELETE FROM tokens WHERE scope = $1 AND user_id = $2")
                    .bind(scope.as_str())
                    .bind(user_id)
                    .execute(self.pool()),
            )
            .await?;
        Ok(result.rows_affected())
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let result = self
            .timed(
                sqlx::query("DELETE FROM tokens WHERE expiry <= $1")
                    .bind(now)
                    .execute(self.pool()),
            )
            .await?;
        Ok(result.rows_affected())
    }
}
