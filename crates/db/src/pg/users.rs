//! User table bindings and lookups.

use async_trait::async_trait;
use forum_core::tokens::TokenScope;
use forum_core::types::Timestamp;

use super::{PgDb, PgQueryAs, PgResource};
use crate::error::StoreError;
use crate::models::user::{NewUser, User};
use crate::store::UserStore;

/// `email` is CITEXT; it is read back as text.
const COLUMNS: &str =
    "users.id, users.created_at, users.name, users.email::text AS email, users.password_hash, \
     users.activated, users.version";

impl PgResource for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static str = COLUMNS;
    const INSERT_COLUMNS: &'static [&'static str] = &["name", "email", "password_hash", "activated"];
    const UPDATE_COLUMNS: &'static [&'static str] = &["name", "email", "password_hash", "activated"];

    fn bind_draft<'q, O>(draft: &'q NewUser, query: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        query
            .bind(&draft.name)
            .bind(&draft.email)
            .bind(&draft.password_hash)
            .bind(draft.activated)
    }

    fn bind_update<'q, O>(&'q self, query: PgQueryAs<'q, O>) -> PgQueryAs<'q, O> {
        query
            .bind(&self.name)
            .bind(&self.email)
            .bind(&self.password_hash)
            .bind(self.activated)
    }
}

#[async_trait]
impl UserStore for PgDb {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE users.email = $1::citext");
        self.timed(
            sqlx::query_as::<_, User>(&query)
                .bind(email)
                .fetch_optional(self.pool()),
        )
        .await
    }

    async fn get_for_token(
        &self,
        scope: TokenScope,
        hash: &[u8],
        now: Timestamp,
    ) -> Result<Option<User>, StoreError> {
        let query = format!(
            "SELECT {COLUMNS} FROM users
             INNER JOIN tokens ON tokens.user_id = users.id
             WHERE tokens.hash = $1 AND tokens.scope = $2 AND tokens.expiry > $3"
        );
        self.timed(
            sqlx::query_as::<_, User>(&query)
                .bind(hash)
                .bind(scope.as_str())
                .bind(now)
                .fetch_optional(self.pool()),
        )
        .await
    }
}
