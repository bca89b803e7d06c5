//! Storage traits.
//!
//! Every mutable resource goes through [`ResourceStore`], whose `update` is a
//! compare-and-set on the row's `version`: it succeeds only when the caller's
//! copy carries the stored version, and then bumps the version by exactly one.
//! A losing writer gets [`StoreError::EditConflict`] and nothing changes.
//!
//! Handlers only see `Arc<dyn …>` trait objects bundled in [`Stores`]; the
//! backend is chosen once at startup.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use forum_core::filters::ListQuery;
use forum_core::permissions::Permissions;
use forum_core::tokens::{GeneratedToken, TokenScope};
use forum_core::types::{DbId, Timestamp};

use crate::error::StoreError;
use crate::memory::MemoryDb;
use crate::models::comment::{Comment, NewComment};
use crate::models::forum::{Forum, NewForum};
use crate::models::user::{NewUser, User};
use crate::pg::PgDb;
use crate::DbPool;

/// A resource carrying an optimistic-concurrency version.
pub trait Versioned: Clone + Send + Sync + 'static {
    /// Entity name used in errors and logs.
    const ENTITY: &'static str;

    /// Caller-supplied columns for an insert.
    type Draft: Send + Sync;

    fn id(&self) -> DbId;
    fn version(&self) -> i32;
}

impl Versioned for Forum {
    const ENTITY: &'static str = "forum";
    type Draft = NewForum;

    fn id(&self) -> DbId {
        self.id
    }
    fn version(&self) -> i32 {
        self.version
    }
}

impl Versioned for Comment {
    const ENTITY: &'static str = "comment";
    type Draft = NewComment;

    fn id(&self) -> DbId {
        self.id
    }
    fn version(&self) -> i32 {
        self.version
    }
}

impl Versioned for User {
    const ENTITY: &'static str = "user";
    type Draft = NewUser;

    fn id(&self) -> DbId {
        self.id
    }
    fn version(&self) -> i32 {
        self.version
    }
}

/// Version-checked CRUD plus filtered listing.
#[async_trait]
pub trait ResourceStore<T: Versioned>: Send + Sync {
    /// Insert a new row. The stored resource has a fresh id and version 1.
    async fn insert(&self, draft: &T::Draft) -> Result<T, StoreError>;

    /// Ids below 1 are reported as not found without touching storage.
    async fn get(&self, id: DbId) -> Result<T, StoreError>;

    /// Persist `resource` if its version still matches the stored one.
    ///
    /// Returns the stored resource with the bumped version. When nothing was
    /// written, fails with `EditConflict` if the row still exists and
    /// `NotFound` otherwise.
    async fn update(&self, resource: &T) -> Result<T, StoreError>;

    /// Unconditional delete.
    async fn delete(&self, id: DbId) -> Result<(), StoreError>;

    /// One page of matching rows plus the total number of matches before
    /// paging. Ties in the sort column are broken by `id` ascending.
    async fn list(&self, query: &ListQuery) -> Result<(Vec<T>, i64), StoreError>;
}

#[async_trait]
pub trait UserStore: ResourceStore<User> {
    /// Case-insensitive lookup.
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// Owner of an unexpired token with this digest and scope.
    async fn get_for_token(
        &self,
        scope: TokenScope,
        hash: &[u8],
        now: Timestamp,
    ) -> Result<Option<User>, StoreError>;
}

#[async_trait]
pub trait TokenStore: Send + Sync {
    /// Persist the digest, owner, expiry and scope. The plaintext is not stored.
    async fn insert(&self, token: &GeneratedToken) -> Result<(), StoreError>;

    /// Remove every token of `user_id` in `scope`. Returns the number removed.
    async fn delete_all_for_user(&self, scope: TokenScope, user_id: DbId)
        -> Result<u64, StoreError>;

    /// Remove tokens whose expiry is at or before `now`.
    async fn delete_expired(&self, now: Timestamp) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait PermissionStore: Send + Sync {
    async fn get_all_for_user(&self, user_id: DbId) -> Result<Permissions, StoreError>;

    /// Grant `codes` to `user_id`. Already-held codes are ignored.
    async fn add_for_user(&self, user_id: DbId, codes: &[&str]) -> Result<(), StoreError>;
}

#[async_trait]
pub trait StoreHealth: Send + Sync {
    async fn ping(&self) -> Result<(), StoreError>;
}

/// Every store the API uses, behind trait objects.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub forums: Arc<dyn ResourceStore<Forum>>,
    pub comments: Arc<dyn ResourceStore<Comment>>,
    pub tokens: Arc<dyn TokenStore>,
    pub permissions: Arc<dyn PermissionStore>,
    pub health: Arc<dyn StoreHealth>,
}

impl Stores {
    /// PostgreSQL-backed stores. Each query is bounded by `query_timeout`.
    pub fn postgres(pool: DbPool, query_timeout: Duration) -> Self {
        let db = Arc::new(PgDb::new(pool, query_timeout));
        Self {
            users: db.clone(),
            forums: db.clone(),
            comments: db.clone(),
            tokens: db.clone(),
            permissions: db.clone(),
            health: db,
        }
    }

    /// Stores kept in process memory.
    pub fn in_memory() -> Self {
        let db = Arc::new(MemoryDb::default());
        Self {
            users: db.clone(),
            forums: db.clone(),
            comments: db.clone(),
            tokens: db.clone(),
            permissions: db.clone(),
            health: db,
        }
    }
}
