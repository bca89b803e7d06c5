//! In-process backend.
//!
//! All tables sit behind one [`std::sync::Mutex`], which is only held inside
//! synchronous sections and never across an `.await`. Semantics match the
//! PostgreSQL backend: ids start at 1, `version` starts at 1 and is bumped by
//! exactly one per accepted update, e-mail uniqueness ignores case, and token
//! lookups only match unexpired rows.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use forum_core::filters::{ListQuery, SortDirection};
use forum_core::permissions::Permissions;
use forum_core::tokens::{GeneratedToken, TokenScope};
use forum_core::types::{DbId, Timestamp};

use crate::error::StoreError;
use crate::models::comment::{Comment, NewComment};
use crate::models::forum::{Forum, NewForum};
use crate::models::user::{NewUser, User, USERS_EMAIL_KEY};
use crate::store::{
    PermissionStore, ResourceStore, StoreHealth, TokenStore, UserStore, Versioned,
};

/// Rows of one resource keyed by id.
#[derive(Debug)]
pub struct Table<T> {
    rows: BTreeMap<DbId, T>,
    last_id: DbId,
}

impl<T> Default for Table<T> {
    fn default() -> Self {
        Self {
            rows: BTreeMap::new(),
            last_id: 0,
        }
    }
}

#[derive(Debug, Clone)]
struct StoredToken {
    hash: Vec<u8>,
    user_id: DbId,
    expiry: Timestamp,
    scope: TokenScope,
}

#[derive(Debug, Default)]
pub struct Tables {
    users: Table<User>,
    forums: Table<Forum>,
    comments: Table<Comment>,
    tokens: Vec<StoredToken>,
    grants: HashMap<DbId, BTreeSet<String>>,
}

/// In-process counterpart of [`crate::pg::PgResource`].
pub trait MemoryResource: Versioned {
    fn table(tables: &mut Tables) -> &mut Table<Self>;

    fn from_draft(id: DbId, created_at: Timestamp, draft: &Self::Draft) -> Self;

    fn set_version(&mut self, version: i32);

    /// Value of a text column for full-text filtering.
    fn text_column(&self, column: &str) -> Option<&str>;

    /// Order two rows by `column`. Unknown columns compare equal so the
    /// `id` tie-break decides.
    fn compare_by(&self, other: &Self, column: &str) -> Ordering;

    /// Name of the unique constraint `self` would violate against `other`.
    fn conflicts_with(&self, _other: &Self) -> Option<&'static str> {
        None
    }

    /// Remove rows that reference the deleted resource.
    fn cascade_delete(_tables: &mut Tables, _id: DbId) {}
}

impl MemoryResource for Forum {
    fn table(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.forums
    }

    fn from_draft(id: DbId, created_at: Timestamp, draft: &NewForum) -> Self {
        Forum {
            id,
            created_at,
            title: draft.title.clone(),
            content: draft.content.clone(),
            version: 1,
        }
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn text_column(&self, column: &str) -> Option<&str> {
        match column {
            "title" => Some(&self.title),
            "content" => Some(&self.content),
            _ => None,
        }
    }

    fn compare_by(&self, other: &Self, column: &str) -> Ordering {
        match column {
            "id" => self.id.cmp(&other.id),
            "title" => self.title.cmp(&other.title),
            "content" => self.content.cmp(&other.content),
            _ => Ordering::Equal,
        }
    }
}

impl MemoryResource for Comment {
    fn table(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.comments
    }

    fn from_draft(id: DbId, created_at: Timestamp, draft: &NewComment) -> Self {
        Comment {
            id,
            created_at,
            content: draft.content.clone(),
            version: 1,
        }
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn text_column(&self, column: &str) -> Option<&str> {
        (column == "content").then_some(self.content.as_str())
    }

    fn compare_by(&self, other: &Self, column: &str) -> Ordering {
        match column {
            "id" => self.id.cmp(&other.id),
            "content" => self.content.cmp(&other.content),
            _ => Ordering::Equal,
        }
    }
}

impl MemoryResource for User {
    fn table(tables: &mut Tables) -> &mut Table<Self> {
        &mut tables.users
    }

    fn from_draft(id: DbId, created_at: Timestamp, draft: &NewUser) -> Self {
        User {
            id,
            created_at,
            name: draft.name.clone(),
            email: draft.email.clone(),
            password_hash: draft.password_hash.clone(),
            activated: draft.activated,
            version: 1,
        }
    }

    fn set_version(&mut self, version: i32) {
        self.version = version;
    }

    fn text_column(&self, _column: &str) -> Option<&str> {
        None
    }

    fn compare_by(&self, other: &Self, column: &str) -> Ordering {
        match column {
            "id" => self.id.cmp(&other.id),
            "email" => self.email.to_lowercase().cmp(&other.email.to_lowercase()),
            _ => Ordering::Equal,
        }
    }

    fn conflicts_with(&self, other: &Self) -> Option<&'static str> {
        self.email
            .eq_ignore_ascii_case(&other.email)
            .then_some(USERS_EMAIL_KEY)
    }

    fn cascade_delete(tables: &mut Tables, id: DbId) {
        tables.tokens.retain(|t| t.user_id != id);
        tables.grants.remove(&id);
    }
}

/// Every store kept in process memory.
#[derive(Debug, Default)]
pub struct MemoryDb {
    tables: Mutex<Tables>,
}

impl MemoryDb {
    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn not_found<T: Versioned>(id: DbId) -> StoreError {
    StoreError::NotFound {
        entity: T::ENTITY,
        id,
    }
}

#[async_trait]
impl<T: MemoryResource> ResourceStore<T> for MemoryDb {
    async fn insert(&self, draft: &T::Draft) -> Result<T, StoreError> {
        let mut tables = self.lock();
        let table = T::table(&mut tables);

        let candidate = T::from_draft(table.last_id + 1, Utc::now(), draft);
        if let Some(constraint) = table.rows.values().find_map(|row| candidate.conflicts_with(row)) {
            return Err(StoreError::Duplicate(constraint.to_string()));
        }

        table.last_id += 1;
        table.rows.insert(candidate.id(), candidate.clone());
        Ok(candidate)
    }

    async fn get(&self, id: DbId) -> Result<T, StoreError> {
        if id < 1 {
            return Err(not_found::<T>(id));
        }
        let mut tables = self.lock();
        T::table(&mut tables)
            .rows
            .get(&id)
            .cloned()
            .ok_or_else(|| not_found::<T>(id))
    }

    async fn update(&self, resource: &T) -> Result<T, StoreError> {
        let id = resource.id();
        let mut tables = self.lock();
        let table = T::table(&mut tables);

        let stored_version = match table.rows.get(&id) {
            Some(row) => row.version(),
            None => return Err(not_found::<T>(id)),
        };
        if stored_version != resource.version() {
            return Err(StoreError::EditConflict {
                entity: T::ENTITY,
                id,
            });
        }
        if let Some(constraint) = table
            .rows
            .values()
            .filter(|row| row.id() != id)
            .find_map(|row| resource.conflicts_with(row))
        {
            return Err(StoreError::Duplicate(constraint.to_string()));
        }

        let mut updated = resource.clone();
        updated.set_version(stored_version + 1);
        table.rows.insert(id, updated.clone());
        Ok(updated)
    }

    async fn delete(&self, id: DbId) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if T::table(&mut tables).rows.remove(&id).is_none() {
            return Err(not_found::<T>(id));
        }
        T::cascade_delete(&mut tables, id);
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<T>, i64), StoreError> {
        let mut tables = self.lock();
        let mut matching: Vec<T> = T::table(&mut tables)
            .rows
            .values()
            .filter(|row| {
                query.active_text().all(|filter| {
                    row.text_column(filter.column)
                        .is_some_and(|value| filter.matches(value))
                })
            })
            .cloned()
            .collect();
        drop(tables);

        let sort = query.sort;
        matching.sort_by(|a, b| {
            let primary = a.compare_by(b, sort.column);
            let primary = match sort.direction {
                SortDirection::Asc => primary,
                SortDirection::Desc => primary.reverse(),
            };
            primary.then_with(|| a.id().cmp(&b.id()))
        });

        let total = matching.len() as i64;
        let page = matching
            .into_iter()
            .skip(query.offset().max(0) as usize)
            .take(query.limit().max(0) as usize)
            .collect();
        Ok((page, total))
    }
}

#[async_trait]
impl UserStore for MemoryDb {
    async fn get_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let tables = self.lock();
        Ok(tables
            .users
            .rows
            .values()
            .find(|u| u.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn get_for_token(
        &self,
        scope: TokenScope,
        hash: &[u8],
        now: Timestamp,
    ) -> Result<Option<User>, StoreError> {
        let tables = self.lock();
        let owner = tables
            .tokens
            .iter()
            .find(|t| t.hash == hash && t.scope == scope && t.expiry > now)
            .map(|t| t.user_id);
        Ok(owner.and_then(|id| tables.users.rows.get(&id).cloned()))
    }
}

#[async_trait]
impl TokenStore for MemoryDb {
    async fn insert(&self, token: &GeneratedToken) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.users.rows.contains_key(&token.user_id) {
            return Err(not_found::<User>(token.user_id));
        }
        if tables.tokens.iter().any(|t| t.hash == token.hash) {
            return Err(StoreError::Duplicate("tokens_pkey".into()));
        }
        tables.tokens.push(StoredToken {
            hash: token.hash.clone(),
            user_id: token.user_id,
            expiry: token.expiry,
            scope: token.scope,
        });
        Ok(())
    }

    async fn delete_all_for_user(
        &self,
        scope: TokenScope,
        user_id: DbId,
    ) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let before = tables.tokens.len();
        tables
            .tokens
            .retain(|t| !(t.scope == scope && t.user_id == user_id));
        Ok((before - tables.tokens.len()) as u64)
    }

    async fn delete_expired(&self, now: Timestamp) -> Result<u64, StoreError> {
        let mut tables = self.lock();
        let before = tables.tokens.len();
        tables.tokens.retain(|t| t.expiry > now);
        Ok((before - tables.tokens.len()) as u64)
    }
}

#[async_trait]
impl PermissionStore for MemoryDb {
    async fn get_all_for_user(&self, user_id: DbId) -> Result<Permissions, StoreError> {
        let tables = self.lock();
        Ok(tables
            .grants
            .get(&user_id)
            .map(|codes| codes.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn add_for_user(&self, user_id: DbId, codes: &[&str]) -> Result<(), StoreError> {
        let mut tables = self.lock();
        if !tables.users.rows.contains_key(&user_id) {
            return Err(not_found::<User>(user_id));
        }
        let known = forum_core::permissions::ALL_CAPABILITIES;
        tables
            .grants
            .entry(user_id)
            .or_default()
            .extend(codes.iter().filter(|c| known.contains(*c)).map(|c| c.to_string()));
        Ok(())
    }
}

#[async_trait]
impl StoreHealth for MemoryDb {
    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
