//! PostgreSQL backend.
//!
//! [`PgDb`] implements every store trait over one pool. The generic
//! version-checked write path lives in [`ResourceStore`] for any
//! [`PgResource`]; per-table knowledge (table name, column list, how to bind
//! a draft) lives in the `PgResource` impls in [`resources`] and [`users`].
//!
//! Every query runs under [`tokio::time::timeout`]. Dropping the returned
//! future (client disconnect) drops the in-flight query with it.

use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use forum_core::filters::ListQuery;
use forum_core::types::DbId;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::QueryAs;
use sqlx::{FromRow, Postgres, Row};

use crate::error::StoreError;
use crate::store::{ResourceStore, StoreHealth, Versioned};
use crate::DbPool;

pub mod permissions;
pub mod resources;
pub mod tokens;
pub mod users;

/// Default bound on a single query.
pub const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(3);

pub type PgQueryAs<'q, O> = QueryAs<'q, Postgres, O, PgArguments>;

/// Table-level knowledge needed by the generic write path.
pub trait PgResource: Versioned + for<'r> FromRow<'r, PgRow> + Unpin {
    const TABLE: &'static str;

    /// Select list shared by `SELECT` and `RETURNING` clauses.
    const COLUMNS: &'static str;

    /// Columns written by an insert, in `bind_draft` order.
    const INSERT_COLUMNS: &'static [&'static str];

    /// Columns written by an update, in `bind_update` order.
    const UPDATE_COLUMNS: &'static [&'static str];

    /// Columns that accept full-text filters.
    const SEARCH_COLUMNS: &'static [&'static str] = &[];

    fn bind_draft<'q, O>(draft: &'q Self::Draft, query: PgQueryAs<'q, O>) -> PgQueryAs<'q, O>;

    fn bind_update<'q, O>(&'q self, query: PgQueryAs<'q, O>) -> PgQueryAs<'q, O>;
}

/// A row plus the `COUNT(*) OVER()` window total.
struct Counted<T> {
    total: i64,
    row: T,
}

impl<'r, T: FromRow<'r, PgRow>> FromRow<'r, PgRow> for Counted<T> {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            total: row.try_get("total_count")?,
            row: T::from_row(row)?,
        })
    }
}

/// All stores over a single PostgreSQL pool.
#[derive(Debug, Clone)]
pub struct PgDb {
    pool: DbPool,
    query_timeout: Duration,
}

impl PgDb {
    pub fn new(pool: DbPool, query_timeout: Duration) -> Self {
        Self {
            pool,
            query_timeout,
        }
    }

    pub fn pool(&self) -> &DbPool {
        &self.pool
    }

    /// Run `fut` under the query timeout.
    pub(crate) async fn timed<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => result.map_err(StoreError::from),
            Err(_) => {
                tracing::warn!(timeout_ms = self.query_timeout.as_millis() as u64, "Query timed out");
                Err(StoreError::Timeout)
            }
        }
    }

    async fn exists<T: PgResource>(&self, id: DbId) -> Result<bool, StoreError> {
        let query = format!("SELECT EXISTS (SELECT 1 FROM {} WHERE id = $1)", T::TABLE);
        self.timed(
            sqlx::query_scalar::<_, bool>(&query)
                .bind(id)
                .fetch_one(&self.pool),
        )
        .await
    }
}

fn placeholders(start: usize, count: usize) -> String {
    (start..start + count)
        .map(|n| format!("${n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

#[async_trait]
impl<T: PgResource> ResourceStore<T> for PgDb {
    async fn insert(&self, draft: &T::Draft) -> Result<T, StoreError> {
        let query = format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            T::TABLE,
            T::INSERT_COLUMNS.join(", "),
            placeholders(1, T::INSERT_COLUMNS.len()),
            T::COLUMNS,
        );
        let row = self
            .timed(T::bind_draft(draft, sqlx::query_as::<_, T>(&query)).fetch_one(&self.pool))
            .await?;
        tracing::debug!(entity = T::ENTITY, id = row.id(), "Inserted row");
        Ok(row)
    }

    async fn get(&self, id: DbId) -> Result<T, StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound {
                entity: T::ENTITY,
                id,
            });
        }
        let query = format!("SELECT {} FROM {} WHERE id = $1", T::COLUMNS, T::TABLE);
        self.timed(
            sqlx::query_as::<_, T>(&query)
                .bind(id)
                .fetch_optional(&self.pool),
        )
        .await?
        .ok_or(StoreError::NotFound {
            entity: T::ENTITY,
            id,
        })
    }

    async fn update(&self, resource: &T) -> Result<T, StoreError> {
        let id = resource.id();
        let assignments = T::UPDATE_COLUMNS
            .iter()
            .enumerate()
            .map(|(i, column)| format!("{column} = ${}", i + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let next = T::UPDATE_COLUMNS.len() + 1;
        let query = format!(
            "UPDATE {} SET {assignments}, version = version + 1 \
             WHERE id = ${} AND version = ${} \
             RETURNING {}",
            T::TABLE,
            next,
            next + 1,
            T::COLUMNS,
        );

        let updated = self
            .timed(
                resource
                    .bind_update(sqlx::query_as::<_, T>(&query))
                    .bind(id)
                    .bind(resource.version())
                    .fetch_optional(&self.pool),
            )
            .await?;

        if let Some(row) = updated {
            return Ok(row);
        }

        // Nothing matched: tell a stale version apart from a vanished row.
        if self.exists::<T>(id).await? {
            tracing::debug!(entity = T::ENTITY, id, version = resource.version(), "Edit conflict");
            Err(StoreError::EditConflict {
                entity: T::ENTITY,
                id,
            })
        } else {
            Err(StoreError::NotFound {
                entity: T::ENTITY,
                id,
            })
        }
    }

    async fn delete(&self, id: DbId) -> Result<(), StoreError> {
        if id < 1 {
            return Err(StoreError::NotFound {
                entity: T::ENTITY,
                id,
            });
        }
        let query = format!("DELETE FROM {} WHERE id = $1", T::TABLE);
        let result = self
            .timed(sqlx::query(&query).bind(id).execute(&self.pool))
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound {
                entity: T::ENTITY,
                id,
            });
        }
        Ok(())
    }

    async fn list(&self, query: &ListQuery) -> Result<(Vec<T>, i64), StoreError> {
        let filters: Vec<_> = query
            .active_text()
            .filter(|f| T::SEARCH_COLUMNS.contains(&f.column))
            .collect();

        let mut predicate = String::new();
        for (i, filter) in filters.iter().enumerate() {
            predicate.push_str(if i == 0 { " WHERE " } else { " AND " });
            predicate.push_str(&format!(
                "to_tsvector('simple', {}) @@ plainto_tsquery('simple', ${})",
                filter.column,
                i + 1
            ));
        }

        let sql = format!(
            "SELECT COUNT(*) OVER() AS total_count, {} FROM {}{predicate} \
             ORDER BY {} {}, id ASC LIMIT ${} OFFSET ${}",
            T::COLUMNS,
            T::TABLE,
            query.sort.column,
            query.sort.direction.as_sql(),
            filters.len() + 1,
            filters.len() + 2,
        );

        let mut select = sqlx::query_as::<_, Counted<T>>(&sql);
        for filter in &filters {
            select = select.bind(filter.term.as_str());
        }
        let rows = self
            .timed(
                select
                    .bind(query.limit())
                    .bind(query.offset())
                    .fetch_all(&self.pool),
            )
            .await?;

        let total = match rows.first() {
            Some(first) => first.total,
            None if query.offset() > 0 => {
                // Past the last page the window has no rows to ride on.
                let count_sql = format!("SELECT COUNT(*) FROM {}{predicate}", T::TABLE);
                let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
                for filter in &filters {
                    count = count.bind(filter.term.as_str());
                }
                self.timed(count.fetch_one(&self.pool)).await?
            }
            None => 0,
        };
        Ok((rows.into_iter().map(|r| r.row).collect(), total))
    }
}

#[async_trait]
impl StoreHealth for PgDb {
    async fn ping(&self) -> Result<(), StoreError> {
        self.timed(sqlx::query("SELECT 1").execute(&self.pool))
            .await
            .map(|_| ())
    }
}
