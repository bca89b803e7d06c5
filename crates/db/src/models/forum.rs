//! Forum post model.

use forum_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `forum` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Forum {
    pub id: DbId,
    #[serde(skip_serializing)]
    pub created_at: Timestamp,
    pub title: String,
    pub content: String,
    pub version: i32,
}

/// Columns supplied when creating a forum post.
#[derive(Debug, Clone)]
pub struct NewForum {
    pub title: String,
    pub content: String,
}
