//! Comment model.

use forum_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// A row from the `comments` table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize)]
pub struct Comment {
    pub id: DbId,
    #[serde(skip_serializing)]
    pub created_at: Timestamp,
    pub content: String,
    pub version: i32,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub content: String,
}
