use forum_core::error::CoreError;
use forum_core::types::DbId;

/// PostgreSQL `unique_violation`.
const UNIQUE_VIOLATION: &str = "23505";

/// Failure of a storage operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{entity} with id {id} not found")]
    NotFound { entity: &'static str, id: DbId },

    /// The row exists but its version moved on since it was read.
    #[error("edit conflict on {entity} {id}")]
    EditConflict { entity: &'static str, id: DbId },

    /// A unique constraint rejected the write. Carries the constraint name.
    #[error("duplicate value violates unique constraint {0}")]
    Duplicate(String),

    #[error("storage operation timed out")]
    Timeout,

    #[error("database error: {0}")]
    Backend(sqlx::Error),
}

impl StoreError {
    /// True when the write was rejected by the named unique constraint.
    pub fn is_duplicate_of(&self, constraint: &str) -> bool {
        matches!(self, StoreError::Duplicate(c) if c == constraint)
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.code().as_deref() == Some(UNIQUE_VIOLATION) {
                let constraint = db_err.constraint().unwrap_or("unknown").to_string();
                return StoreError::Duplicate(constraint);
            }
        }
        StoreError::Backend(err)
    }
}

impl From<StoreError> for CoreError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound { entity, id } => CoreError::NotFound { entity, id },
            StoreError::EditConflict { entity, id } => CoreError::EditConflict { entity, id },
            StoreError::Duplicate(_) => CoreError::Conflict(err.to_string()),
            StoreError::Timeout | StoreError::Backend(_) => CoreError::Internal(err.to_string()),
        }
    }
}
