//! User account model.

use std::fmt;

use forum_core::permissions::Principal;
use forum_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

/// Name of the unique constraint on `users.email`.
pub const USERS_EMAIL_KEY: &str = "users_email_key";

/// A row from the `users` table.
///
/// `password_hash` and `version` are never serialized.
#[derive(Clone, PartialEq, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub created_at: Timestamp,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub activated: bool,
    #[serde(skip_serializing)]
    pub version: i32,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("activated", &self.activated)
            .field("version", &self.version)
            .finish_non_exhaustive()
    }
}

impl Principal for User {
    fn user_id(&self) -> DbId {
        self.id
    }

    fn is_activated(&self) -> bool {
        self.activated
    }
}

/// Columns supplied at registration.
#[derive(Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub activated: bool,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("name", &self.name)
            .field("email", &self.email)
            .field("activated", &self.activated)
            .finish_non_exhaustive()
    }
}
