//! Domain model structs and insert drafts.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A draft struct holding the caller-supplied columns of an insert

pub mod comment;
pub mod forum;
pub mod user;
