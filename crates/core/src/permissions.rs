//! Capability-based authorization.
//!
//! Capabilities are opaque strings matched exactly. They are namespaced
//! `resource:action` by convention, but no prefix or glob semantics apply.
//!
//! The gate runs in a fixed order and stops at the first failure:
//! identity ([`Identity::require_authenticated`]), activation
//! ([`Identity::require_activated`]), then capability
//! ([`Permissions::require`]).

use std::collections::BTreeSet;

use serde::Serialize;

use crate::error::CoreError;
use crate::types::DbId;

/// Read access to forums and comments.
pub const FORUMS_READ: &str = "forums:read";

/// Write access to forums and comments. The double colon is the established
/// wire value and must not be normalised.
pub const FORUMS_WRITE: &str = "forums::write";

/// Every capability known to the system, in seed order.
pub const ALL_CAPABILITIES: &[&str] = &[FORUMS_READ, FORUMS_WRITE];

/// Capabilities granted to every newly registered account.
pub const DEFAULT_CAPABILITIES: &[&str] = &[FORUMS_READ];

/// A type-level capability, used by permission extractors.
pub trait Capability: Send + Sync + 'static {
    const CODE: &'static str;
}

/// Marker for [`FORUMS_READ`].
pub struct ForumsRead;

impl Capability for ForumsRead {
    const CODE: &'static str = FORUMS_READ;
}

/// Marker for [`FORUMS_WRITE`].
pub struct ForumsWrite;

impl Capability for ForumsWrite {
    const CODE: &'static str = FORUMS_WRITE;
}

/// The set of capabilities held by one user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Permissions(BTreeSet<String>);

impl Permissions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn includes(&self, code: &str) -> bool {
        self.0.contains(code)
    }

    pub fn insert(&mut self, code: impl Into<String>) -> bool {
        self.0.insert(code.into())
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }

    /// Fails with [`CoreError::Forbidden`] unless `code` is held.
    pub fn require(&self, code: &str) -> Result<(), CoreError> {
        if self.includes(code) {
            Ok(())
        } else {
            Err(CoreError::Forbidden(
                "your user account does not have the necessary permissions to access this resource"
                    .into(),
            ))
        }
    }
}

impl<S: Into<String>> FromIterator<S> for Permissions {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(iter.into_iter().map(Into::into).collect())
    }
}

/// What the gate needs to know about an account.
pub trait Principal {
    fn user_id(&self) -> DbId;
    fn is_activated(&self) -> bool;
}

/// The caller of a request after token resolution.
#[derive(Debug, Clone, PartialEq)]
pub enum Identity<U> {
    /// No token, or a token that did not resolve to a live user.
    Anonymous,
    Authenticated(U),
}

impl<U> Default for Identity<U> {
    fn default() -> Self {
        Identity::Anonymous
    }
}

impl<U: Principal> Identity<U> {
    pub fn user(&self) -> Option<&U> {
        match self {
            Identity::Anonymous => None,
            Identity::Authenticated(user) => Some(user),
        }
    }

    /// Fails with [`CoreError::Unauthorized`] for anonymous callers.
    pub fn require_authenticated(&self) -> Result<&U, CoreError> {
        self.user().ok_or_else(|| {
            CoreError::Unauthorized("you must be authenticated to access this resource".into())
        })
    }

    /// Authenticated and activated, checked in that order.
    pub fn require_activated(&self) -> Result<&U, CoreError> {
        let user = self.require_authenticated()?;
        if !user.is_activated() {
            return Err(CoreError::InactiveAccount);
        }
        Ok(user)
    }
}
