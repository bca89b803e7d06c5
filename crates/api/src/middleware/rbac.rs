//! Authorization extractors.
//!
//! Each extractor reads the `Identity<User>` left by
//! [`authenticate`](super::auth::authenticate) and rejects requests that do
//! not meet its requirement. The checks run in a fixed order and stop at the
//! first failure: authenticated (401), activated (403), capability (403).

use std::marker::PhantomData;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use forum_core::permissions::{Capability, ForumsRead, ForumsWrite, Identity};
use forum_db::models::user::User;

use crate::error::AppError;
use crate::state::AppState;

fn identity(parts: &Parts) -> Identity<User> {
    parts
        .extensions
        .get::<Identity<User>>()
        .cloned()
        .unwrap_or_default()
}

/// Requires any authenticated user, activated or not.
///
/// ```ignore
/// async fn logout(AuthUser(user): AuthUser) -> AppResult<StatusCode> { ... }
/// ```
pub struct AuthUser(pub User);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = identity(parts).require_authenticated()?.clone();
        Ok(AuthUser(user))
    }
}

/// Requires an authenticated, activated user.
pub struct ActiveUser(pub User);

impl FromRequestParts<AppState> for ActiveUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = identity(parts).require_activated()?.clone();
        Ok(ActiveUser(user))
    }
}

/// Requires an activated user holding capability `C`.
///
/// ```ignore
/// async fn create(RequirePermission(user, ..): RequirePermission<ForumsWrite>) { ... }
/// ```
pub struct RequirePermission<C: Capability>(pub User, PhantomData<C>);

impl<C: Capability> RequirePermission<C> {
    pub fn user(&self) -> &User {
        &self.0
    }
}

impl<C: Capability> FromRequestParts<AppState> for RequirePermission<C> {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let ActiveUser(user) = ActiveUser::from_request_parts(parts, state).await?;
        let permissions = state.stores.permissions.get_all_for_user(user.id).await?;
        if let Err(e) = permissions.require(C::CODE) {
            tracing::debug!(user_id = user.id, capability = C::CODE, "Permission denied");
            return Err(e.into());
        }
        Ok(RequirePermission(user, PhantomData))
    }
}

/// `forums:read`
pub type CanRead = RequirePermission<ForumsRead>;

/// `forums::write`
pub type CanWrite = RequirePermission<ForumsWrite>;
