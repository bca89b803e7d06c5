//! Bearer token authentication.
//!
//! Every request leaves this middleware with an `Identity<User>` extension.
//! A missing `Authorization` header, or a well-formed token that is unknown,
//! expired or revoked, yields [`Identity::Anonymous`]; whether anonymous
//! callers may proceed is decided later by the handler's extractors. A
//! header that is not `Bearer <token>`, or a token of the wrong shape, is
//! rejected here with 401 `INVALID_TOKEN`.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use forum_core::error::CoreError;
use forum_core::permissions::Identity;
use forum_core::tokens::TokenScope;
use forum_db::models::user::User;

use crate::error::AppError;
use crate::state::AppState;

pub async fn authenticate(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    match resolve_identity(&state, req.headers()).await {
        Ok(identity) => {
            req.extensions_mut().insert(identity);
            next.run(req).await
        }
        Err(e) => e.into_response(),
    }
}

async fn resolve_identity(state: &AppState, headers: &HeaderMap) -> Result<Identity<User>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(Identity::Anonymous);
    };
    let token = value
        .to_str()
        .ok()
        .and_then(bearer_token)
        .ok_or(CoreError::InvalidToken)?;

    let identity = match state.tokens.validate(token, TokenScope::Authentication).await? {
        Some(user) => Identity::Authenticated(user),
        None => Identity::Anonymous,
    };
    Ok(identity)
}

/// Extract the token from `Bearer <token>`. The scheme is case-insensitive.
fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    let token = token.trim();
    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() && !token.contains(' '))
        .then_some(token)
}
