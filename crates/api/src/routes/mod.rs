pub mod comments;
pub mod forums;
pub mod health;
pub mod tokens;
pub mod users;

use axum::Router;

use crate::state::AppState;

/// Build the `/v1` route tree.
///
/// ```text
/// /healthcheck                   status (public)
///
/// /users                         register (public)
/// /users/activated               activate with an emailed token (public)
/// /users/password                reset password with an emailed token (public)
///
/// /tokens/authentication         login (POST), logout (DELETE, authenticated)
/// /tokens/password-reset         request a reset token (public)
/// /tokens/activation             re-send an activation token (public)
///
/// /forum                         list (forums:read), create (forums::write)
/// /forum/{id}                    show, update, delete
///
/// /comment                       list (forums:read), create (forums::write)
/// /comment/{id}                  show, update, delete
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .merge(health::router())
        .nest("/users", users::router())
        .nest("/tokens", tokens::router())
        .nest("/forum", forums::router())
        .nest("/comment", comments::router())
}
