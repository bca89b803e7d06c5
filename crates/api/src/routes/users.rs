use axum::routing::{post, put};
use axum::Router;

use crate::handlers::users;
use crate::state::AppState;

/// User routes mounted at `/users`.
///
/// ```text
/// POST   /                 -> register
/// PUT    /activated        -> activate
/// PUT    /password         -> reset_password
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(users::register))
        .route("/activated", put(users::activate))
        .route("/password", put(users::reset_password))
}
