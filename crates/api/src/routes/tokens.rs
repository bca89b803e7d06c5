use axum::routing::post;
use axum::Router;

use crate::handlers::tokens;
use crate::state::AppState;

/// Token routes mounted at `/tokens`.
///
/// ```text
/// POST   /authentication   -> login
/// DELETE /authentication   -> logout
/// POST   /password-reset   -> request_password_reset
/// POST   /activation       -> resend_activation
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/authentication",
            post(tokens::login).delete(tokens::logout),
        )
        .route("/password-reset", post(tokens::request_password_reset))
        .route("/activation", post(tokens::resend_activation))
}
