use axum::routing::get;
use axum::Router;

use crate::handlers::forums;
use crate::state::AppState;

/// Forum routes mounted at `/forum`.
///
/// ```text
/// GET    /                 -> list_forums
/// POST   /                 -> create_forum
/// GET    /{id}             -> show_forum
/// PATCH  /{id}             -> update_forum
/// DELETE /{id}             -> delete_forum
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(forums::list_forums).post(forums::create_forum))
        .route(
            "/{id}",
            get(forums::show_forum)
                .patch(forums::update_forum)
                .delete(forums::delete_forum),
        )
}
