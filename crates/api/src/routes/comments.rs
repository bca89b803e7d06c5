use axum::routing::get;
use axum::Router;

use crate::handlers::comments;
use crate::state::AppState;

/// Comment routes mounted at `/comment`.
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(comments::list_comments).post(comments::create_comment))
        .route(
            "/{id}",
            get(comments::show_comment)
                .patch(comments::update_comment)
                .delete(comments::delete_comment),
        )
}
