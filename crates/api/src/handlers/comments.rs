//! Handlers for comments. Same gates and write path as forum posts.

use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use forum_core::filters::Metadata;
use forum_db::models::comment::{Comment, NewComment};
use forum_db::store::Versioned;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ExpectedVersion, IdParam, QueryParams, ValidJson};
use crate::handlers::validate_content;
use crate::middleware::rbac::{CanRead, CanWrite};
use crate::query::ListParams;
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

pub const COMMENT_SORT_SAFELIST: &[&str] = &["id", "content", "-id", "-content"];

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCommentRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_content"))]
    pub content: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCommentRequest {
    #[validate(custom(function = "validate_content"))]
    pub content: Option<String>,
}

/// POST /v1/comment
pub async fn create_comment(
    perm: CanWrite,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateCommentRequest>,
) -> AppResult<impl IntoResponse> {
    let comment = state
        .stores
        .comments
        .insert(&NewComment {
            content: input.content,
        })
        .await?;

    tracing::info!(comment_id = comment.id, user_id = perm.user().id, "Comment created");

    let location = format!("/v1/comment/{}", comment.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(DataResponse { data: comment }),
    ))
}

/// GET /v1/comment/{id}
pub async fn show_comment(
    _perm: CanRead,
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> AppResult<Json<DataResponse<Comment>>> {
    let comment = state.stores.comments.get(id).await?;
    Ok(Json(DataResponse { data: comment }))
}

/// PATCH /v1/comment/{id}
pub async fn update_comment(
    perm: CanWrite,
    State(state): State<AppState>,
    IdParam(id): IdParam,
    expected: ExpectedVersion,
    ValidJson(input): ValidJson<UpdateCommentRequest>,
) -> AppResult<Json<DataResponse<Comment>>> {
    let mut comment = state.stores.comments.get(id).await?;
    expected.check(Comment::ENTITY, id, comment.version)?;

    if let Some(content) = input.content {
        comment.content = content;
    }
    let comment = state.stores.comments.update(&comment).await?;

    tracing::info!(comment_id = id, version = comment.version, user_id = perm.user().id, "Comment updated");

    Ok(Json(DataResponse { data: comment }))
}

/// DELETE /v1/comment/{id}
pub async fn delete_comment(
    perm: CanWrite,
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> AppResult<impl IntoResponse> {
    state.stores.comments.delete(id).await?;

    tracing::info!(comment_id = id, user_id = perm.user().id, "Comment deleted");

    Ok(Json(DataResponse::message("comment successfully deleted")))
}

/// GET /v1/comment
pub async fn list_comments(
    _perm: CanRead,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> AppResult<Json<ListResponse<Comment>>> {
    let query = params.into_query(&["content"], COMMENT_SORT_SAFELIST)?;
    let (comments, total) = state.stores.comments.list(&query).await?;

    Ok(Json(ListResponse {
        data: comments,
        metadata: Metadata::calculate(total, query.page, query.page_size),
    }))
}
