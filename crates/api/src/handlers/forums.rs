//! Handlers for forum posts.
//!
//! Reads require `forums:read`, writes require `forums::write`. Updates go
//! through the version-checked write path and may carry an
//! `X-Expected-Version` precondition.

use axum::extract::State;
use axum::http::header::LOCATION;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use forum_core::filters::Metadata;
use forum_db::models::forum::{Forum, NewForum};
use forum_db::store::Versioned;
use serde::Deserialize;
use validator::Validate;

use crate::error::AppResult;
use crate::extract::{ExpectedVersion, IdParam, QueryParams, ValidJson};
use crate::handlers::{validate_content, validate_title};
use crate::middleware::rbac::{CanRead, CanWrite};
use crate::query::ListParams;
use crate::response::{DataResponse, ListResponse};
use crate::state::AppState;

/// Sort values accepted by `GET /v1/forum`.
pub const FORUM_SORT_SAFELIST: &[&str] = &["id", "title", "content", "-id", "-title", "-content"];

/// Columns searchable through `?title=` and `?content=`.
const FORUM_TEXT_COLUMNS: &[&str] = &["title", "content"];

#[derive(Debug, Deserialize, Validate)]
pub struct CreateForumRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_title"))]
    pub title: String,
    #[serde(default)]
    #[validate(custom(function = "validate_content"))]
    pub content: String,
}

/// Partial update; absent fields keep their stored value.
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateForumRequest {
    #[validate(custom(function = "validate_title"))]
    pub title: Option<String>,
    #[validate(custom(function = "validate_content"))]
    pub content: Option<String>,
}

/// POST /v1/forum
pub async fn create_forum(
    perm: CanWrite,
    State(state): State<AppState>,
    ValidJson(input): ValidJson<CreateForumRequest>,
) -> AppResult<impl IntoResponse> {
    let forum = state
        .stores
        .forums
        .insert(&NewForum {
            title: input.title,
            content: input.content,
        })
        .await?;

    tracing::info!(forum_id = forum.id, user_id = perm.user().id, "Forum created");

    let location = format!("/v1/forum/{}", forum.id);
    Ok((
        StatusCode::CREATED,
        [(LOCATION, location)],
        Json(DataResponse { data: forum }),
    ))
}

/// GET /v1/forum/{id}
pub async fn show_forum(
    _perm: CanRead,
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> AppResult<Json<DataResponse<Forum>>> {
    let forum = state.stores.forums.get(id).await?;
    Ok(Json(DataResponse { data: forum }))
}

/// PATCH /v1/forum/{id}
pub async fn update_forum(
    perm: CanWrite,
    State(state): State<AppState>,
    IdParam(id): IdParam,
    expected: ExpectedVersion,
    ValidJson(input): ValidJson<UpdateForumRequest>,
) -> AppResult<Json<DataResponse<Forum>>> {
    let mut forum = state.stores.forums.get(id).await?;
    expected.check(Forum::ENTITY, id, forum.version)?;

    if let Some(title) = input.title {
        forum.title = title;
    }
    if let Some(content) = input.content {
        forum.content = content;
    }
    let forum = state.stores.forums.update(&forum).await?;

    tracing::info!(forum_id = id, version = forum.version, user_id = perm.user().id, "Forum updated");

    Ok(Json(DataResponse { data: forum }))
}

/// DELETE /v1/forum/{id}
pub async fn delete_forum(
    perm: CanWrite,
    State(state): State<AppState>,
    IdParam(id): IdParam,
) -> AppResult<impl IntoResponse> {
    state.stores.forums.delete(id).await?;

    tracing::info!(forum_id = id, user_id = perm.user().id, "Forum deleted");

    Ok(Json(DataResponse::message("forum successfully deleted")))
}

/// GET /v1/forum
pub async fn list_forums(
    _perm: CanRead,
    State(state): State<AppState>,
    QueryParams(params): QueryParams<ListParams>,
) -> AppResult<Json<ListResponse<Forum>>> {
    let query = params.into_query(FORUM_TEXT_COLUMNS, FORUM_SORT_SAFELIST)?;
    let (forums, total) = state.stores.forums.list(&query).await?;

    Ok(Json(ListResponse {
        data: forums,
        metadata: Metadata::calculate(total, query.page, query.page_size),
    }))
}
