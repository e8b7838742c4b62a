use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use threadline_core::pagination::{Page, PageRequest};
use threadline_core::{NewPost, Post};

use crate::{ApiError, ApiState};

#[derive(Debug, Deserialize)]
pub(crate) struct CommentPermission {
    pub user_id: i64,
    pub enabled: bool,
}

pub(crate) async fn list_posts(
    State(state): State<ApiState>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<Post>>, ApiError> {
    let Query(request) = query?;
    Ok(Json(state.posts.list_posts(&request).await?))
}

pub(crate) async fn create_post(
    State(state): State<ApiState>,
    body: Result<Json<NewPost>, JsonRejection>,
) -> Result<(StatusCode, Json<Post>), ApiError> {
    let Json(post) = body?;
    let created = state.posts.create_post(post).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn get_post(
    State(state): State<ApiState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Post>, ApiError> {
    let Path(post_id) = path?;
    Ok(Json(state.posts.get_post(post_id).await?))
}

pub(crate) async fn set_comments_enabled(
    State(state): State<ApiState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CommentPermission>, JsonRejection>,
) -> Result<StatusCode, ApiError> {
    let Path(post_id) = path?;
    let Json(permission) = body?;
    state
        .posts
        .set_comments_enabled(post_id, permission.user_id, permission.enabled)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
