use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use threadline_core::pagination::{Page, PageRequest};
use threadline_core::{Comment, NewComment};

use crate::{ApiError, ApiState};

/// Body of a new comment. The post comes from the path.
#[derive(Debug, Deserialize)]
pub(crate) struct CreateComment {
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub body: String,
}

pub(crate) async fn list_comments(
    State(state): State<ApiState>,
    path: Result<Path<i64>, PathRejection>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<Comment>>, ApiError> {
    let Path(post_id) = path?;
    let Query(request) = query?;
    Ok(Json(state.comments.list_comments(post_id, &request).await?))
}

pub(crate) async fn create_comment(
    State(state): State<ApiState>,
    path: Result<Path<i64>, PathRejection>,
    body: Result<Json<CreateComment>, JsonRejection>,
) -> Result<(StatusCode, Json<Comment>), ApiError> {
    let Path(post_id) = path?;
    let Json(input) = body?;
    let created = state
        .comments
        .create_comment(NewComment {
            post_id,
            parent_id: input.parent_id,
            author_id: input.author_id,
            body: input.body,
        })
        .await?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub(crate) async fn list_replies(
    State(state): State<ApiState>,
    path: Result<Path<(i64, i64)>, PathRejection>,
    query: Result<Query<PageRequest>, QueryRejection>,
) -> Result<Json<Page<Comment>>, ApiError> {
    let Path((post_id, parent_id)) = path?;
    let Query(request) = query?;
    Ok(Json(
        state
            .comments
            .list_replies(post_id, parent_id, &request)
            .await?,
    ))
}

pub(crate) async fn get_comment(
    State(state): State<ApiState>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<Comment>, ApiError> {
    let Path(comment_id) = path?;
    Ok(Json(state.comments.get_comment(comment_id).await?))
}
