#![forbid(unsafe_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::routing::{get, put};
use axum::{extract::State, http::StatusCode, Router};
use threadline_realtime::bus::CommentBus;
use threadline_service::{CommentService, PostService};
use threadline_storage::{PostStorage, Storage, StorageError};

mod comments;
mod error;
mod live;
mod posts;


pub use error::ApiError;

#[async_trait]
pub trait HealthCheck: Send + Sync {
    async fn ping(&self) -> Result<(), StorageError>;
}

#[async_trait]
impl<T> HealthCheck for T
where
    T: PostStorage + ?Sized,
{
    async fn ping(&self) -> Result<(), StorageError> {
        PostStorage::ping(self).await
    }
}

#[derive(Clone)]
pub struct ApiState {
    health: Arc<dyn HealthCheck>,
    posts: PostService,
    comments: CommentService,
}

impl ApiState {
    #[must_use]
    pub fn new(health: Arc<dyn HealthCheck>, posts: PostService, comments: CommentService) -> Self {
        Self {
            health,
            posts,
            comments,
        }
    }

    /// Builds both services over one storage backend sharing `bus`.
    #[must_use]
    pub fn with_storage<S>(storage: Arc<S>, bus: Arc<CommentBus>) -> Self
    where
        S: Storage + 'static,
    {
        let posts = PostService::new(storage.clone());
        let comments = CommentService::new(storage.clone(), storage.clone(), bus);
        Self::new(storage, posts, comments)
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route(
            "/api/v1/posts",
            get(posts::list_posts).post(posts::create_post),
        )
        .route("/api/v1/posts/{post_id}", get(posts::get_post))
        .route(
            "/api/v1/posts/{post_id}/comments-enabled",
            put(posts::set_comments_enabled),
        )
        .route(
            "/api/v1/posts/{post_id}/comments",
            get(comments::list_comments).post(comments::create_comment),
        )
        .route(
            "/api/v1/posts/{post_id}/comments/{parent_id}/replies",
            get(comments::list_replies),
        )
        .route("/api/v1/posts/{post_id}/live", get(live::live_comments))
        .route("/api/v1/comments/{comment_id}", get(comments::get_comment))
        .with_state(state)
}

async fn health(State(state): State<ApiState>) -> StatusCode {
    match state.health.ping().await {
        Ok(()) => StatusCode::OK,
        Err(_) => StatusCode::SERVICE_UNAVAILABLE,
    }
}
