#![forbid(unsafe_code)]

use async_trait::async_trait;
use threadline_core::pagination::{CommentScope, KeysetQuery, PostScope, ReplyScope};
use threadline_core::{Comment, NewComment, NewPost, Post};

pub mod memory;
pub mod postgres;

pub use memory::MemoryStorage;
pub use postgres::PostgresStorage;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("post not found")]
    PostNotFound,
    #[error("comment not found")]
    CommentNotFound,
    #[error("database error: {0}")]
    Database(String),
    #[error("migration error: {0}")]
    Migration(String),
    #[error("DATABASE_URL is not set")]
    MissingDatabaseUrl,
}

// ---------------------------------------------------------------------------
// Domain-specific storage traits
// ---------------------------------------------------------------------------
//
// List operations execute a `KeysetQuery`: rows matching the scope and seek
// predicate, sorted by `query.order()`, at most `query.limit()` of them. Rows
// are returned in that order, ascending queries are not reversed here.

#[async_trait]
pub trait PostStorage: Send + Sync {
    async fn ping(&self) -> Result<(), StorageError>;
    async fn create_post(&self, post: &NewPost) -> Result<Post, StorageError>;
    async fn get_post(&self, post_id: i64) -> Result<Post, StorageError>;
    async fn list_posts(&self, query: &KeysetQuery<PostScope>) -> Result<Vec<Post>, StorageError>;
    async fn set_comments_enabled(&self, post_id: i64, enabled: bool) -> Result<(), StorageError>;
}

#[async_trait]
pub trait CommentStorage: Send + Sync {
    async fn create_comment(&self, comment: &NewComment) -> Result<Comment, StorageError>;
    async fn get_comment(&self, comment_id: i64) -> Result<Comment, StorageError>;
    /// Every comment of a post, replies included.
    async fn list_comments(
        &self,
        query: &KeysetQuery<CommentScope>,
    ) -> Result<Vec<Comment>, StorageError>;
    /// Direct replies to one comment.
    async fn list_replies(
        &self,
        query: &KeysetQuery<ReplyScope>,
    ) -> Result<Vec<Comment>, StorageError>;
}

/// Unified supertrait for code that needs access to all storage domains.
pub trait Storage: PostStorage + CommentStorage {}

impl<T> Storage for T where T: PostStorage + CommentStorage {}

// ---------------------------------------------------------------------------
// Migration helpers
// ---------------------------------------------------------------------------

pub async fn migrate() -> Result<(), StorageError> {
    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| StorageError::MissingDatabaseUrl)?;
    let pool = sqlx::PgPool::connect(&database_url)
        .await
        .map_err(|error| StorageError::Database(error.to_string()))?;
    migrate_with_pool(&pool).await?;
    pool.close().await;
    Ok(())
}

pub async fn migrate_with_pool(pool: &sqlx::PgPool) -> Result<(), StorageError> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .map_err(|error| StorageError::Migration(error.to_string()))?;
    tracing::info!("database migrations applied");
    Ok(())
}
