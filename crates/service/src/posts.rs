use std::sync::Arc;

use threadline_core::pagination::{assemble_page, Page, PageRequest, PostScope};
use threadline_core::{NewPost, Post};
use threadline_storage::PostStorage;

use crate::error::{require_positive, require_text};
use crate::{ServiceError, POST_PAGE_LIMITS};

#[derive(Clone)]
pub struct PostService {
    storage: Arc<dyn PostStorage>,
}

impl PostService {
    #[must_use]
    pub fn new(storage: Arc<dyn PostStorage>) -> Self {
        Self { storage }
    }

    pub async fn create_post(&self, post: NewPost) -> Result<Post, ServiceError> {
        require_positive(post.author_id, "author_id")?;
        require_text(&post.title, "title")?;
        require_text(&post.body, "body")?;
        let created = self.storage.create_post(&post).await?;
        tracing::debug!(post_id = created.id, author_id = created.author_id, "post created");
        Ok(created)
    }

    pub async fn get_post(&self, post_id: i64) -> Result<Post, ServiceError> {
        require_positive(post_id, "post_id")?;
        Ok(self.storage.get_post(post_id).await?)
    }

    /// Newest-first page of all posts.
    pub async fn list_posts(&self, request: &PageRequest) -> Result<Page<Post>, ServiceError> {
        let storage = &self.storage;
        let page = assemble_page(POST_PAGE_LIMITS, request, PostScope, |query| async move {
            storage.list_posts(&query).await
        })
        .await?;
        Ok(page)
    }

    /// Turns comments on or off. Only the post's author may do this.
    pub async fn set_comments_enabled(
        &self,
        post_id: i64,
        user_id: i64,
        enabled: bool,
    ) -> Result<(), ServiceError> {
        require_positive(post_id, "post_id")?;
        require_positive(user_id, "user_id")?;
        let post = self.storage.get_post(post_id).await?;
        if post.author_id != user_id {
            return Err(ServiceError::Forbidden("not the post author"));
        }
        self.storage.set_comments_enabled(post_id, enabled).await?;
        tracing::debug!(post_id, enabled, "post comment permission changed");
        Ok(())
    }
}
