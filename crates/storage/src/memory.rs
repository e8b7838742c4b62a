use std::collections::BTreeMap;

use async_trait::async_trait;
use threadline_core::pagination::{CommentScope, KeysetQuery, Keyed, PostScope, ReplyScope};
use threadline_core::{Comment, NewComment, NewPost, Post};
use time::OffsetDateTime;
use tokio::sync::RwLock;

use crate::{CommentStorage, PostStorage, StorageError};

/// Process-local storage backend. Ids start at 1 and increase by one per
/// insert in each collection.
#[derive(Default)]
pub struct MemoryStorage {
    state: RwLock<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    posts: BTreeMap<i64, Post>,
    comments: BTreeMap<i64, Comment>,
    last_post_id: i64,
    last_comment_id: i64,
}

impl MemoryStorage {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a post with an explicit creation time.
    pub async fn create_post_at(
        &self,
        post: &NewPost,
        created_at: OffsetDateTime,
    ) -> Result<Post, StorageError> {
        let mut state = self.state.write().await;
        state.last_post_id += 1;
        let created = Post {
            id: state.last_post_id,
            title: post.title.clone(),
            body: post.body.clone(),
            author_id: post.author_id,
            comments_enabled: post.comments_enabled,
            created_at,
        };
        state.posts.insert(created.id, created.clone());
        Ok(created)
    }

    /// Inserts a comment with an explicit creation time.
    pub async fn create_comment_at(
        &self,
        comment: &NewComment,
        created_at: OffsetDateTime,
    ) -> Result<Comment, StorageError> {
        let mut state = self.state.write().await;
        if !state.posts.contains_key(&comment.post_id) {
            return Err(StorageError::PostNotFound);
        }
        if let Some(parent_id) = comment.parent_id {
            if !state.comments.contains_key(&parent_id) {
                return Err(StorageError::CommentNotFound);
            }
        }
        state.last_comment_id += 1;
        let created = Comment {
            id: state.last_comment_id,
            post_id: comment.post_id,
            parent_id: comment.parent_id,
            author_id: comment.author_id,
            body: comment.body.clone(),
            created_at,
        };
        state.comments.insert(created.id, created.clone());
        Ok(created)
    }
}

/// Applies the seek predicate, order and limit of `query` to `rows`.
fn select<'a, T, S, I>(rows: I, query: &KeysetQuery<S>) -> Vec<T>
where
    T: Keyed + Clone + 'a,
    I: Iterator<Item = &'a T>,
{
    let mut selected = rows
        .filter(|row| query.admits(&row.position()))
        .cloned()
        .collect::<Vec<_>>();
    selected.sort_by(|left, right| query.compare(&left.position(), &right.position()));
    selected.truncate(query.limit());
    selected
}

#[async_trait]
impl PostStorage for MemoryStorage {
    async fn ping(&self) -> Result<(), StorageError> {
        Ok(())
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post, StorageError> {
        self.create_post_at(post, OffsetDateTime::now_utc()).await
    }

    async fn get_post(&self, post_id: i64) -> Result<Post, StorageError> {
        let state = self.state.read().await;
        state
            .posts
            .get(&post_id)
            .cloned()
            .ok_or(StorageError::PostNotFound)
    }

    async fn list_posts(&self, query: &KeysetQuery<PostScope>) -> Result<Vec<Post>, StorageError> {
        let state = self.state.read().await;
        Ok(select(state.posts.values(), query))
    }

    async fn set_comments_enabled(&self, post_id: i64, enabled: bool) -> Result<(), StorageError> {
        let mut state = self.state.write().await;
        let post = state
            .posts
            .get_mut(&post_id)
            .ok_or(StorageError::PostNotFound)?;
        post.comments_enabled = enabled;
        Ok(())
    }
}

#[async_trait]
impl CommentStorage for MemoryStorage {
    async fn create_comment(&self, comment: &NewComment) -> Result<Comment, StorageError> {
        self.create_comment_at(comment, OffsetDateTime::now_utc())
            .await
    }

    async fn get_comment(&self, comment_id: i64) -> Result<Comment, StorageError> {
        let state = self.state.read().await;
        state
            .comments
            .get(&comment_id)
            .cloned()
            .ok_or(StorageError::CommentNotFound)
    }

    async fn list_comments(
        &self,
        query: &KeysetQuery<CommentScope>,
    ) -> Result<Vec<Comment>, StorageError> {
        let post_id = query.scope().post_id;
        let state = self.state.read().await;
        Ok(select(
            state
                .comments
                .values()
                .filter(|comment| comment.post_id == post_id),
            query,
        ))
    }

    async fn list_replies(
        &self,
        query: &KeysetQuery<ReplyScope>,
    ) -> Result<Vec<Comment>, StorageError> {
        let ReplyScope { post_id, parent_id } = *query.scope();
        let state = self.state.read().await;
        Ok(select(
            state.comments.values().filter(|comment| {
                comment.post_id == post_id && comment.parent_id == Some(parent_id)
            }),
            query,
        ))
    }
}

#[cfg(test)]
mod tests {
    use threadline_core::pagination::{Cursor, Direction};
    use time::macros::datetime;
    use time::Duration;

    use super::*;

    fn new_post(author_id: i64) -> NewPost {
        NewPost {
            author_id,
            title: "title".to_owned(),
            body: "body".to_owned(),
            comments_enabled: true,
        }
    }

    fn new_comment(post_id: i64, parent_id: Option<i64>) -> NewComment {
        NewComment {
            post_id,
            parent_id,
            author_id: 7,
            body: "comment".to_owned(),
        }
    }

    fn ids<T: Keyed>(rows: &[T]) -> Vec<i64> {
        rows.iter().map(|row| row.position().id).collect()
    }

    #[tokio::test]
    async fn post_crud_round_trip() {
        let storage = MemoryStorage::new();
        let created = storage.create_post(&new_post(3)).await.expect("create");
        assert_eq!(created.id, 1);
        assert!(created.comments_enabled);

        storage
            .set_comments_enabled(created.id, false)
            .await
            .expect("disable comments");
        let fetched = storage.get_post(created.id).await.expect("get post");
        assert!(!fetched.comments_enabled);

        assert_eq!(
            storage.get_post(99).await.expect_err("missing post"),
            StorageError::PostNotFound
        );
        assert_eq!(
            storage
                .set_comments_enabled(99, true)
                .await
                .expect_err("missing post"),
            StorageError::PostNotFound
        );
    }

    #[tokio::test]
    async fn list_posts_applies_keyset_query() {
        let storage = MemoryStorage::new();
        let base = datetime!(2024-06-01 00:00:00 UTC);
        for index in 0..5 {
            storage
                .create_post_at(&new_post(1), base + Duration::minutes(index))
                .await
                .expect("seed post");
        }

        let first = storage
            .list_posts(&KeysetQuery::first_page(PostScope, 3))
            .await
            .expect("first page");
        assert_eq!(ids(&first), vec![5, 4, 3]);

        let at = Cursor::new(base + Duration::minutes(2), 3);
        let older = storage
            .list_posts(
                &KeysetQuery::plan(PostScope, Some(at), Some(Direction::After), 10)
                    .expect("plan after"),
            )
            .await
            .expect("older");
        assert_eq!(ids(&older), vec![2, 1]);

        let newer = storage
            .list_posts(
                &KeysetQuery::plan(PostScope, Some(at), Some(Direction::Before), 10)
                    .expect("plan before"),
            )
            .await
            .expect("newer");
        assert_eq!(ids(&newer), vec![4, 5]);
    }

    #[tokio::test]
    async fn comments_and_replies_are_scoped() {
        let storage = MemoryStorage::new();
        let post_a = storage.create_post(&new_post(1)).await.expect("post a");
        let post_b = storage.create_post(&new_post(1)).await.expect("post b");

        let root = storage
            .create_comment(&new_comment(post_a.id, None))
            .await
            .expect("root");
        let reply = storage
            .create_comment(&new_comment(post_a.id, Some(root.id)))
            .await
            .expect("reply");
        storage
            .create_comment(&new_comment(post_b.id, None))
            .await
            .expect("other post");

        let comments = storage
            .list_comments(&KeysetQuery::first_page(
                CommentScope { post_id: post_a.id },
                10,
            ))
            .await
            .expect("comments");
        assert_eq!(ids(&comments), vec![reply.id, root.id]);

        let replies = storage
            .list_replies(&KeysetQuery::first_page(
                ReplyScope {
                    post_id: post_a.id,
                    parent_id: root.id,
                },
                10,
            ))
            .await
            .expect("replies");
        assert_eq!(ids(&replies), vec![reply.id]);

        let wrong_post = storage
            .list_replies(&KeysetQuery::first_page(
                ReplyScope {
                    post_id: post_b.id,
                    parent_id: root.id,
                },
                10,
            ))
            .await
            .expect("replies under other post");
        assert!(wrong_post.is_empty());
    }

    #[tokio::test]
    async fn create_comment_requires_post_and_parent() {
        let storage = MemoryStorage::new();
        assert_eq!(
            storage
                .create_comment(&new_comment(1, None))
                .await
                .expect_err("missing post"),
            StorageError::PostNotFound
        );

        let post = storage.create_post(&new_post(1)).await.expect("post");
        assert_eq!(
            storage
                .create_comment(&new_comment(post.id, Some(42)))
                .await
                .expect_err("missing parent"),
            StorageError::CommentNotFound
        );
        assert_eq!(
            storage.get_comment(42).await.expect_err("missing comment"),
            StorageError::CommentNotFound
        );
    }
}
