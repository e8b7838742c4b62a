use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use threadline_core::pagination::{KeysetQuery, PostScope};
use threadline_core::{NewPost, Post};
use time::OffsetDateTime;

use super::{database_error, keyset::push_keyset, PostgresStorage};
use crate::{PostStorage, StorageError};

const POST_COLUMNS: &str = "id, title, body, author_id, comments_enabled, created_at";

#[async_trait]
impl PostStorage for PostgresStorage {
    async fn ping(&self) -> Result<(), StorageError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(())
    }

    async fn create_post(&self, post: &NewPost) -> Result<Post, StorageError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            r#"
            INSERT INTO posts (title, body, author_id, comments_enabled)
            VALUES ($1, $2, $3, $4)
            RETURNING {POST_COLUMNS}
            "#
        ))
        .bind(&post.title)
        .bind(&post.body)
        .bind(post.author_id)
        .bind(post.comments_enabled)
        .fetch_one(&self.pool)
        .await
        .map_err(database_error)?;
        Ok(row.into())
    }

    async fn get_post(&self, post_id: i64) -> Result<Post, StorageError> {
        let row = sqlx::query_as::<_, PostRow>(&format!(
            "SELECT {POST_COLUMNS} FROM posts WHERE id = $1"
        ))
        .bind(post_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::RowNotFound => StorageError::PostNotFound,
            _ => database_error(error),
        })?;
        Ok(row.into())
    }

    async fn list_posts(&self, query: &KeysetQuery<PostScope>) -> Result<Vec<Post>, StorageError> {
        let mut builder =
            QueryBuilder::<Postgres>::new(format!("SELECT {POST_COLUMNS} FROM posts WHERE TRUE"));
        push_keyset(&mut builder, query);
        let rows = builder
            .build_query_as::<PostRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(rows.into_iter().map(Post::from).collect())
    }

    async fn set_comments_enabled(&self, post_id: i64, enabled: bool) -> Result<(), StorageError> {
        let result = sqlx::query("UPDATE posts SET comments_enabled = $2 WHERE id = $1")
            .bind(post_id)
            .bind(enabled)
            .execute(&self.pool)
            .await
            .map_err(database_error)?;
        if result.rows_affected() == 0 {
            return Err(StorageError::PostNotFound);
        }
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PostRow {
    id: i64,
    title: String,
    body: String,
    author_id: i64,
    comments_enabled: bool,
    created_at: OffsetDateTime,
}

impl From<PostRow> for Post {
    fn from(value: PostRow) -> Self {
        Self {
            id: value.id,
            title: value.title,
            body: value.body,
            author_id: value.author_id,
            comments_enabled: value.comments_enabled,
            created_at: value.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use threadline_core::pagination::{Direction, KeysetQuery, Keyed, PostScope};

    use super::super::test_support::*;

    #[tokio::test]
    async fn post_crud_and_comment_toggle() {
        let Some(storage) = test_storage().await else {
            return;
        };

        let created = storage
            .create_post(&post_input(11, "hello"))
            .await
            .expect("create post");
        assert_eq!(created.author_id, 11);
        assert!(created.comments_enabled);

        storage
            .set_comments_enabled(created.id, false)
            .await
            .expect("disable comments");
        let fetched = storage.get_post(created.id).await.expect("get post");
        assert!(!fetched.comments_enabled);
        assert_eq!(fetched.title, "hello");

        let missing = storage
            .get_post(created.id + 1_000)
            .await
            .expect_err("missing post");
        assert_eq!(missing, StorageError::PostNotFound);

        let missing_toggle = storage
            .set_comments_enabled(created.id + 1_000, true)
            .await
            .expect_err("missing post toggle");
        assert_eq!(missing_toggle, StorageError::PostNotFound);
    }

    #[tokio::test]
    async fn list_posts_pages_in_both_directions() {
        let Some(storage) = test_storage().await else {
            return;
        };

        let mut created = Vec::new();
        for index in 0..5 {
            created.push(
                storage
                    .create_post(&post_input(1, &format!("post-{index}")))
                    .await
                    .expect("seed post"),
            );
        }
        let ids = |posts: &[threadline_core::Post]| posts.iter().map(|p| p.id).collect::<Vec<_>>();

        let first = storage
            .list_posts(&KeysetQuery::first_page(PostScope, 3))
            .await
            .expect("first page");
        assert_eq!(ids(&first), vec![created[4].id, created[3].id, created[2].id]);

        let at = created[2].position();
        let older = storage
            .list_posts(
                &KeysetQuery::plan(PostScope, Some(at), Some(Direction::After), 10)
                    .expect("plan after"),
            )
            .await
            .expect("older");
        assert_eq!(ids(&older), vec![created[1].id, created[0].id]);

        let newer = storage
            .list_posts(
                &KeysetQuery::plan(PostScope, Some(at), Some(Direction::Before), 10)
                    .expect("plan before"),
            )
            .await
            .expect("newer");
        assert_eq!(ids(&newer), vec![created[3].id, created[4].id]);
    }
}
