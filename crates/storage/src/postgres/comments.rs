use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use threadline_core::pagination::{CommentScope, KeysetQuery, ReplyScope};
use threadline_core::{Comment, NewComment};
use time::OffsetDateTime;

use super::{database_error, foreign_key_constraint, keyset::push_keyset, PostgresStorage};
use crate::{CommentStorage, StorageError};

const COMMENT_COLUMNS: &str = "id, post_id, parent_id, author_id, body, created_at";

const PARENT_FOREIGN_KEY: &str = "comments_parent_id_fkey";

fn missing_reference(constraint: &str) -> StorageError {
    if constraint == PARENT_FOREIGN_KEY {
        StorageError::CommentNotFound
    } else {
        StorageError::PostNotFound
    }
}

#[async_trait]
impl CommentStorage for PostgresStorage {
    async fn create_comment(&self, comment: &NewComment) -> Result<Comment, StorageError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            r#"
            INSERT INTO comments (post_id, parent_id, author_id, body)
            VALUES ($1, $2, $3, $4)
            RETURNING {COMMENT_COLUMNS}
            "#
        ))
        .bind(comment.post_id)
        .bind(comment.parent_id)
        .bind(comment.author_id)
        .bind(&comment.body)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| match foreign_key_constraint(&error) {
            Some(constraint) => missing_reference(constraint),
            None => database_error(error),
        })?;
        Ok(row.into())
    }

    async fn get_comment(&self, comment_id: i64) -> Result<Comment, StorageError> {
        let row = sqlx::query_as::<_, CommentRow>(&format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE id = $1"
        ))
        .bind(comment_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| match error {
            sqlx::Error::RowNotFound => StorageError::CommentNotFound,
            _ => database_error(error),
        })?;
        Ok(row.into())
    }

    async fn list_comments(
        &self,
        query: &KeysetQuery<CommentScope>,
    ) -> Result<Vec<Comment>, StorageError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = "
        ));
        builder.push_bind(query.scope().post_id);
        push_keyset(&mut builder, query);
        self.fetch_comments(builder).await
    }

    async fn list_replies(
        &self,
        query: &KeysetQuery<ReplyScope>,
    ) -> Result<Vec<Comment>, StorageError> {
        let scope = query.scope();
        let mut builder = QueryBuilder::<Postgres>::new(format!(
            "SELECT {COMMENT_COLUMNS} FROM comments WHERE post_id = "
        ));
        builder
            .push_bind(scope.post_id)
            .push(" AND parent_id = ")
            .push_bind(scope.parent_id);
        push_keyset(&mut builder, query);
        self.fetch_comments(builder).await
    }
}

impl PostgresStorage {
    async fn fetch_comments(
        &self,
        mut builder: QueryBuilder<'_, Postgres>,
    ) -> Result<Vec<Comment>, StorageError> {
        let rows = builder
            .build_query_as::<CommentRow>()
            .fetch_all(&self.pool)
            .await
            .map_err(database_error)?;
        Ok(rows.into_iter().map(Comment::from).collect())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CommentRow {
    id: i64,
    post_id: i64,
    parent_id: Option<i64>,
    author_id: i64,
    body: String,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for Comment {
    fn from(value: CommentRow) -> Self {
        Self {
            id: value.id,
            post_id: value.post_id,
            parent_id: value.parent_id,
            author_id: value.author_id,
            body: value.body,
            created_at: value.created_at,
        }
    }
}
