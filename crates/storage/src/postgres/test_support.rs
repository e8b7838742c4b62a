use sqlx::postgres::PgPoolOptions;
use threadline_core::{NewComment, NewPost};

use super::PostgresStorage;

// Re-export all domain traits so test modules can `use super::super::test_support::*`
// and have every trait method available on PostgresStorage.
#[allow(unused_imports)]
pub(super) use crate::{CommentStorage, PostStorage, Storage, StorageError};

pub(super) async fn test_storage() -> Option<PostgresStorage> {
    let database_url = match std::env::var("DATABASE_URL") {
        Ok(value) => value,
        Err(_) => return None,
    };

    // Each test gets its own schema for full isolation when running in parallel.
    let schema = format!("test_{}", uuid::Uuid::new_v4().simple());
    let mut opts: sqlx::postgres::PgConnectOptions =
        database_url.parse().expect("parse DATABASE_URL");
    opts = opts.options([("search_path", schema.as_str())]);
    let pool = PgPoolOptions::new()
        .max_connections(2)
        .connect_with(opts)
        .await
        .expect("connect test database");
    sqlx::query(&format!("CREATE SCHEMA \"{schema}\""))
        .execute(&pool)
        .await
        .expect("create test schema");

    crate::migrate_with_pool(&pool)
        .await
        .expect("apply migrations");
    Some(PostgresStorage::from_pool(pool))
}

pub(super) fn post_input(author_id: i64, title: &str) -> NewPost {
    NewPost {
        author_id,
        title: title.to_owned(),
        body: format!("{title} body"),
        comments_enabled: true,
    }
}

pub(super) fn comment_input(post_id: i64, parent_id: Option<i64>, body: &str) -> NewComment {
    NewComment {
        post_id,
        parent_id,
        author_id: 1,
        body: body.to_owned(),
    }
}
