#![forbid(unsafe_code)]

mod comments;
mod keyset;
mod posts;

#[cfg(test)]
mod test_support;

use sqlx::PgPool;

use crate::StorageError;

#[derive(Clone)]
pub struct PostgresStorage {
    pool: PgPool,
}

impl PostgresStorage {
    pub async fn connect(database_url: &str) -> Result<Self, StorageError> {
        let pool = PgPool::connect(database_url)
            .await
            .map_err(database_error)?;
        Ok(Self { pool })
    }

    #[must_use]
    pub fn from_pool(pool: PgPool) -> Self {
        Self { pool }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(self) {
        self.pool.close().await;
    }
}

pub(crate) fn database_error(error: sqlx::Error) -> StorageError {
    StorageError::Database(error.to_string())
}

/// Name of the violated foreign key, if `error` is a foreign key violation.
pub(crate) fn foreign_key_constraint(error: &sqlx::Error) -> Option<&str> {
    match error {
        sqlx::Error::Database(db_error) if db_error.code().as_deref() == Some("23503") => {
            Some(db_error.constraint().unwrap_or_default())
        }
        _ => None,
    }
}
