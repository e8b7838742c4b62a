use threadline_core::pagination::{InvalidPageRequest, PageError};
use threadline_storage::StorageError;

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum ServiceError {
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("not found")]
    NotFound,
    #[error("forbidden: {0}")]
    Forbidden(&'static str),
    #[error(transparent)]
    Upstream(StorageError),
}

impl ServiceError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }
}

impl From<StorageError> for ServiceError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::PostNotFound | StorageError::CommentNotFound => Self::NotFound,
            other => Self::Upstream(other),
        }
    }
}

impl From<InvalidPageRequest> for ServiceError {
    fn from(error: InvalidPageRequest) -> Self {
        Self::InvalidRequest(error.to_string())
    }
}

impl From<PageError<StorageError>> for ServiceError {
    fn from(error: PageError<StorageError>) -> Self {
        match error {
            PageError::InvalidRequest(error) => error.into(),
            PageError::Upstream(error) => Self::Upstream(error),
        }
    }
}

pub(crate) fn require_positive(value: i64, field: &str) -> Result<(), ServiceError> {
    if value <= 0 {
        return Err(ServiceError::invalid(format!("{field} must be > 0")));
    }
    Ok(())
}

pub(crate) fn require_text(value: &str, field: &str) -> Result<(), ServiceError> {
    if value.trim().is_empty() {
        return Err(ServiceError::invalid(format!("{field} is required")));
    }
    Ok(())
}
