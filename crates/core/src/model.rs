use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::pagination::{Cursor, Keyed};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub body: String,
    pub author_id: i64,
    pub comments_enabled: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub post_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub body: String,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl Keyed for Post {
    fn position(&self) -> Cursor {
        Cursor::new(self.created_at, self.id)
    }
}

impl Keyed for Comment {
    fn position(&self) -> Cursor {
        Cursor::new(self.created_at, self.id)
    }
}

/// Input for creating a post. Storage assigns the id and timestamp.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewPost {
    pub author_id: i64,
    pub title: String,
    pub body: String,
    #[serde(default = "comments_enabled_default")]
    pub comments_enabled: bool,
}

/// Input for creating a comment, or a reply when `parent_id` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewComment {
    pub post_id: i64,
    #[serde(default)]
    pub parent_id: Option<i64>,
    pub author_id: i64,
    pub body: String,
}

fn comments_enabled_default() -> bool {
    true
}

/// ErrorResponse represents an error response from HTTP JSON APIs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    #[serde(rename = "error")]
    pub error: String,
}
