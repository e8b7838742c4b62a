#![forbid(unsafe_code)]

pub mod model;
pub mod pagination;

pub use model::{Comment, ErrorResponse, NewComment, NewPost, Post};
