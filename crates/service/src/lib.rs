#![forbid(unsafe_code)]

mod comments;
mod error;
mod posts;

pub use comments::CommentService;
pub use error::ServiceError;
pub use posts::PostService;

use threadline_core::pagination::PageLimits;

pub const POST_PAGE_LIMITS: PageLimits = PageLimits::new(50, 250);
pub const COMMENT_PAGE_LIMITS: PageLimits = PageLimits::new(50, 250);
