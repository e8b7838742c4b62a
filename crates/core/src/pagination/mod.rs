//! Keyset pagination over collections ordered by `(created_at, id)`, newest
//! first.

mod cursor;
mod keyset;
mod page;

pub use cursor::{Cursor, CursorError};
pub use keyset::{
    position_cmp, CommentScope, Comparison, Direction, KeysetQuery, PlanError, PostScope,
    ReplyScope, Seek, SortOrder,
};
pub use page::{assemble_page, InvalidPageRequest, Keyed, Page, PageError, PageLimits, PageRequest};
