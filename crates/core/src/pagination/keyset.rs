use std::cmp::Ordering;

use super::Cursor;

/// Traversal direction relative to a cursor, in newest-first display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    /// Older records, strictly below the cursor.
    After,
    /// Newer records, strictly above the cursor.
    Before,
}

#[derive(Debug, thiserror::Error, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("direction must be set when a cursor is supplied")]
    DirectionUnset,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// Strict comparison a row's position must satisfy against the seek cursor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Comparison {
    Less,
    Greater,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Seek {
    pub cursor: Cursor,
    pub comparison: Comparison,
}

/// Every post.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PostScope;

/// Comments belonging to one post, replies included.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CommentScope {
    pub post_id: i64,
}

/// Direct replies to one comment within a post.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplyScope {
    pub post_id: i64,
    pub parent_id: i64,
}

/// Fetch plan a storage backend executes against a collection ordered
/// by `(created_at, id)`.
///
/// Backends filter rows by `scope` and [`KeysetQuery::admits`], sort them by
/// [`KeysetQuery::order`] and return at most [`KeysetQuery::limit`] rows in that
/// order. Ascending results are reversed by the page assembler, not the
/// backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeysetQuery<S> {
    scope: S,
    seek: Option<Seek>,
    order: SortOrder,
    limit: usize,
}

impl<S> KeysetQuery<S> {
    /// The `limit` most recent rows, newest first.
    #[must_use]
    pub fn first_page(scope: S, limit: usize) -> Self {
        Self {
            scope,
            seek: None,
            order: SortOrder::Descending,
            limit,
        }
    }

    pub fn plan(
        scope: S,
        cursor: Option<Cursor>,
        direction: Option<Direction>,
        limit: usize,
    ) -> Result<Self, PlanError> {
        let Some(cursor) = cursor else {
            return Ok(Self::first_page(scope, limit));
        };
        let direction = direction.ok_or(PlanError::DirectionUnset)?;
        let (comparison, order) = match direction {
            Direction::After => (Comparison::Less, SortOrder::Descending),
            Direction::Before => (Comparison::Greater, SortOrder::Ascending),
        };
        Ok(Self {
            scope,
            seek: Some(Seek { cursor, comparison }),
            order,
            limit,
        })
    }

    #[must_use]
    pub fn scope(&self) -> &S {
        &self.scope
    }

    #[must_use]
    pub fn seek(&self) -> Option<&Seek> {
        self.seek.as_ref()
    }

    #[must_use]
    pub fn order(&self) -> SortOrder {
        self.order
    }

    #[must_use]
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Whether rows come back oldest first and must be reversed for display.
    #[must_use]
    pub fn is_reversed(&self) -> bool {
        self.order == SortOrder::Ascending
    }

    /// Evaluates the seek predicate for a row at `position`.
    #[must_use]
    pub fn admits(&self, position: &Cursor) -> bool {
        let Some(seek) = &self.seek else {
            return true;
        };
        let ordering = position_cmp(position, &seek.cursor);
        match seek.comparison {
            Comparison::Less => ordering == Ordering::Less,
            Comparison::Greater => ordering == Ordering::Greater,
        }
    }

    /// Row ordering this query asks for.
    #[must_use]
    pub fn compare(&self, left: &Cursor, right: &Cursor) -> Ordering {
        let ordering = position_cmp(left, right);
        match self.order {
            SortOrder::Ascending => ordering,
            SortOrder::Descending => ordering.reverse(),
        }
    }
}

/// Composite `(created_at, id)` order.
#[must_use]
pub fn position_cmp(left: &Cursor, right: &Cursor) -> Ordering {
    left.created_at
        .cmp(&right.created_at)
        .then(left.id.cmp(&right.id))
}
