use std::future::Future;

use serde::{Deserialize, Serialize};

use super::{Cursor, CursorError, Direction, KeysetQuery, PlanError};

/// Records that can report their own position in the `(created_at, id)` order.
pub trait Keyed {
    fn position(&self) -> Cursor;
}

/// Client-supplied page parameters. Cursor tokens are opaque and at most one of
/// `before`/`after` may be set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    #[serde(default)]
    pub limit: i64,
    #[serde(default)]
    pub before: Option<String>,
    #[serde(default)]
    pub after: Option<String>,
}

impl PageRequest {
    #[must_use]
    pub fn first(limit: i64) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn after(limit: i64, token: impl Into<String>) -> Self {
        Self {
            limit,
            after: Some(token.into()),
            before: None,
        }
    }

    #[must_use]
    pub fn before(limit: i64, token: impl Into<String>) -> Self {
        Self {
            limit,
            before: Some(token.into()),
            after: None,
        }
    }

    /// Builds the fetch for this request with `fetch_limit` rows.
    pub fn to_query<S>(
        &self,
        scope: S,
        fetch_limit: usize,
    ) -> Result<KeysetQuery<S>, InvalidPageRequest> {
        let before = non_empty(self.before.as_deref());
        let after = non_empty(self.after.as_deref());
        let (token, direction) = match (before, after) {
            (Some(_), Some(_)) => return Err(InvalidPageRequest::ConflictingCursors),
            (None, None) => return Ok(KeysetQuery::first_page(scope, fetch_limit)),
            (Some(token), None) => (token, Direction::Before),
            (None, Some(token)) => (token, Direction::After),
        };
        let cursor = Cursor::decode(Some(token))?;
        Ok(KeysetQuery::plan(scope, cursor, Some(direction), fetch_limit)?)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|token| !token.is_empty())
}

/// Default and maximum page sizes of one collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageLimits {
    pub default: usize,
    pub max: usize,
}

impl PageLimits {
    #[must_use]
    pub const fn new(default: usize, max: usize) -> Self {
        Self { default, max }
    }

    /// Effective page size: the default for non-positive requests, clamped to
    /// `max`, never zero.
    #[must_use]
    pub fn resolve(&self, requested: i64) -> usize {
        let requested = match usize::try_from(requested) {
            Ok(value) if value > 0 => value,
            _ => self.default,
        };
        requested.min(self.max).max(1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub count: usize,
    pub start_cursor: Option<String>,
    pub end_cursor: Option<String>,
    pub has_next_page: bool,
}

impl<T> Page<T> {
    #[must_use]
    pub fn empty() -> Self {
        Self {
            items: Vec::new(),
            count: 0,
            start_cursor: None,
            end_cursor: None,
            has_next_page: false,
        }
    }
}

impl<T: Keyed> Page<T> {
    /// Trims a peek-ahead fetch down to `limit` rows.
    ///
    /// `rows` are in fetch order. The row past `limit` is the peek row and only
    /// signals that another page exists. Reversed fetches are flipped back to
    /// newest first before the boundary cursors are taken.
    #[must_use]
    pub fn from_rows(mut rows: Vec<T>, limit: usize, reversed: bool) -> Self {
        if rows.is_empty() {
            return Self::empty();
        }
        let has_next_page = rows.len() > limit;
        rows.truncate(limit);
        if reversed {
            rows.reverse();
        }
        let start_cursor = rows.first().map(|item| item.position().encode());
        let end_cursor = rows.last().map(|item| item.position().encode());
        Self {
            count: rows.len(),
            items: rows,
            start_cursor,
            end_cursor,
            has_next_page,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum InvalidPageRequest {
    #[error("before and after cursors are mutually exclusive")]
    ConflictingCursors,
    #[error(transparent)]
    Cursor(#[from] CursorError),
    #[error(transparent)]
    Plan(#[from] PlanError),
}

#[derive(Debug, thiserror::Error)]
pub enum PageError<E> {
    #[error("invalid page request: {0}")]
    InvalidRequest(#[from] InvalidPageRequest),
    #[error(transparent)]
    Upstream(E),
}

/// Reads one page of a scoped collection.
///
/// Fetches `limit + 1` rows through `fetch` so the presence of a further page
/// can be detected without a count query. Request errors are reported before
/// `fetch` runs and storage errors are returned unchanged; no partial page is
/// ever produced.
pub async fn assemble_page<S, T, E, F, Fut>(
    limits: PageLimits,
    request: &PageRequest,
    scope: S,
    fetch: F,
) -> Result<Page<T>, PageError<E>>
where
    T: Keyed,
    F: FnOnce(KeysetQuery<S>) -> Fut,
    Fut: Future<Output = Result<Vec<T>, E>>,
{
    let limit = limits.resolve(request.limit);
    let query = request.to_query(scope, limit.saturating_add(1))?;
    let reversed = query.is_reversed();
    let rows = fetch(query).await.map_err(PageError::Upstream)?;
    Ok(Page::from_rows(rows, limit, reversed))
}
