use sqlx::{Postgres, QueryBuilder};
use threadline_core::pagination::{Comparison, KeysetQuery, SortOrder};

/// Appends the seek predicate, ordering and limit of `query` to a statement
/// whose `WHERE` clause is already open.
///
/// The row-value comparison `(created_at, id) < (a, b)` is the same predicate
/// as `created_at < a OR (created_at = a AND id < b)` and can use the
/// `(created_at, id)` indexes.
pub(super) fn push_keyset<S>(builder: &mut QueryBuilder<'_, Postgres>, query: &KeysetQuery<S>) {
    if let Some(seek) = query.seek() {
        let operator = match seek.comparison {
            Comparison::Less => "<",
            Comparison::Greater => ">",
        };
        builder
            .push(" AND (created_at, id) ")
            .push(operator)
            .push(" (")
            .push_bind(seek.cursor.created_at)
            .push(", ")
            .push_bind(seek.cursor.id)
            .push(")");
    }

    let direction = match query.order() {
        SortOrder::Ascending => "ASC",
        SortOrder::Descending => "DESC",
    };
    builder
        .push(" ORDER BY created_at ")
        .push(direction)
        .push(", id ")
        .push(direction)
        .push(" LIMIT ")
        .push_bind(i64::try_from(query.limit()).unwrap_or(i64::MAX));
}
