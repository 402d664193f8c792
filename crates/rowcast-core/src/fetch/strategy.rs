//! Terminal fetch strategies.
//!
//! Every strategy drains a non-auto-closing cursor inside `with_cursor`, so
//! the cursor is released exactly once whatever the outcome.

use crate::{
    config::HintPolicy,
    cursor::{Cursor, with_cursor},
    error::InternalError,
    fetch::ResponseError,
    obs::{FetchKind, sink::FetchSpan},
    result_set::RowSet,
    row::Row,
    source::ResultQuery,
};
use tracing::debug;

fn scoped<Q, T>(
    query: &Q,
    f: impl FnOnce(&mut Cursor) -> Result<T, InternalError>,
) -> Result<T, InternalError>
where
    Q: ResultQuery + ?Sized,
{
    let cursor = Cursor::open_non_auto_closing(query)?;

    with_cursor(cursor, f)
}

/// Drain every row.
pub(crate) fn all<Q: ResultQuery + ?Sized>(query: &Q) -> Result<RowSet, InternalError> {
    let span = FetchSpan::new(FetchKind::All);
    let result = scoped(query, Cursor::fetch_rest);
    span.settle(&result, |rows| rows.len());

    result
}

/// First row or `None`. Extra rows are drained and discarded unless the
/// query carries the single-row hint, in which case reading stops early.
pub(crate) fn one<Q: ResultQuery + ?Sized>(query: &Q) -> Result<Option<Row>, InternalError> {
    let hinted = query.single_row_hint() == Some(true);
    let span = FetchSpan::new(FetchKind::One);

    let result = scoped(query, |cursor| {
        let first = cursor.fetch_next()?;
        if first.is_some() && !hinted {
            let mut discarded = 0usize;
            while cursor.fetch_next()?.is_some() {
                discarded += 1;
            }
            if discarded > 0 {
                debug!(discarded, "fetch_one discarded trailing rows");
            }
        }

        Ok(first)
    });
    span.settle(&result, |row| usize::from(row.is_some()));

    result
}

/// Exactly one row.
///
/// With the single-row hint and `HintPolicy::Trust`, only the first row is
/// read and the many-row check is skipped.
pub(crate) fn single<Q: ResultQuery + ?Sized>(query: &Q) -> Result<Row, InternalError> {
    let trusted = query.single_row_hint() == Some(true)
        && query.config().single_row_hint == HintPolicy::Trust;
    let span = FetchSpan::new(FetchKind::Single);

    let result = scoped(query, |cursor| {
        let first = cursor.fetch_next()?.ok_or(ResponseError::TooFewRows)?;
        if !trusted && cursor.fetch_next()?.is_some() {
            return Err(ResponseError::TooManyRows.into());
        }

        Ok(first)
    });
    span.settle(&result, |_| 1);

    result
}

/// At most one row read; nothing materialized.
pub(crate) fn any<Q: ResultQuery + ?Sized>(query: &Q) -> Result<Option<Row>, InternalError> {
    let span = FetchSpan::new(FetchKind::Any);
    let result = scoped(query, Cursor::fetch_next);
    span.settle(&result, |row| usize::from(row.is_some()));

    result
}

/// One row set per result set produced by the statement.
pub(crate) fn many<Q: ResultQuery + ?Sized>(query: &Q) -> Result<Vec<RowSet>, InternalError> {
    let span = FetchSpan::new(FetchKind::Many);

    let result = query.open_many().and_then(|sources| {
        // Wrap every source first so the unread ones still close on error.
        let cursors = sources
            .into_iter()
            .map(|source| Cursor::from_source(source, false))
            .collect::<Vec<_>>();

        cursors
            .into_iter()
            .map(|cursor| with_cursor(cursor, Cursor::fetch_rest))
            .collect::<Result<Vec<_>, _>>()
    });
    span.settle(&result, |sets| sets.iter().map(|rows| rows.len()).sum());

    result
}

/// Visit every row without materializing; the handler's error stops the scan.
pub(crate) fn each<Q, F>(query: &Q, mut handler: F) -> Result<usize, InternalError>
where
    Q: ResultQuery + ?Sized,
    F: FnMut(Row) -> Result<(), InternalError>,
{
    let span = FetchSpan::new(FetchKind::Lazy);
    let result = scoped(query, |cursor| {
        while let Some(row) = cursor.fetch_next()? {
            handler(row)?;
        }

        Ok(cursor.rows_read())
    });
    span.settle(&result, |rows| *rows);

    result
}

/// Build any `FromIterator<Row>` collection from a scoped cursor.
pub(crate) fn collect<Q, C>(query: &Q) -> Result<C, InternalError>
where
    Q: ResultQuery + ?Sized,
    C: FromIterator<Row>,
{
    let span = FetchSpan::new(FetchKind::All);
    let mut rows = 0usize;
    let result = scoped(query, |cursor| {
        let collected = cursor.by_ref().collect::<Result<C, _>>();
        rows = cursor.rows_read();
        collected
    });
    span.settle(&result, |_| rows);

    result
}

/// Materialize, then index the rows under a `Map` or `Group` span.
pub(crate) fn indexed<Q, T>(
    query: &Q,
    kind: FetchKind,
    build: impl FnOnce(RowSet) -> Result<T, InternalError>,
    size: impl FnOnce(&T) -> usize,
) -> Result<T, InternalError>
where
    Q: ResultQuery + ?Sized,
{
    let span = FetchSpan::new(kind);
    let result = all(query).and_then(build);
    span.settle(&result, size);

    result
}
