//! Lazy cursor over an opened row source.
//!
//! States move `Open → Exhausted | Closed`; `Closed` is terminal and reachable
//! from any state. Reading past the end is a quiet `None`. The source is
//! released exactly once: by `close`, by auto-close, or on drop.

use crate::{
    error::{ErrorOrigin, InternalError},
    obs::{MetricsEvent, sink::record},
    result_set::RowSet,
    row::Row,
    schema::Schema,
    source::{ResultQuery, RowSource},
    value::Value,
};
use std::{fmt, sync::Arc};
use tracing::{debug, warn};

///
/// CursorState
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum CursorState {
    Open,
    Exhausted,
    Closed,
}

///
/// Cursor
///
/// Single-owner, single-pass iterator over rows. Auto-closing cursors
/// release the source at end of data and on a read error; non-auto-closing
/// cursors stay open until the owner closes or drops them.
///

pub struct Cursor {
    source: Option<Box<dyn RowSource>>,
    schema: Arc<Schema>,
    coerced: bool,
    state: CursorState,
    auto_close: bool,
    rows_read: usize,
}

impl Cursor {
    /// Execute the query and return an auto-closing cursor.
    pub fn open<Q: ResultQuery + ?Sized>(query: &Q) -> Result<Self, InternalError> {
        query.open().map(|source| Self::from_source(source, true))
    }

    /// Execute the query; the returned cursor stays open at end of data.
    pub fn open_non_auto_closing<Q: ResultQuery + ?Sized>(
        query: &Q,
    ) -> Result<Self, InternalError> {
        query.open().map(|source| Self::from_source(source, false))
    }

    #[must_use]
    pub fn from_source(source: Box<dyn RowSource>, auto_close: bool) -> Self {
        let schema = source.schema();
        record(MetricsEvent::CursorOpen);
        debug!(fields = schema.len(), auto_close, "cursor opened");

        Self {
            source: Some(source),
            schema,
            coerced: false,
            state: CursorState::Open,
            auto_close,
            rows_read: 0,
        }
    }

    #[must_use]
    pub const fn state(&self) -> CursorState {
        self.state
    }

    #[must_use]
    pub const fn rows_read(&self) -> usize {
        self.rows_read
    }

    #[must_use]
    pub const fn schema(&self) -> &Arc<Schema> {
        &self.schema
    }

    #[must_use]
    pub const fn is_auto_closing(&self) -> bool {
        self.auto_close
    }

    /// Re-label rows onto a declared schema of the same width, coercing each
    /// value to the declared field type.
    pub fn coerce(mut self, schema: Schema) -> Result<Self, InternalError> {
        if schema.len() != self.schema.len() {
            return Err(InternalError::conversion(
                ErrorOrigin::Cursor,
                format!(
                    "cannot coerce {} fields onto a schema of {}",
                    self.schema.len(),
                    schema.len()
                ),
            ));
        }

        self.schema = Arc::new(schema);
        self.coerced = true;

        Ok(self)
    }

    /// Next row, or `None` once exhausted or closed.
    pub fn fetch_next(&mut self) -> Result<Option<Row>, InternalError> {
        if self.state != CursorState::Open {
            return Ok(None);
        }
        let next = match self.source.as_mut() {
            Some(source) => source.next_values(),
            None => {
                self.state = CursorState::Closed;
                return Ok(None);
            }
        };

        let read = next.and_then(|values| values.map(|values| self.build_row(values)).transpose());

        match read {
            Ok(Some(row)) => {
                self.rows_read += 1;
                Ok(Some(row))
            }
            Ok(None) => {
                self.state = CursorState::Exhausted;
                if self.auto_close {
                    self.close()?;
                }
                Ok(None)
            }
            Err(err) => {
                if self.auto_close {
                    self.close_after_error(&err);
                }
                Err(err)
            }
        }
    }

    fn build_row(&self, values: Vec<Value>) -> Result<Row, InternalError> {
        if !self.coerced {
            return Row::new(Arc::clone(&self.schema), values);
        }

        let coerced = values
            .into_iter()
            .zip(self.schema.fields())
            .map(|(value, field)| value.coerce_to(field.data_type()))
            .collect::<Result<Vec<_>, _>>()?;

        Row::new(Arc::clone(&self.schema), coerced)
    }

    /// Read up to `n` further rows.
    pub fn fetch_next_n(&mut self, n: usize) -> Result<RowSet, InternalError> {
        let mut rows = Vec::with_capacity(n.min(1024));
        while rows.len() < n {
            match self.fetch_next()? {
                Some(row) => rows.push(row),
                None => break,
            }
        }

        Ok(RowSet::new(Arc::clone(&self.schema), rows))
    }

    /// Drain every remaining row.
    pub fn fetch_rest(&mut self) -> Result<RowSet, InternalError> {
        let mut rows = Vec::new();
        while let Some(row) = self.fetch_next()? {
            rows.push(row);
        }

        Ok(RowSet::new(Arc::clone(&self.schema), rows))
    }

    /// Release the source. Idempotent; only the first call reaches it.
    pub fn close(&mut self) -> Result<(), InternalError> {
        self.state = CursorState::Closed;
        let Some(mut source) = self.source.take() else {
            return Ok(());
        };

        let result = source.close();
        record(MetricsEvent::CursorClose {
            rows_read: u64::try_from(self.rows_read).unwrap_or(u64::MAX),
            failed: result.is_err(),
        });
        debug!(rows_read = self.rows_read, ok = result.is_ok(), "cursor closed");

        result
    }

    // The read error is the one reported; a close failure behind it is logged.
    fn close_after_error(&mut self, primary: &InternalError) {
        if let Err(close) = self.close() {
            warn!(
                primary = %primary.display_with_class(),
                close = %close.display_with_class(),
                "cursor close failed after read error"
            );
        }
    }
}

impl Iterator for Cursor {
    type Item = Result<Row, InternalError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.fetch_next().transpose()
    }
}

impl Drop for Cursor {
    fn drop(&mut self) {
        if let Err(err) = self.close() {
            warn!(error = %err.display_with_class(), "cursor close failed on drop");
        }
    }
}

impl fmt::Debug for Cursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cursor")
            .field("state", &self.state)
            .field("auto_close", &self.auto_close)
            .field("rows_read", &self.rows_read)
            .field("fields", &self.schema.len())
            .finish_non_exhaustive()
    }
}

/// Run `f` over the cursor, then close it on every exit path.
///
/// A primary error from `f` wins over a close error; a close error with no
/// primary error is returned.
pub fn with_cursor<T>(
    mut cursor: Cursor,
    f: impl FnOnce(&mut Cursor) -> Result<T, InternalError>,
) -> Result<T, InternalError> {
    let result = f(&mut cursor);
    let closed = cursor.close();

    match (result, closed) {
        (Ok(value), Ok(())) => Ok(value),
        (Ok(_), Err(close)) => Err(close),
        (Err(primary), Ok(())) => Err(primary),
        (Err(primary), Err(close)) => {
            warn!(
                primary = %primary.display_with_class(),
                close = %close.display_with_class(),
                "cursor close failed behind a primary error"
            );
            Err(primary)
        }
    }
}

///
/// TESTS
///
