//! Pull-based delivery.
//!
//! `LazyRows` defers execution to the first `next` call and is finite and
//! non-restartable. `RowStream` is its async counterpart: a producer on the
//! worker pool feeds a bounded channel, so reading blocks on capacity.

use crate::{
    cursor::Cursor,
    deliver::future::WorkerPool,
    error::InternalError,
    obs::{DeliveryKind, MetricsEvent, sink::record},
    row::Row,
    source::ResultQuery,
};
use std::fmt;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::debug;

/// Async row stream backed by a bounded channel.
pub type RowStream = ReceiverStream<Result<Row, InternalError>>;

///
/// LazyState
///

enum LazyState {
    Pending,
    Open(Cursor),
    Done,
}

///
/// LazyRows
///
/// Iterator over the rows of a query that is executed on first use.
///

pub struct LazyRows<'q, Q: ?Sized> {
    query: &'q Q,
    state: LazyState,
}

impl<'q, Q: ResultQuery + ?Sized> LazyRows<'q, Q> {
    pub(crate) const fn new(query: &'q Q) -> Self {
        Self {
            query,
            state: LazyState::Pending,
        }
    }

    /// `true` once the query has been executed.
    #[must_use]
    pub const fn is_started(&self) -> bool {
        !matches!(self.state, LazyState::Pending)
    }
}

impl<Q: ResultQuery + ?Sized> Iterator for LazyRows<'_, Q> {
    type Item = Result<Row, InternalError>;

    fn next(&mut self) -> Option<Self::Item> {
        if matches!(self.state, LazyState::Pending) {
            record(MetricsEvent::Delivery {
                kind: DeliveryKind::Stream,
            });
            match Cursor::open(self.query) {
                Ok(cursor) => self.state = LazyState::Open(cursor),
                Err(err) => {
                    self.state = LazyState::Done;
                    return Some(Err(err));
                }
            }
        }

        let LazyState::Open(cursor) = &mut self.state else {
            return None;
        };

        match cursor.fetch_next() {
            Ok(Some(row)) => Some(Ok(row)),
            Ok(None) => {
                self.state = LazyState::Done;
                None
            }
            Err(err) => {
                self.state = LazyState::Done;
                Some(Err(err))
            }
        }
    }
}

impl<Q: ?Sized> fmt::Debug for LazyRows<'_, Q> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            LazyState::Pending => "pending",
            LazyState::Open(_) => "open",
            LazyState::Done => "done",
        };

        f.debug_struct("LazyRows").field("state", &state).finish()
    }
}

/// Start a producer on the pool that pushes every row into a channel of
/// `capacity` slots. Dropping the stream stops the producer at its next send
/// and releases its cursor.
pub(crate) fn row_stream<Q, P>(query: Q, pool: &P, capacity: usize) -> RowStream
where
    Q: ResultQuery + Send + 'static,
    P: WorkerPool + ?Sized,
{
    let (tx, rx) = mpsc::channel(capacity.max(1));
    record(MetricsEvent::Delivery {
        kind: DeliveryKind::Stream,
    });

    pool.submit(Box::new(move || {
        let mut cursor = match Cursor::open(&query) {
            Ok(cursor) => cursor,
            Err(err) => {
                let _ = tx.blocking_send(Err(err));
                return;
            }
        };

        loop {
            let item = match cursor.fetch_next() {
                Ok(Some(row)) => Ok(row),
                Ok(None) => break,
                Err(err) => Err(err),
            };
            let failed = item.is_err();

            if tx.blocking_send(item).is_err() {
                debug!(rows_read = cursor.rows_read(), "row stream receiver dropped");
                break;
            }
            if failed {
                break;
            }
        }
    }));

    ReceiverStream::new(rx)
}
