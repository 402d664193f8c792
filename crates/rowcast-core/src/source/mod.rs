//! Collaborator boundary: what a query must provide for the fetch engine to
//! drive it.
//!
//! The engine depends on `ResultQuery` capabilities only and never on the
//! concrete shape of a statement.

mod memory;

pub use memory::{MemoryQuery, MemoryStats};

use crate::{
    config::{self, FetchConfig},
    error::{ErrorOrigin, InternalError},
    row::Row,
    schema::Schema,
    value::Value,
};
use std::sync::Arc;
use tokio_stream::Stream;

///
/// RowSource
///
/// An opened, blocking row producer. Owned by exactly one `Cursor`.
///

pub trait RowSource: Send {
    fn schema(&self) -> Arc<Schema>;

    /// Next row's values in schema order, or `None` at end of data.
    fn next_values(&mut self) -> Result<Option<Vec<Value>>, InternalError>;

    /// Release the underlying handle. Called at most once by the cursor.
    fn close(&mut self) -> Result<(), InternalError>;
}

///
/// NativeRowSource
///
/// A non-blocking row producer used by the native push path. It is polled
/// only while the subscriber has outstanding demand.
///

pub trait NativeRowSource: Stream<Item = Result<Row, InternalError>> + Send + Unpin {
    fn close(&mut self) -> Result<(), InternalError>;
}

///
/// StreamingCapability
/// What a push subscription can drive, resolved once per subscription.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub enum StreamingCapability {
    NativeStreaming,
    #[default]
    BlockingOnly,
}

///
/// ResultQuery
///
/// A statement that can be executed into rows. Only `open` is required; the
/// remaining capabilities default to "not provided".
///

pub trait ResultQuery {
    /// Execute and return a lazy row source. May fail with a data-access error.
    fn open(&self) -> Result<Box<dyn RowSource>, InternalError>;

    /// Planner-level hint that at most one row will be produced.
    fn single_row_hint(&self) -> Option<bool> {
        None
    }

    fn streaming_capability(&self) -> StreamingCapability {
        StreamingCapability::BlockingOnly
    }

    fn open_native(&self) -> Result<Box<dyn NativeRowSource>, InternalError> {
        Err(InternalError::unsupported(
            ErrorOrigin::Source,
            "query does not support native streaming",
        ))
    }

    /// Execute a statement producing several result sets, one source each.
    fn open_many(&self) -> Result<Vec<Box<dyn RowSource>>, InternalError> {
        Err(InternalError::unsupported(
            ErrorOrigin::Source,
            "query does not produce multiple result sets",
        ))
    }

    fn config(&self) -> &FetchConfig {
        config::global()
    }
}

impl<Q: ResultQuery + ?Sized> ResultQuery for Arc<Q> {
    fn open(&self) -> Result<Box<dyn RowSource>, InternalError> {
        (**self).open()
    }

    fn single_row_hint(&self) -> Option<bool> {
        (**self).single_row_hint()
    }

    fn streaming_capability(&self) -> StreamingCapability {
        (**self).streaming_capability()
    }

    fn open_native(&self) -> Result<Box<dyn NativeRowSource>, InternalError> {
        (**self).open_native()
    }

    fn open_many(&self) -> Result<Vec<Box<dyn RowSource>>, InternalError> {
        (**self).open_many()
    }

    fn config(&self) -> &FetchConfig {
        (**self).config()
    }
}

impl<Q: ResultQuery + ?Sized> ResultQuery for &Q {
    fn open(&self) -> Result<Box<dyn RowSource>, InternalError> {
        (**self).open()
    }

    fn single_row_hint(&self) -> Option<bool> {
        (**self).single_row_hint()
    }

    fn streaming_capability(&self) -> StreamingCapability {
        (**self).streaming_capability()
    }

    fn open_native(&self) -> Result<Box<dyn NativeRowSource>, InternalError> {
        (**self).open_native()
    }

    fn open_many(&self) -> Result<Vec<Box<dyn RowSource>>, InternalError> {
        (**self).open_many()
    }

    fn config(&self) -> &FetchConfig {
        (**self).config()
    }
}
