//! rowcast: typed fetching and mapping of tabular query results.
//!
//! ## Crate layout
//! - `core`: the engine (cursors, strategies, indexing, mapping, delivery).
//! - `error`: the public error taxonomy.
//!
//! The `prelude` brings `FetchExt` and the extractor vocabulary into scope.
//! Engine errors convert into [`Error`] with `?`.

pub use rowcast_core as core;

pub mod error;

pub use error::{Error, ErrorKind, ErrorOrigin};

//
// Consts
//

/// Workspace version re-export for downstream tooling/tests.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Facade result alias.
pub type Result<T, E = Error> = std::result::Result<T, E>;

pub use core::{
    MAX_ARITY,
    config::{self, FetchConfig, HintPolicy},
    cursor::{Cursor, CursorState, with_cursor},
    deliver::{FetchHandle, LazyRows, RowStream, Subscriber, Subscription, WorkerPool},
    fetch::FetchExt,
    obs::{EventReport, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all},
    result_set::RowSet,
    row::Row,
    source::{MemoryQuery, NativeRowSource, ResultQuery, RowSource, StreamingCapability},
    value::{DataType, Float64, Value},
};

///
/// Prelude
/// using _ brings traits into scope and avoids name conflicts
///

pub mod prelude {
    pub use crate::core::prelude::*;
    pub use crate::{Error, Result};
}
