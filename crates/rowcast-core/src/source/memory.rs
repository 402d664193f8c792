use crate::{
    config::FetchConfig,
    error::InternalError,
    row::Row,
    schema::Schema,
    source::{NativeRowSource, ResultQuery, RowSource, StreamingCapability},
    value::Value,
};
use std::{
    pin::Pin,
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
    },
    task::{Context, Poll},
};
use tokio_stream::Stream;

///
/// MemoryStats
///
/// Open, read and close counters shared by every clone of a `MemoryQuery`.
///

#[derive(Debug, Default)]
pub struct MemoryStats {
    opens: AtomicUsize,
    reads: AtomicUsize,
    closes: AtomicUsize,
}

impl MemoryStats {
    #[must_use]
    pub fn opens(&self) -> usize {
        self.opens.load(Ordering::SeqCst)
    }

    /// Row reads issued against any source, end-of-data reads included.
    #[must_use]
    pub fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn closes(&self) -> usize {
        self.closes.load(Ordering::SeqCst)
    }

    /// `true` once every opened source has been closed exactly once.
    #[must_use]
    pub fn balanced(&self) -> bool {
        self.opens() == self.closes()
    }
}

///
/// Failures
///

#[derive(Clone, Debug, Default)]
struct Failures {
    open: Option<String>,
    at_row: Option<(usize, String)>,
    close: Option<String>,
}

///
/// ResultData
///

#[derive(Debug)]
struct ResultData {
    schema: Arc<Schema>,
    rows: Vec<Vec<Value>>,
}

///
/// MemoryQuery
///
/// In-memory `ResultQuery` with a configurable single-row hint, streaming
/// capability and failure injection. Clones share rows and counters.
///

#[derive(Clone, Debug)]
pub struct MemoryQuery {
    primary: Arc<ResultData>,
    extra: Vec<Arc<ResultData>>,
    hint: Option<bool>,
    capability: StreamingCapability,
    failures: Failures,
    config: Option<Arc<FetchConfig>>,
    stats: Arc<MemoryStats>,
}

impl MemoryQuery {
    #[must_use]
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self {
            primary: Arc::new(ResultData {
                schema: Arc::new(schema),
                rows,
            }),
            extra: Vec::new(),
            hint: None,
            capability: StreamingCapability::BlockingOnly,
            failures: Failures::default(),
            config: None,
            stats: Arc::new(MemoryStats::default()),
        }
    }

    /// Untyped query from bare field names.
    #[must_use]
    pub fn of(names: &[&str], rows: Vec<Vec<Value>>) -> Self {
        Self::new(Schema::of(names), rows)
    }

    #[must_use]
    pub const fn with_single_row_hint(mut self, hint: bool) -> Self {
        self.hint = Some(hint);
        self
    }

    #[must_use]
    pub const fn native_streaming(mut self) -> Self {
        self.capability = StreamingCapability::NativeStreaming;
        self
    }

    /// Append a further result set returned by `open_many`.
    #[must_use]
    pub fn with_result_set(mut self, schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        self.extra.push(Arc::new(ResultData {
            schema: Arc::new(schema),
            rows,
        }));
        self
    }

    #[must_use]
    pub fn with_config(mut self, config: FetchConfig) -> Self {
        self.config = Some(Arc::new(config));
        self
    }

    #[must_use]
    pub fn fail_on_open(mut self, message: impl Into<String>) -> Self {
        self.failures.open = Some(message.into());
        self
    }

    /// Fail the read of the row at `position` (0-based).
    #[must_use]
    pub fn fail_at_row(mut self, position: usize, message: impl Into<String>) -> Self {
        self.failures.at_row = Some((position, message.into()));
        self
    }

    #[must_use]
    pub fn fail_on_close(mut self, message: impl Into<String>) -> Self {
        self.failures.close = Some(message.into());
        self
    }

    #[must_use]
    pub fn stats(&self) -> &MemoryStats {
        &self.stats
    }

    #[must_use]
    pub fn schema(&self) -> &Arc<Schema> {
        &self.primary.schema
    }

    fn open_data(&self, data: &Arc<ResultData>) -> Result<MemoryCursor, InternalError> {
        if let Some(message) = &self.failures.open {
            return Err(InternalError::data_access(message.clone()));
        }
        self.stats.opens.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryCursor {
            data: Arc::clone(data),
            next: 0,
            failures: self.failures.clone(),
            stats: Arc::clone(&self.stats),
        })
    }
}

impl ResultQuery for MemoryQuery {
    fn open(&self) -> Result<Box<dyn RowSource>, InternalError> {
        Ok(Box::new(self.open_data(&self.primary)?))
    }

    fn single_row_hint(&self) -> Option<bool> {
        self.hint
    }

    fn streaming_capability(&self) -> StreamingCapability {
        self.capability
    }

    fn open_native(&self) -> Result<Box<dyn NativeRowSource>, InternalError> {
        Ok(Box::new(self.open_data(&self.primary)?))
    }

    fn open_many(&self) -> Result<Vec<Box<dyn RowSource>>, InternalError> {
        std::iter::once(&self.primary)
            .chain(self.extra.iter())
            .map(|data| {
                self.open_data(data)
                    .map(|cursor| Box::new(cursor) as Box<dyn RowSource>)
            })
            .collect()
    }

    fn config(&self) -> &FetchConfig {
        match &self.config {
            Some(config) => config.as_ref(),
            None => crate::config::global(),
        }
    }
}

///
/// MemoryCursor
/// Serves both the blocking and the native path.
///

struct MemoryCursor {
    data: Arc<ResultData>,
    next: usize,
    failures: Failures,
    stats: Arc<MemoryStats>,
}

impl MemoryCursor {
    fn read(&mut self) -> Result<Option<Vec<Value>>, InternalError> {
        self.stats.reads.fetch_add(1, Ordering::SeqCst);

        if let Some((position, message)) = &self.failures.at_row
            && *position == self.next
        {
            return Err(InternalError::data_access(message.clone()));
        }

        let values = self.data.rows.get(self.next).cloned();
        if values.is_some() {
            self.next += 1;
        }

        Ok(values)
    }

    fn release(&mut self) -> Result<(), InternalError> {
        self.stats.closes.fetch_add(1, Ordering::SeqCst);

        match &self.failures.close {
            Some(message) => Err(InternalError::data_access(message.clone())),
            None => Ok(()),
        }
    }
}

impl RowSource for MemoryCursor {
    fn schema(&self) -> Arc<Schema> {
        Arc::clone(&self.data.schema)
    }

    fn next_values(&mut self) -> Result<Option<Vec<Value>>, InternalError> {
        self.read()
    }

    fn close(&mut self) -> Result<(), InternalError> {
        self.release()
    }
}

impl Stream for MemoryCursor {
    type Item = Result<Row, InternalError>;

    fn poll_next(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();
        let item = match this.read() {
            Ok(Some(values)) => Some(Row::new(Arc::clone(&this.data.schema), values)),
            Ok(None) => None,
            Err(err) => Some(Err(err)),
        };

        Poll::Ready(item)
    }
}

impl NativeRowSource for MemoryCursor {
    fn close(&mut self) -> Result<(), InternalError> {
        self.release()
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorClass;

    fn query() -> MemoryQuery {
        MemoryQuery::of(&["n"], vec![vec![Value::Int(1)], vec![Value::Int(2)]])
    }

    #[test]
    fn source_reads_in_order_then_ends() {
        let query = query();
        let mut source = query.open().expect("open");

        assert_eq!(source.next_values(), Ok(Some(vec![Value::Int(1)])));
        assert_eq!(source.next_values(), Ok(Some(vec![Value::Int(2)])));
        assert_eq!(source.next_values(), Ok(None));
        source.close().expect("close");

        assert_eq!(query.stats().opens(), 1);
        assert_eq!(query.stats().reads(), 3);
        assert!(query.stats().balanced());
    }

    #[test]
    fn injected_failures_are_data_access_errors() {
        let err = query()
            .fail_on_open("refused")
            .open()
            .err()
            .expect("open fails");
        assert_eq!(err.class, ErrorClass::DataAccess);

        let mut source = query().fail_at_row(1, "reset").open().expect("open");
        assert!(source.next_values().is_ok());
        assert_eq!(
            source.next_values().expect_err("second row fails").message,
            "reset"
        );
    }

    #[test]
    fn open_many_yields_each_result_set() {
        let query = query().with_result_set(Schema::of(&["m"]), vec![vec![Value::Int(9)]]);
        let sources = query.open_many().expect("open many");

        assert_eq!(sources.len(), 2);
        assert_eq!(sources[1].schema().names(), vec!["m"]);
    }

    #[test]
    fn default_capabilities_are_not_provided() {
        struct Bare;

        impl ResultQuery for Bare {
            fn open(&self) -> Result<Box<dyn RowSource>, InternalError> {
                Err(InternalError::data_access("unused"))
            }
        }

        assert_eq!(Bare.single_row_hint(), None);
        assert_eq!(Bare.streaming_capability(), StreamingCapability::BlockingOnly);
        assert_eq!(
            Bare.open_many().err().map(|err| err.class),
            Some(ErrorClass::Unsupported)
        );
        assert!(Bare.open_native().is_err());
    }
}
