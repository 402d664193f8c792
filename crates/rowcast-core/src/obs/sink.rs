//! Metrics sink boundary.
//!
//! Fetch code MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.

use crate::obs::metrics::{self, EventReport};
use std::{cell::RefCell, fmt, sync::Arc};

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<Arc<dyn MetricsSink>>> = const { RefCell::new(None) };
}

///
/// FetchKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum FetchKind {
    All,
    One,
    Single,
    Any,
    Many,
    Lazy,
    Map,
    Group,
}

impl fmt::Display for FetchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::All => "all",
            Self::One => "one",
            Self::Single => "single",
            Self::Any => "any",
            Self::Many => "many",
            Self::Lazy => "lazy",
            Self::Map => "map",
            Self::Group => "group",
        };
        write!(f, "{label}")
    }
}

///
/// DeliveryKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum DeliveryKind {
    Future,
    Stream,
    Subscribe { native: bool },
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    CursorOpen,
    CursorClose {
        rows_read: u64,
        failed: bool,
    },
    FetchStart {
        kind: FetchKind,
    },
    FetchFinish {
        kind: FetchKind,
        rows: u64,
        failed: bool,
    },
    Delivery {
        kind: DeliveryKind,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default process-wide sink writing into the shared counters.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::CursorOpen => metrics::with_state_mut(|m| {
                m.ops.cursors_opened = m.ops.cursors_opened.saturating_add(1);
            }),

            MetricsEvent::CursorClose { rows_read, failed } => metrics::with_state_mut(|m| {
                m.ops.cursors_closed = m.ops.cursors_closed.saturating_add(1);
                m.ops.rows_read = m.ops.rows_read.saturating_add(rows_read);
                if failed {
                    m.ops.close_failures = m.ops.close_failures.saturating_add(1);
                }
            }),

            MetricsEvent::FetchStart { kind } => metrics::with_state_mut(|m| {
                m.ops.fetch_calls = m.ops.fetch_calls.saturating_add(1);
                let entry = m.fetches.entry(kind.to_string()).or_default();
                entry.calls = entry.calls.saturating_add(1);
            }),

            MetricsEvent::FetchFinish { kind, rows, failed } => metrics::with_state_mut(|m| {
                let entry = m.fetches.entry(kind.to_string()).or_default();
                if failed {
                    m.ops.fetch_errors = m.ops.fetch_errors.saturating_add(1);
                    entry.errors = entry.errors.saturating_add(1);
                } else {
                    m.ops.rows_returned = m.ops.rows_returned.saturating_add(rows);
                    entry.rows = entry.rows.saturating_add(rows);
                }
            }),

            MetricsEvent::Delivery { kind } => metrics::with_state_mut(|m| match kind {
                DeliveryKind::Future => {
                    m.ops.async_submits = m.ops.async_submits.saturating_add(1);
                }
                DeliveryKind::Stream => {
                    m.ops.stream_opens = m.ops.stream_opens.saturating_add(1);
                }
                DeliveryKind::Subscribe { native } => {
                    m.ops.subscriptions = m.ops.subscriptions.saturating_add(1);
                    if native {
                        m.ops.native_subscriptions = m.ops.native_subscriptions.saturating_add(1);
                    }
                }
            }),
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_sink = SINK_OVERRIDE.with(|cell| cell.borrow().clone());

    match override_sink {
        Some(sink) => sink.record(event),
        None => GLOBAL_METRICS_SINK.record(event),
    }
}

/// Snapshot the process-wide counters.
#[must_use]
pub fn metrics_report() -> EventReport {
    metrics::report()
}

/// Reset all process-wide counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a sink override scoped to the current thread.
///
/// Work handed to a worker pool keeps reporting to the global sink.
pub fn with_metrics_sink<T>(sink: Arc<dyn MetricsSink>, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<Arc<dyn MetricsSink>>);

    impl Drop for Guard {
        fn drop(&mut self) {
            let previous = self.0.take();
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = previous;
            });
        }
    }

    let prev = SINK_OVERRIDE.with(|cell| cell.borrow_mut().replace(sink));
    let _guard = Guard(prev);

    f()
}

///
/// FetchSpan
///
/// RAII guard emitting start/finish events for one terminal fetch.
/// Finish accounting happens even on unwind; a span that was never marked
/// successful reports as failed.
///

pub(crate) struct FetchSpan {
    kind: FetchKind,
    rows: u64,
    ok: bool,
}

impl FetchSpan {
    #[must_use]
    pub(crate) fn new(kind: FetchKind) -> Self {
        record(MetricsEvent::FetchStart { kind });

        Self {
            kind,
            rows: 0,
            ok: false,
        }
    }

    /// Mark the fetch successful with the number of rows it returned.
    pub(crate) fn finish(mut self, rows: usize) {
        self.rows = u64::try_from(rows).unwrap_or(u64::MAX);
        self.ok = true;
    }

    /// Settle the span from a strategy result.
    pub(crate) fn settle<T, E>(self, result: &Result<T, E>, rows: impl FnOnce(&T) -> usize) {
        if let Ok(value) = result {
            let rows = rows(value);
            self.finish(rows);
        }
    }
}

impl Drop for FetchSpan {
    fn drop(&mut self) {
        record(MetricsEvent::FetchFinish {
            kind: self.kind,
            rows: self.rows,
            failed: !self.ok,
        });
    }
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Capture(Mutex<Vec<MetricsEvent>>);

    impl MetricsSink for Capture {
        fn record(&self, event: MetricsEvent) {
            self.0.lock().expect("capture lock").push(event);
        }
    }

    #[test]
    fn override_captures_span_events_and_restores() {
        let capture = Arc::new(Capture::default());

        with_metrics_sink(capture.clone(), || {
            let span = FetchSpan::new(FetchKind::Single);
            span.finish(1);
            drop(FetchSpan::new(FetchKind::Any));
        });

        let events = capture.0.lock().expect("capture lock").clone();
        assert_eq!(
            events,
            vec![
                MetricsEvent::FetchStart {
                    kind: FetchKind::Single
                },
                MetricsEvent::FetchFinish {
                    kind: FetchKind::Single,
                    rows: 1,
                    failed: false
                },
                MetricsEvent::FetchStart {
                    kind: FetchKind::Any
                },
                MetricsEvent::FetchFinish {
                    kind: FetchKind::Any,
                    rows: 0,
                    failed: true
                },
            ]
        );
        assert!(SINK_OVERRIDE.with(|cell| cell.borrow().is_none()));
    }

    #[test]
    fn report_serializes_to_json() {
        let report = metrics_report();
        let json = serde_json::to_value(&report).expect("serialize report");

        assert!(json["ops"]["cursors_opened"].is_u64());
    }
}
