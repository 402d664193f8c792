//! Observability: fetch telemetry and the sink boundary.
//!
//! Fetch logic never touches the counters directly. Every event flows
//! through `MetricsEvent` and `sink::record`, and recording can never change
//! the outcome of a fetch.

pub(crate) mod metrics;
pub(crate) mod sink;

pub use metrics::{EventOps, EventReport, FetchCounters};
pub use sink::{
    DeliveryKind, FetchKind, MetricsEvent, MetricsSink, metrics_report, metrics_reset_all,
    with_metrics_sink,
};
