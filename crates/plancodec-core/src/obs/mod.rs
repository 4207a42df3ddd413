//! Observability: codec telemetry (metrics) and sink abstractions.
//!
//! Counters are process-local and never consulted by any encoding,
//! decoding, or normalization decision.

pub(crate) mod metrics;
pub(crate) mod sink;

// re-exports
pub use metrics::{EventOps, EventReport};
pub use sink::{
    MetricsEvent, MetricsSink, Surface, metrics_report, metrics_reset_all, with_metrics_sink,
};
