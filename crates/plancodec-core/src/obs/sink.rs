//! Metrics sink boundary.
//!
//! Codec logic MUST NOT depend on obs::metrics directly.
//! All instrumentation flows through MetricsEvent and MetricsSink.
//!
//! This module is the only allowed bridge between codec logic
//! and the global metrics state.
use crate::obs::metrics;
use std::cell::RefCell;

thread_local! {
    static SINK_OVERRIDE: RefCell<Option<*const dyn MetricsSink>> = RefCell::new(None);
}

///
/// Surface
/// Which traversal produced an event.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Surface {
    Tree,
    Flat,
}

///
/// MetricsEvent
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum MetricsEvent {
    PlanEncoded {
        surface: Surface,
        lines: u64,
        with_stats: bool,
    },
    PlanNormalized {
        surface: Surface,
        nodes: u64,
    },
    PlanDecoded {
        lines: u64,
    },
    DecodeRejected {
        line: u64,
    },
    PlanUnavailable {
        surface: Surface,
    },
}

///
/// MetricsSink
///

pub trait MetricsSink {
    fn record(&self, event: MetricsEvent);
}

/// GlobalMetricsSink
/// Default process-local sink that writes into global metrics state.
/// Acts as the concrete sink when no scoped override is installed.

pub(crate) struct GlobalMetricsSink;

impl MetricsSink for GlobalMetricsSink {
    fn record(&self, event: MetricsEvent) {
        match event {
            MetricsEvent::PlanEncoded {
                surface,
                lines,
                with_stats,
            } => {
                metrics::with_state_mut(|m| {
                    match surface {
                        Surface::Tree => m.ops.tree_encodes = m.ops.tree_encodes.saturating_add(1),
                        Surface::Flat => m.ops.flat_encodes = m.ops.flat_encodes.saturating_add(1),
                    }
                    m.ops.encoded_lines = m.ops.encoded_lines.saturating_add(lines);
                    if with_stats {
                        m.ops.encodes_with_stats = m.ops.encodes_with_stats.saturating_add(1);
                    }
                });
            }

            MetricsEvent::PlanNormalized { surface, nodes } => {
                metrics::with_state_mut(|m| {
                    match surface {
                        Surface::Tree => {
                            m.ops.tree_normalizations = m.ops.tree_normalizations.saturating_add(1);
                        }
                        Surface::Flat => {
                            m.ops.flat_normalizations = m.ops.flat_normalizations.saturating_add(1);
                        }
                    }
                    m.ops.normalized_nodes = m.ops.normalized_nodes.saturating_add(nodes);
                });
            }

            MetricsEvent::PlanDecoded { lines } => {
                metrics::with_state_mut(|m| {
                    m.ops.decodes = m.ops.decodes.saturating_add(1);
                    m.ops.decoded_lines = m.ops.decoded_lines.saturating_add(lines);
                });
            }

            MetricsEvent::DecodeRejected { line } => {
                metrics::with_state_mut(|m| {
                    m.ops.decode_rejections = m.ops.decode_rejections.saturating_add(1);
                    m.last_rejected_line = Some(line);
                });
            }

            MetricsEvent::PlanUnavailable { surface } => {
                metrics::with_state_mut(|m| match surface {
                    Surface::Tree => {
                        m.ops.tree_unavailable = m.ops.tree_unavailable.saturating_add(1);
                    }
                    Surface::Flat => {
                        m.ops.flat_unavailable = m.ops.flat_unavailable.saturating_add(1);
                    }
                });
            }
        }
    }
}

pub(crate) const GLOBAL_METRICS_SINK: GlobalMetricsSink = GlobalMetricsSink;

pub(crate) fn record(event: MetricsEvent) {
    let override_ptr = SINK_OVERRIDE.with(|cell| *cell.borrow());
    if let Some(ptr) = override_ptr {
        // SAFETY:
        // Preconditions:
        // - `ptr` was produced from a valid `&dyn MetricsSink` in `with_metrics_sink`.
        // - `with_metrics_sink` always restores the previous pointer before returning,
        //   including unwind paths via `Guard::drop`.
        // - `record` is synchronous and never stores `ptr` beyond this call.
        //
        // Aliasing:
        // - Only a shared reference is materialized, matching the shared borrow
        //   used to install the override.
        unsafe { (&*ptr).record(event) };
    } else {
        GLOBAL_METRICS_SINK.record(event);
    }
}

/// Snapshot the current metrics state.
#[must_use]
pub fn metrics_report() -> metrics::EventReport {
    metrics::report()
}

/// Reset all metrics counters.
pub fn metrics_reset_all() {
    metrics::reset_all();
}

/// Run a closure with a temporary metrics sink override.
///
/// Events recorded on this thread while `f` runs go to `sink` instead of the
/// global counters. The previous sink is restored on return and on unwind.
pub fn with_metrics_sink<T>(sink: &dyn MetricsSink, f: impl FnOnce() -> T) -> T {
    struct Guard(Option<*const dyn MetricsSink>);

    impl Drop for Guard {
        fn drop(&mut self) {
            SINK_OVERRIDE.with(|cell| {
                *cell.borrow_mut() = self.0;
            });
        }
    }

    // SAFETY:
    // Preconditions:
    // - `sink_ptr` is installed only for this dynamic scope.
    // - `Guard` always restores the previous slot on all exits, including panic.
    // - `record` only dereferences synchronously and never persists `sink_ptr`.
    //
    // What would break this:
    // - Any deferred use of `sink_ptr` beyond this scope.
    // - Any path that bypasses Guard restoration.
    let sink_ptr = unsafe { std::mem::transmute::<&dyn MetricsSink, *const dyn MetricsSink>(sink) };
    let prev = SINK_OVERRIDE.with(|cell| {
        let mut slot = cell.borrow_mut();
        slot.replace(sink_ptr)
    });
    let _guard = Guard(prev);

    f()
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::CaptureSink;

    #[test]
    fn override_captures_and_restores() {
        metrics_reset_all();
        let capture = CaptureSink::default();

        with_metrics_sink(&capture, || {
            record(MetricsEvent::PlanDecoded { lines: 3 });
        });
        record(MetricsEvent::PlanDecoded { lines: 2 });

        assert_eq!(
            capture.events(),
            vec![MetricsEvent::PlanDecoded { lines: 3 }]
        );
        let report = metrics_report();
        assert_eq!(report.counters.decodes, 1);
        assert_eq!(report.counters.decoded_lines, 2);
    }

    #[test]
    fn override_is_restored_on_unwind() {
        metrics_reset_all();
        let capture = CaptureSink::default();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            with_metrics_sink(&capture, || panic!("boom"));
        }));
        assert!(result.is_err());

        record(MetricsEvent::DecodeRejected { line: 7 });
        assert!(capture.events().is_empty());

        let report = metrics_report();
        assert_eq!(report.counters.decode_rejections, 1);
        assert_eq!(report.last_rejected_line, Some(7));
    }

    #[test]
    fn surfaces_are_counted_separately() {
        metrics_reset_all();
        record(MetricsEvent::PlanEncoded {
            surface: Surface::Tree,
            lines: 4,
            with_stats: true,
        });
        record(MetricsEvent::PlanEncoded {
            surface: Surface::Flat,
            lines: 4,
            with_stats: false,
        });
        record(MetricsEvent::PlanUnavailable {
            surface: Surface::Flat,
        });

        let ops = metrics_report().counters;
        assert_eq!(ops.tree_encodes, 1);
        assert_eq!(ops.flat_encodes, 1);
        assert_eq!(ops.encoded_lines, 8);
        assert_eq!(ops.encodes_with_stats, 1);
        assert_eq!(ops.flat_unavailable, 1);
        assert_eq!(ops.tree_unavailable, 0);
    }
}
