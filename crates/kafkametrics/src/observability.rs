//! Prometheus instrumentation for the collection pipeline

use prometheus::{register_histogram, register_int_counter, register_int_gauge};
use prometheus::{Histogram, IntCounter, IntGauge};
use std::sync::OnceLock;

/// Histogram buckets for collection latency (seconds); two sequential cloud
/// round trips dominate, so the range skews high
const LATENCY_BUCKETS: &[f64] = &[0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<CollectorMetricsInner> = OnceLock::new();

struct CollectorMetricsInner {
    collect_latency_seconds: Histogram,
    brokers_discovered: IntGauge,
    collect_errors: IntCounter,
    collect_warnings: IntCounter,
}

impl CollectorMetricsInner {
    fn new() -> Self {
        Self {
            collect_latency_seconds: register_histogram!(
                "kafkametrics_collect_latency_seconds",
                "Time spent on one discovery-and-join collection",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register collect_latency_seconds"),

            brokers_discovered: register_int_gauge!(
                "kafkametrics_brokers_discovered",
                "Brokers found during the most recent discovery"
            )
            .expect("Failed to register brokers_discovered"),

            collect_errors: register_int_counter!(
                "kafkametrics_collect_errors_total",
                "Collection attempts aborted by a remote-call failure"
            )
            .expect("Failed to register collect_errors_total"),

            collect_warnings: register_int_counter!(
                "kafkametrics_collect_warnings_total",
                "Per-broker data-quality warnings raised during collection"
            )
            .expect("Failed to register collect_warnings_total"),
        }
    }
}

/// Lightweight handle to the global collector metrics
///
/// Clones share the same underlying Prometheus series.
#[derive(Clone)]
pub struct CollectorMetrics {
    _private: (),
}

impl Default for CollectorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl CollectorMetrics {
    /// Create a metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(CollectorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &CollectorMetricsInner {
        GLOBAL_METRICS.get().expect("Metrics not initialized")
    }

    pub fn observe_collect_latency(&self, duration_secs: f64) {
        self.inner().collect_latency_seconds.observe(duration_secs);
    }

    pub fn set_brokers_discovered(&self, count: i64) {
        self.inner().brokers_discovered.set(count);
    }

    pub fn inc_collect_errors(&self) {
        self.inner().collect_errors.inc();
    }

    pub fn add_warnings(&self, count: u64) {
        self.inner().collect_warnings.inc_by(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metrics_handle_records_observations() {
        let metrics = CollectorMetrics::new();
        metrics.observe_collect_latency(0.5);
        metrics.set_brokers_discovered(3);
        metrics.inc_collect_errors();
        metrics.add_warnings(2);
    }
}
