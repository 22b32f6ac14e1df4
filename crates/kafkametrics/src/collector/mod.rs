//! Broker metrics collection pipeline
//!
//! Bridges two opaque remote capabilities, an instance inventory and a
//! time-series metric store, into a single broker-id-keyed view of recent
//! network throughput. One collection call performs exactly one discovery
//! round trip followed by one batched metric round trip; fleet size widens
//! the batch, never the request count.

mod discovery;
mod query;

#[cfg(test)]
mod tests;

pub use discovery::{broker_map_from_instances, DiscoveredBroker};
pub use query::{
    apply_series, build_queries, Direction, MetricQuery, MetricSeries, QueryId, TimeWindow,
    LOOKBACK_MINUTES, MAX_BATCH_QUERIES,
};

use crate::error::{CollectError, CollectWarning};
use crate::models::{BrokerMetrics, Event, InstanceRecord};
use crate::observability::CollectorMetrics;
use anyhow::Result;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

pub use async_trait::async_trait;

/// Instance inventory capability
#[async_trait]
pub trait InstanceInventory: Send + Sync {
    /// List running instances carrying any non-empty value for `tag`
    async fn running_instances_with_tag(&self, tag: &str) -> Result<Vec<InstanceRecord>>;
}

/// Batched time-series capability
#[async_trait]
pub trait MetricStore: Send + Sync {
    /// Execute the whole batch in a single round trip over `window`
    async fn fetch_series(
        &self,
        queries: &[MetricQuery],
        window: TimeWindow,
    ) -> Result<Vec<MetricSeries>>;
}

/// The discovery-and-join pipeline
///
/// Holds no per-call state; every collection allocates and discards its own
/// broker map, so concurrent calls on one `Collector` are safe.
pub struct Collector {
    inventory: Arc<dyn InstanceInventory>,
    store: Arc<dyn MetricStore>,
    broker_id_tag: String,
    metrics: CollectorMetrics,
}

impl Collector {
    pub fn new(
        inventory: Arc<dyn InstanceInventory>,
        store: Arc<dyn MetricStore>,
        broker_id_tag: impl Into<String>,
    ) -> Self {
        Self {
            inventory,
            store,
            broker_id_tag: broker_id_tag.into(),
            metrics: CollectorMetrics::new(),
        }
    }

    /// Collect a throughput snapshot for every discovered broker
    ///
    /// Remote-call failures abort the attempt with an error; per-broker
    /// data-quality issues are returned as warnings next to the map.
    pub async fn collect_broker_metrics(
        &self,
    ) -> Result<(BrokerMetrics, Vec<CollectWarning>), CollectError> {
        let start = Instant::now();

        let result = self.collect_inner().await;

        self.metrics.observe_collect_latency(start.elapsed().as_secs_f64());
        match &result {
            Ok((brokers, warnings)) => {
                self.metrics.set_brokers_discovered(brokers.len() as i64);
                self.metrics.add_warnings(warnings.len() as u64);
                info!(
                    brokers = brokers.len(),
                    warnings = warnings.len(),
                    elapsed_ms = start.elapsed().as_millis(),
                    "Collection complete"
                );
            }
            Err(_) => self.metrics.inc_collect_errors(),
        }

        result
    }

    async fn collect_inner(&self) -> Result<(BrokerMetrics, Vec<CollectWarning>), CollectError> {
        let instances = self
            .inventory
            .running_instances_with_tag(&self.broker_id_tag)
            .await
            .map_err(CollectError::Discovery)?;

        let mut warnings = Vec::new();
        let mut brokers = broker_map_from_instances(instances, &self.broker_id_tag, &mut warnings);

        // An empty fleet is a successful, empty result; skip the metric call
        if brokers.is_empty() {
            return Ok((HashMap::new(), warnings));
        }

        let queries = build_queries(&brokers);
        if queries.len() > MAX_BATCH_QUERIES {
            return Err(CollectError::BatchOverflow {
                queries: queries.len(),
                limit: MAX_BATCH_QUERIES,
            });
        }

        let window = TimeWindow::lookback(Utc::now());
        let series = self
            .store
            .fetch_series(&queries, window)
            .await
            .map_err(CollectError::MetricQuery)?;

        apply_series(&mut brokers, series, &mut warnings);

        let snapshot: BrokerMetrics = brokers.into_iter().map(|(id, d)| (id, d.broker)).collect();
        Ok((snapshot, warnings))
    }

    /// Post an operator event; retained for caller compatibility, no-op
    pub async fn post_event(&self, _event: &Event) -> Result<()> {
        Ok(())
    }
}
