//! Integration tests for the collection pipeline
//!
//! These tests drive the pipeline through scripted inventory and metric
//! store implementations, without any network access.

use super::{
    Collector, InstanceInventory, MetricQuery, MetricSeries, MetricStore, TimeWindow,
    LOOKBACK_MINUTES,
};
use crate::error::{CollectError, CollectWarning};
use crate::models::{Event, InstanceRecord};
use anyhow::{bail, Result};
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

struct StaticInventory {
    instances: Vec<InstanceRecord>,
    fail: bool,
}

impl StaticInventory {
    fn with(instances: Vec<InstanceRecord>) -> Arc<Self> {
        Arc::new(Self {
            instances,
            fail: false,
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            instances: Vec::new(),
            fail: true,
        })
    }
}

#[async_trait]
impl InstanceInventory for StaticInventory {
    async fn running_instances_with_tag(&self, _tag: &str) -> Result<Vec<InstanceRecord>> {
        if self.fail {
            bail!("inventory service unavailable");
        }
        Ok(self.instances.clone())
    }
}

/// Metric store answering from a scripted id -> samples table
struct ScriptedStore {
    series: HashMap<String, Vec<f64>>,
    /// Unsolicited series appended to every response
    extra: Vec<MetricSeries>,
    fail: bool,
    calls: AtomicUsize,
    last_batch_width: AtomicUsize,
    last_window: Mutex<Option<TimeWindow>>,
}

impl ScriptedStore {
    fn with(series: &[(&str, &[f64])]) -> Arc<Self> {
        Arc::new(Self {
            series: series
                .iter()
                .map(|(id, values)| (id.to_string(), values.to_vec()))
                .collect(),
            extra: Vec::new(),
            fail: false,
            calls: AtomicUsize::new(0),
            last_batch_width: AtomicUsize::new(0),
            last_window: Mutex::new(None),
        })
    }

    fn failing() -> Arc<Self> {
        Arc::new(Self {
            series: HashMap::new(),
            extra: Vec::new(),
            fail: true,
            calls: AtomicUsize::new(0),
            last_batch_width: AtomicUsize::new(0),
            last_window: Mutex::new(None),
        })
    }

    fn with_extra(series: &[(&str, &[f64])], extra: Vec<MetricSeries>) -> Arc<Self> {
        let mut store = Self::with(series);
        Arc::get_mut(&mut store).unwrap().extra = extra;
        store
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MetricStore for ScriptedStore {
    async fn fetch_series(
        &self,
        queries: &[MetricQuery],
        window: TimeWindow,
    ) -> Result<Vec<MetricSeries>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.last_batch_width.store(queries.len(), Ordering::SeqCst);
        *self.last_window.lock().unwrap() = Some(window);

        if self.fail {
            bail!("metric service unavailable");
        }

        let mut out: Vec<MetricSeries> = queries
            .iter()
            .filter_map(|q| {
                self.series.get(&q.id.to_string()).map(|values| MetricSeries {
                    id: q.id.to_string(),
                    label: q.label.clone(),
                    values: values.clone(),
                })
            })
            .collect();
        out.extend(self.extra.iter().cloned());
        Ok(out)
    }
}

fn instance(instance_id: &str, dns: &str, broker_id: &str) -> InstanceRecord {
    InstanceRecord {
        instance_id: instance_id.to_string(),
        private_dns: dns.to_string(),
        instance_type: "m5.xlarge".to_string(),
        tags: [("broker-id".to_string(), broker_id.to_string())]
            .into_iter()
            .collect(),
    }
}

#[tokio::test]
async fn end_to_end_two_broker_fleet() {
    let inventory = StaticInventory::with(vec![
        instance("i-aaa", "10.0.0.1", "1"),
        instance("i-bbb", "10.0.0.2", "2"),
    ]);
    let store = ScriptedStore::with(&[
        ("in_1", &[600.0]),
        ("out_1", &[1200.0]),
        ("in_2", &[0.0]),
        ("out_2", &[0.0]),
    ]);

    let collector = Collector::new(inventory, store.clone(), "broker-id");
    let (brokers, warnings) = collector.collect_broker_metrics().await.unwrap();

    assert!(warnings.is_empty());
    assert_eq!(brokers.len(), 2);

    assert_eq!(brokers[&1].host, "10.0.0.1");
    assert_eq!(brokers[&1].net_rx, 10.0);
    assert_eq!(brokers[&1].net_tx, 20.0);

    assert_eq!(brokers[&2].host, "10.0.0.2");
    assert_eq!(brokers[&2].net_rx, 0.0);
    assert_eq!(brokers[&2].net_tx, 0.0);
}

#[tokio::test]
async fn single_round_trip_regardless_of_fleet_size() {
    let inventory = StaticInventory::with(vec![
        instance("i-aaa", "10.0.0.1", "1"),
        instance("i-bbb", "10.0.0.2", "2"),
        instance("i-ccc", "10.0.0.3", "3"),
    ]);
    let store = ScriptedStore::with(&[
        ("in_1", &[60.0]),
        ("out_1", &[60.0]),
        ("in_2", &[60.0]),
        ("out_2", &[60.0]),
        ("in_3", &[60.0]),
        ("out_3", &[60.0]),
    ]);

    let collector = Collector::new(inventory, store.clone(), "broker-id");
    let (brokers, _) = collector.collect_broker_metrics().await.unwrap();

    assert_eq!(brokers.len(), 3);
    assert_eq!(store.calls(), 1);
    assert_eq!(store.last_batch_width.load(Ordering::SeqCst), 6);

    let window = store.last_window.lock().unwrap().unwrap();
    assert_eq!((window.end - window.start).num_minutes(), LOOKBACK_MINUTES);
}

#[tokio::test]
async fn empty_fleet_short_circuits_the_metric_call() {
    let inventory = StaticInventory::with(Vec::new());
    let store = ScriptedStore::with(&[]);

    let collector = Collector::new(inventory, store.clone(), "broker-id");
    let (brokers, warnings) = collector.collect_broker_metrics().await.unwrap();

    assert!(brokers.is_empty());
    assert!(warnings.is_empty());
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn discovery_failure_aborts_with_error() {
    let collector = Collector::new(
        StaticInventory::failing(),
        ScriptedStore::with(&[]),
        "broker-id",
    );

    let err = collector.collect_broker_metrics().await.unwrap_err();
    assert!(matches!(err, CollectError::Discovery(_)));
}

#[tokio::test]
async fn metric_failure_aborts_with_error() {
    let collector = Collector::new(
        StaticInventory::with(vec![instance("i-aaa", "10.0.0.1", "1")]),
        ScriptedStore::failing(),
        "broker-id",
    );

    let err = collector.collect_broker_metrics().await.unwrap_err();
    assert!(matches!(err, CollectError::MetricQuery(_)));
}

#[tokio::test]
async fn oversized_batch_is_rejected_before_the_call() {
    let instances: Vec<InstanceRecord> = (0..251)
        .map(|i| instance(&format!("i-{:03}", i), &format!("10.0.1.{}", i), &i.to_string()))
        .collect();
    let store = ScriptedStore::with(&[]);

    let collector = Collector::new(StaticInventory::with(instances), store.clone(), "broker-id");
    let err = collector.collect_broker_metrics().await.unwrap_err();

    assert!(matches!(
        err,
        CollectError::BatchOverflow {
            queries: 502,
            limit: 500
        }
    ));
    assert_eq!(store.calls(), 0);
}

#[tokio::test]
async fn non_integer_tag_yields_warning_not_failure() {
    let inventory = StaticInventory::with(vec![
        instance("i-aaa", "10.0.0.1", "abc"),
        instance("i-bbb", "10.0.0.2", "2"),
    ]);
    let store = ScriptedStore::with(&[("in_2", &[600.0]), ("out_2", &[600.0])]);

    let collector = Collector::new(inventory, store, "broker-id");
    let (brokers, warnings) = collector.collect_broker_metrics().await.unwrap();

    assert_eq!(brokers.len(), 1);
    assert_eq!(brokers[&2].net_rx, 10.0);
    assert_eq!(
        warnings,
        vec![CollectWarning::NonNumericTag {
            instance_id: "i-aaa".to_string(),
            value: "abc".to_string(),
        }]
    );
}

#[tokio::test]
async fn unsolicited_series_is_reported_and_ignored() {
    let inventory = StaticInventory::with(vec![instance("i-aaa", "10.0.0.1", "1")]);
    let store = ScriptedStore::with_extra(
        &[("in_1", &[600.0]), ("out_1", &[600.0])],
        vec![MetricSeries {
            id: "out_99".to_string(),
            label: "kafkaNetOut_i-zzz".to_string(),
            values: vec![60.0],
        }],
    );

    let collector = Collector::new(inventory, store, "broker-id");
    let (brokers, warnings) = collector.collect_broker_metrics().await.unwrap();

    assert_eq!(brokers.len(), 1);
    assert_eq!(brokers[&1].net_rx, 10.0);
    assert_eq!(
        warnings,
        vec![CollectWarning::UnknownQueryId {
            id: "out_99".to_string()
        }]
    );
}

#[tokio::test]
async fn repeated_collection_is_idempotent() {
    let inventory = StaticInventory::with(vec![
        instance("i-aaa", "10.0.0.1", "1"),
        instance("i-bbb", "10.0.0.2", "2"),
    ]);
    let store = ScriptedStore::with(&[
        ("in_1", &[600.0]),
        ("out_1", &[1200.0]),
        ("in_2", &[300.0]),
        ("out_2", &[900.0]),
    ]);

    let collector = Collector::new(inventory, store.clone(), "broker-id");
    let (first, first_warnings) = collector.collect_broker_metrics().await.unwrap();
    let (second, second_warnings) = collector.collect_broker_metrics().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first_warnings, second_warnings);
    assert_eq!(store.calls(), 2);
}

#[tokio::test]
async fn post_event_is_a_noop() {
    let collector = Collector::new(
        StaticInventory::with(Vec::new()),
        ScriptedStore::with(&[]),
        "broker-id",
    );

    collector
        .post_event(&Event {
            title: "throttle change".to_string(),
            text: "rebalance in progress".to_string(),
            tags: vec!["kafka".to_string()],
        })
        .await
        .unwrap();
}
