//! AWS implementations of the inventory and metric-store capabilities
//!
//! EC2 `DescribeInstances` backs discovery and CloudWatch `GetMetricData`
//! backs the batched metric fetch. Credentials come from the default
//! provider chain; each call is attempted exactly once, with no retries
//! beyond what the SDK itself performs.

use crate::collector::{InstanceInventory, MetricQuery, MetricSeries, MetricStore, TimeWindow};
use crate::models::InstanceRecord;
use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_sdk_cloudwatch::primitives::DateTime;
use aws_sdk_cloudwatch::types::{Dimension, Metric, MetricDataQuery, MetricStat};
use aws_sdk_ec2::types::Filter;
use chrono::Utc;
use std::collections::HashMap;
use tracing::debug;

/// Build both service clients for one region from the ambient environment
pub async fn clients_for_region(region: &str) -> (Ec2Inventory, CloudWatchStore) {
    let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_sdk_ec2::config::Region::new(region.to_string()))
        .load()
        .await;

    (
        Ec2Inventory::new(aws_sdk_ec2::Client::new(&config)),
        CloudWatchStore::new(aws_sdk_cloudwatch::Client::new(&config)),
    )
}

/// Instance inventory backed by EC2
pub struct Ec2Inventory {
    client: aws_sdk_ec2::Client,
}

impl Ec2Inventory {
    pub fn new(client: aws_sdk_ec2::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl InstanceInventory for Ec2Inventory {
    async fn running_instances_with_tag(&self, tag: &str) -> Result<Vec<InstanceRecord>> {
        let resp = self
            .client
            .describe_instances()
            .filters(
                Filter::builder()
                    .name(format!("tag:{}", tag))
                    .values("*")
                    .build(),
            )
            .filters(
                Filter::builder()
                    .name("instance-state-name")
                    .values("running")
                    .build(),
            )
            .send()
            .await
            .context("DescribeInstances failed")?;

        let mut records = Vec::new();
        for reservation in resp.reservations() {
            for instance in reservation.instances() {
                let tags: HashMap<String, String> = instance
                    .tags()
                    .iter()
                    .filter_map(|t| Some((t.key()?.to_string(), t.value()?.to_string())))
                    .collect();

                records.push(InstanceRecord {
                    instance_id: instance.instance_id().unwrap_or_default().to_string(),
                    private_dns: instance.private_dns_name().unwrap_or_default().to_string(),
                    instance_type: instance
                        .instance_type()
                        .map(|t| t.as_str().to_string())
                        .unwrap_or_default(),
                    tags,
                });
            }
        }

        debug!(count = records.len(), tag = %tag, "Listed running tagged instances");
        Ok(records)
    }
}

/// Metric store backed by CloudWatch
pub struct CloudWatchStore {
    client: aws_sdk_cloudwatch::Client,
}

impl CloudWatchStore {
    pub fn new(client: aws_sdk_cloudwatch::Client) -> Self {
        Self { client }
    }
}

/// Convert the provider-neutral batch into CloudWatch query structures
fn to_data_queries(queries: &[MetricQuery]) -> Result<Vec<MetricDataQuery>> {
    let mut data_queries = Vec::with_capacity(queries.len());

    for q in queries {
        let metric = Metric::builder()
            .namespace(&q.namespace)
            .metric_name(&q.metric_name)
            .dimensions(
                Dimension::builder()
                    .name(&q.dimension.0)
                    .value(&q.dimension.1)
                    .build()
                    .context("invalid metric dimension")?,
            )
            .build();

        let stat = MetricStat::builder()
            .metric(metric)
            .period(q.period_secs)
            .stat(&q.stat)
            .build()
            .context("invalid metric stat")?;

        data_queries.push(
            MetricDataQuery::builder()
                .id(q.id.to_string())
                .label(&q.label)
                .metric_stat(stat)
                .build()
                .context("invalid metric data query")?,
        );
    }

    Ok(data_queries)
}

fn to_aws_time(t: chrono::DateTime<Utc>) -> DateTime {
    DateTime::from_millis(t.timestamp_millis())
}

#[async_trait]
impl MetricStore for CloudWatchStore {
    async fn fetch_series(
        &self,
        queries: &[MetricQuery],
        window: TimeWindow,
    ) -> Result<Vec<MetricSeries>> {
        let resp = self
            .client
            .get_metric_data()
            .set_metric_data_queries(Some(to_data_queries(queries)?))
            .start_time(to_aws_time(window.start))
            .end_time(to_aws_time(window.end))
            .send()
            .await
            .context("GetMetricData failed")?;

        let series = resp
            .metric_data_results()
            .iter()
            .map(|r| MetricSeries {
                id: r.id().unwrap_or_default().to_string(),
                label: r.label().unwrap_or_default().to_string(),
                values: r.values().to_vec(),
            })
            .collect();

        Ok(series)
    }
}
