//! Metric query construction and response demultiplexing
//!
//! Each discovered broker yields two queries (inbound and outbound network
//! rate) tagged with a synthetic id of the form `<direction>_<brokerId>`.
//! The id is the only join key between the batched response and the broker
//! map; labels exist purely for human debugging.

use super::discovery::DiscoveredBroker;
use crate::error::CollectWarning;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Fixed lookback window length
pub const LOOKBACK_MINUTES: i64 = 5;

/// Finest sampling period the provider accepts, in seconds
pub const SAMPLE_PERIOD_SECS: i32 = 1;

/// The provider reports sub-minute-period stats averaged over 60s; dividing
/// the first sample by this yields a per-second byte rate.
pub const STAT_WINDOW_SECS: f64 = 60.0;

/// GetMetricData accepts at most this many queries per call
pub const MAX_BATCH_QUERIES: usize = 500;

/// Traffic direction of a network metric
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    /// Provider-side metric name for this direction
    pub fn metric_name(&self) -> &'static str {
        match self {
            Direction::In => "NetworkIn",
            Direction::Out => "NetworkOut",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Direction {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "in" => Ok(Direction::In),
            "out" => Ok(Direction::Out),
            _ => Err(()),
        }
    }
}

/// Synthetic identifier correlating a batched query with its broker
///
/// Renders as `<direction>_<brokerId>` and must always split back into
/// exactly those two parts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct QueryId {
    pub direction: Direction,
    pub broker_id: u32,
}

impl QueryId {
    pub fn new(direction: Direction, broker_id: u32) -> Self {
        Self {
            direction,
            broker_id,
        }
    }
}

impl fmt::Display for QueryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.direction, self.broker_id)
    }
}

impl FromStr for QueryId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (direction, id) = s.split_once('_').ok_or(())?;
        let direction = direction.parse::<Direction>()?;
        let broker_id = id.parse::<u32>().map_err(|_| ())?;
        Ok(Self {
            direction,
            broker_id,
        })
    }
}

/// One time-series selector within the batched request
#[derive(Debug, Clone, PartialEq)]
pub struct MetricQuery {
    pub id: QueryId,
    /// Human-readable label carrying the instance id, not used for joining
    pub label: String,
    pub namespace: String,
    pub metric_name: String,
    /// Dimension name/value pair scoping the series to one instance
    pub dimension: (String, String),
    pub period_secs: i32,
    pub stat: String,
}

/// One time-series returned by the metric store
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    /// Echo of the query id this series answers
    pub id: String,
    pub label: String,
    /// Ordered samples; only the first is consumed
    pub values: Vec<f64>,
}

/// Query window anchored at "now"
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The fixed 5-minute lookback ending at `end`
    pub fn lookback(end: DateTime<Utc>) -> Self {
        Self {
            start: end - Duration::minutes(LOOKBACK_MINUTES),
            end,
        }
    }
}

/// Build the in/out query pair for every discovered broker
///
/// Output content is deterministic for a fixed broker map; order follows
/// map iteration and is unspecified.
pub fn build_queries(brokers: &HashMap<u32, DiscoveredBroker>) -> Vec<MetricQuery> {
    let mut queries = Vec::with_capacity(brokers.len() * 2);

    for (id, discovered) in brokers {
        for direction in [Direction::In, Direction::Out] {
            let prefix = match direction {
                Direction::In => "kafkaNetIn",
                Direction::Out => "kafkaNetOut",
            };
            queries.push(MetricQuery {
                id: QueryId::new(direction, *id),
                label: format!("{}_{}", prefix, discovered.instance_id),
                namespace: "AWS/EC2".to_string(),
                metric_name: direction.metric_name().to_string(),
                dimension: ("InstanceId".to_string(), discovered.instance_id.clone()),
                period_secs: SAMPLE_PERIOD_SECS,
                stat: "Average".to_string(),
            });
        }
    }

    queries
}

/// Route each returned series back to its broker and fill in the rate
///
/// Malformed or unknown ids and empty series are recorded as warnings
/// rather than faulting; series with extra samples are flagged but still
/// consume only the first sample.
pub fn apply_series(
    brokers: &mut HashMap<u32, DiscoveredBroker>,
    series: Vec<MetricSeries>,
    warnings: &mut Vec<CollectWarning>,
) {
    for s in series {
        let id = match s.id.parse::<QueryId>() {
            Ok(id) => id,
            Err(()) => {
                tracing::warn!(id = %s.id, "Discarding malformed metric result id");
                warnings.push(CollectWarning::MalformedQueryId { id: s.id });
                continue;
            }
        };

        let Some(discovered) = brokers.get_mut(&id.broker_id) else {
            tracing::warn!(id = %s.id, "Metric result does not match any discovered broker");
            warnings.push(CollectWarning::UnknownQueryId { id: s.id });
            continue;
        };

        let Some(first) = s.values.first() else {
            warnings.push(CollectWarning::EmptySeries { id: s.id });
            continue;
        };
        if s.values.len() > 1 {
            warnings.push(CollectWarning::ExtraSamples {
                id: s.id.clone(),
                count: s.values.len(),
            });
        }

        let rate = first / STAT_WINDOW_SECS;
        match id.direction {
            Direction::In => discovered.broker.net_rx = rate,
            Direction::Out => discovered.broker.net_tx = rate,
        }
    }
}
