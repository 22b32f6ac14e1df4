//! Core data models for broker metrics collection

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Network throughput snapshot for one Kafka broker
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Broker {
    /// Broker id taken from the instance's broker-id tag
    pub id: u32,
    /// Private DNS name of the backing instance
    pub host: String,
    /// Cloud machine class (e.g. "m5.xlarge")
    pub instance_type: String,
    /// Inbound network rate in MB/s, averaged over the lookback window
    pub net_rx: f64,
    /// Outbound network rate in MB/s, averaged over the lookback window
    pub net_tx: f64,
}

impl Broker {
    /// Create a zero-rated broker record; rates are filled in during demux
    pub fn new(id: u32, host: impl Into<String>, instance_type: impl Into<String>) -> Self {
        Self {
            id,
            host: host.into(),
            instance_type: instance_type.into(),
            net_rx: 0.0,
            net_tx: 0.0,
        }
    }
}

/// Mapping of broker id to its metrics snapshot, the pipeline's output
pub type BrokerMetrics = HashMap<u32, Broker>;

/// A running cloud instance as reported by the inventory service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstanceRecord {
    /// Cloud-assigned instance id, used as the metric dimension value
    pub instance_id: String,
    /// Private DNS name
    pub private_dns: String,
    /// Machine class
    pub instance_type: String,
    /// Tag key/value pairs attached to the instance
    pub tags: HashMap<String, String>,
}

/// An operator event; posting is a no-op retained for caller compatibility
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub title: String,
    pub text: String,
    pub tags: Vec<String>,
}
