//! Broker network-throughput collection for tag-identified Kafka fleets
//!
//! This crate provides the core functionality for:
//! - Discovering running brokers through a cloud instance inventory tag
//! - Batching per-broker network metric queries into one round trip
//! - Demultiplexing the batched response back onto broker records
//! - Health checks and Prometheus observability

pub mod aws;
pub mod collector;
pub mod error;
pub mod health;
pub mod models;
pub mod observability;

pub use collector::{Collector, InstanceInventory, MetricStore};
pub use error::{CollectError, CollectWarning};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::CollectorMetrics;
