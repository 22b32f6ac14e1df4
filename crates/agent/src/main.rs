//! Kafka throughput agent
//!
//! Polls the broker-discovery-and-join pipeline on a fixed cadence and
//! exposes the most recent snapshot, health probes, and Prometheus metrics
//! over HTTP.

use anyhow::Result;
use kafkametrics::health::{components, HealthRegistry};
use kafkametrics::{aws, CollectError, Collector};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{error, info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const AGENT_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    let config = config::AgentConfig::load()?;
    info!(
        version = AGENT_VERSION,
        region = %config.aws_region,
        broker_id_tag = %config.broker_id_tag,
        interval_secs = config.poll_interval_secs,
        "Starting kafkametrics-agent"
    );

    let health_registry = HealthRegistry::new();
    health_registry.register(components::COLLECTOR).await;
    health_registry.register(components::INVENTORY).await;
    health_registry.register(components::METRIC_STORE).await;

    let (inventory, store) = aws::clients_for_region(&config.aws_region).await;
    let collector = Collector::new(Arc::new(inventory), Arc::new(store), &config.broker_id_tag);

    let snapshot: api::SharedSnapshot = Arc::new(RwLock::new(None));
    let app_state = Arc::new(api::AppState::new(health_registry.clone(), snapshot.clone()));
    health_registry.set_ready(true).await;

    tokio::spawn(api::serve(config.api_port, app_state));

    let mut ticker = tokio::time::interval(Duration::from_secs(config.poll_interval_secs));
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                run_collection(&collector, &health_registry, &snapshot).await;
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down");
                break;
            }
        }
    }

    Ok(())
}

/// Run one collection cycle and fold the outcome into health state
async fn run_collection(
    collector: &Collector,
    health: &HealthRegistry,
    snapshot: &api::SharedSnapshot,
) {
    match collector.collect_broker_metrics().await {
        Ok((brokers, warnings)) => {
            health.set_healthy(components::INVENTORY).await;
            health.set_healthy(components::METRIC_STORE).await;

            if warnings.is_empty() {
                health.set_healthy(components::COLLECTOR).await;
            } else {
                for warning in &warnings {
                    warn!(warning = %warning, "Data-quality warning");
                }
                health
                    .set_degraded(
                        components::COLLECTOR,
                        format!("{} warnings in last run", warnings.len()),
                    )
                    .await;
            }

            *snapshot.write().await = Some(brokers);
        }
        Err(err) => {
            error!(error = %err, "Collection failed");
            match &err {
                CollectError::Discovery(_) => {
                    health
                        .set_unhealthy(components::INVENTORY, err.to_string())
                        .await;
                }
                CollectError::MetricQuery(_) => {
                    health
                        .set_unhealthy(components::METRIC_STORE, err.to_string())
                        .await;
                }
                CollectError::BatchOverflow { .. } => {
                    health
                        .set_unhealthy(components::COLLECTOR, err.to_string())
                        .await;
                }
            }
        }
    }
}
