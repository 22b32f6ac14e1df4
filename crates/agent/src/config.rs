//! Agent configuration

use anyhow::Result;
use serde::Deserialize;

/// Agent configuration, loaded from AGENT_* environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct AgentConfig {
    /// AWS region hosting the broker fleet
    #[serde(default = "default_aws_region")]
    pub aws_region: String,

    /// Instance tag carrying the Kafka broker id
    #[serde(default = "default_broker_id_tag")]
    pub broker_id_tag: String,

    /// API server port for snapshot/health/metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Collection interval in seconds
    #[serde(default = "default_poll_interval")]
    pub poll_interval_secs: u64,
}

fn default_aws_region() -> String {
    std::env::var("AWS_REGION").unwrap_or_else(|_| "us-east-1".to_string())
}

fn default_broker_id_tag() -> String {
    "broker-id".to_string()
}

fn default_api_port() -> u16 {
    8080
}

fn default_poll_interval() -> u64 {
    60
}

impl AgentConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("AGENT"))
            .build()?;

        Ok(config.try_deserialize().unwrap_or_else(|_| AgentConfig {
            aws_region: default_aws_region(),
            broker_id_tag: default_broker_id_tag(),
            api_port: default_api_port(),
            poll_interval_secs: default_poll_interval(),
        }))
    }
}
