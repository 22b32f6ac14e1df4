//! Error taxonomy for the collection pipeline
//!
//! Fatal conditions abort the whole collection attempt and surface as
//! [`CollectError`]. Per-broker data-quality issues never abort; they are
//! gathered into the warning list returned alongside the broker map.

use thiserror::Error;

/// Fatal failure that aborts a collection attempt
#[derive(Debug, Error)]
pub enum CollectError {
    /// The inventory service could not be queried
    #[error("instance discovery failed")]
    Discovery(#[source] anyhow::Error),

    /// The batched metric query could not be executed
    #[error("metric query failed")]
    MetricQuery(#[source] anyhow::Error),

    /// The constructed batch exceeds the metric service's per-call limit
    #[error("metric batch of {queries} queries exceeds the per-call limit of {limit}")]
    BatchOverflow { queries: usize, limit: usize },
}

/// Per-broker data-quality issue collected during a run
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollectWarning {
    /// The broker-id tag value was not parseable as an integer; the host
    /// was skipped
    #[error("instance {instance_id}: tag value {value:?} is not an integer broker id")]
    NonNumericTag { instance_id: String, value: String },

    /// Two running instances carried the same broker id; the later one won
    #[error("broker id {id}: instance {kept} replaced {dropped}")]
    DuplicateBrokerId { id: u32, kept: String, dropped: String },

    /// A metric result id did not split into a direction and broker id
    #[error("metric result id {id:?} is malformed")]
    MalformedQueryId { id: String },

    /// A metric result referenced a broker id missing from discovery
    #[error("metric result {id:?} does not match any discovered broker")]
    UnknownQueryId { id: String },

    /// A metric result carried no samples for the window
    #[error("metric result {id:?} returned no samples")]
    EmptySeries { id: String },

    /// A metric result carried more than one sample; only the first is used
    #[error("metric result {id:?} returned {count} samples, expected one")]
    ExtraSamples { id: String, count: usize },
}
