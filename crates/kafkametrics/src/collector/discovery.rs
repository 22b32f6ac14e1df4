//! Broker discovery from the instance inventory
//!
//! Brokers are not statically configured; any running instance carrying a
//! non-empty broker-id tag is part of the fleet. The tag value is the only
//! stable join key between the inventory and metric services.

use crate::error::CollectWarning;
use crate::models::{Broker, InstanceRecord};
use std::collections::HashMap;
use tracing::{debug, warn};

/// A broker paired with the instance backing it
///
/// The instance id is needed as the metric dimension value but is not part
/// of the snapshot handed back to the caller.
#[derive(Debug, Clone)]
pub struct DiscoveredBroker {
    pub broker: Broker,
    pub instance_id: String,
}

/// Build the broker map from the inventory listing
///
/// Instances whose tag value does not parse as an integer are skipped with
/// a warning. Duplicate broker ids keep the last instance seen, also with a
/// warning; last-wins matches the behavior downstream consumers expect.
pub fn broker_map_from_instances(
    instances: Vec<InstanceRecord>,
    broker_id_tag: &str,
    warnings: &mut Vec<CollectWarning>,
) -> HashMap<u32, DiscoveredBroker> {
    let mut brokers: HashMap<u32, DiscoveredBroker> = HashMap::with_capacity(instances.len());

    for instance in instances {
        let Some(value) = instance.tags.get(broker_id_tag) else {
            // The inventory filter should make this unreachable
            continue;
        };

        let id = match value.parse::<u32>() {
            Ok(id) => id,
            Err(_) => {
                warn!(
                    instance_id = %instance.instance_id,
                    tag_value = %value,
                    "Skipping instance with non-integer broker id tag"
                );
                warnings.push(CollectWarning::NonNumericTag {
                    instance_id: instance.instance_id,
                    value: value.clone(),
                });
                continue;
            }
        };

        debug!(
            broker_id = id,
            instance_id = %instance.instance_id,
            host = %instance.private_dns,
            "Discovered broker"
        );

        let discovered = DiscoveredBroker {
            broker: Broker::new(id, instance.private_dns, instance.instance_type),
            instance_id: instance.instance_id,
        };

        if let Some(previous) = brokers.insert(id, discovered) {
            let kept = brokers[&id].instance_id.clone();
            warn!(
                broker_id = id,
                kept = %kept,
                dropped = %previous.instance_id,
                "Duplicate broker id, keeping the last instance seen"
            );
            warnings.push(CollectWarning::DuplicateBrokerId {
                id,
                kept,
                dropped: previous.instance_id,
            });
        }
    }

    brokers
}
