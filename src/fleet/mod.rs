//! Device registry: every vehicle this bridge has seen.
//!
//! Entries are created lazily on first sighting of a new identity and live
//! for the process lifetime unless idle eviction is enabled. The registry
//! is the sole owner of all [`Device`] state; the ingestion loop only holds
//! a transient borrow for the message being processed.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::info;

use crate::model::Device;

/// Registry of tracked vehicles, keyed by uuid.
#[derive(Debug, Default)]
pub struct Fleet {
    devices: HashMap<String, Device>,
}

impl Fleet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the device for `uuid`, creating it on first sight.
    pub fn device_mut(&mut self, uuid: &str, now: Instant) -> &mut Device {
        if !self.devices.contains_key(uuid) {
            info!(uuid = %uuid, fleet_size = self.devices.len() + 1, "Added vehicle to fleet");
        }
        self.devices
            .entry(uuid.to_string())
            .or_insert_with(|| Device::new(uuid, now))
    }

    pub fn get(&self, uuid: &str) -> Option<&Device> {
        self.devices.get(uuid)
    }

    pub fn len(&self) -> usize {
        self.devices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }

    /// Drop devices not seen for longer than `max_idle`. Returns the number
    /// evicted. Unflushed dirty state on an evicted device is lost; the
    /// caller chooses the window accordingly.
    pub fn prune_idle(&mut self, max_idle: Duration, now: Instant) -> usize {
        let before = self.devices.len();
        self.devices
            .retain(|_, device| now.duration_since(device.last_seen) <= max_idle);
        let evicted = before - self.devices.len();
        if evicted > 0 {
            info!(
                evicted = evicted,
                remaining = self.devices.len(),
                "Evicted idle vehicles from fleet"
            );
        }
        evicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldKey, FieldValue};

    #[test]
    fn device_is_created_on_first_sight_and_reused_after() {
        let mut fleet = Fleet::new();
        let now = Instant::now();
        assert!(fleet.is_empty());

        fleet
            .device_mut("12345", now)
            .fields
            .apply(FieldKey::Heading, FieldValue::Int(90));
        assert_eq!(fleet.len(), 1);

        // Second lookup returns the same entry, state intact.
        let device = fleet.device_mut("12345", now);
        assert!(device.fields.is_dirty(FieldKey::Heading));
        assert_eq!(fleet.len(), 1);
    }

    #[test]
    fn prune_drops_only_idle_devices() {
        let mut fleet = Fleet::new();
        let start = Instant::now();
        fleet.device_mut("idle", start);
        let later = start + Duration::from_secs(120);
        fleet.device_mut("active", later);

        let evicted = fleet.prune_idle(Duration::from_secs(60), later);
        assert_eq!(evicted, 1);
        assert!(fleet.get("idle").is_none());
        assert!(fleet.get("active").is_some());
    }
}
