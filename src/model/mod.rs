//! Canonical vehicle state model.
//!
//! One [`Device`] per tracked vehicle: the closed set of scalar fields the
//! fleet API knows about, plus the structured fence record, each unit
//! carrying a dirty flag. The model is deliberately dumb: `apply` always
//! sets and marks dirty; deciding *whether* a value changed is the
//! translator's job, and deciding *when* to report is the sync policy's.

use std::time::Instant;

/// Last-known value of a scalar field.
///
/// Values are typed in memory and string-encoded only at the API boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    /// Never observed on the telemetry stream.
    Unset,
    Bool(bool),
    Int(i64),
    Text(String),
}

impl std::fmt::Display for FieldValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FieldValue::Unset => Ok(()),
            FieldValue::Bool(b) => write!(f, "{}", b),
            FieldValue::Int(i) => write!(f, "{}", i),
            FieldValue::Text(s) => write!(f, "{}", s),
        }
    }
}

/// The closed set of scalar fields, with their stable wire identifiers.
///
/// `ALL` is the explicit descriptor table the model iterates; order here is
/// the order batches are serialized in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKey {
    GroundSpeed,
    Heading,
    BatteryVoltage,
    Armed,
    Latitude,
    Longitude,
    Altitude,
    FlightMode,
    EkfHealth,
}

impl FieldKey {
    pub const ALL: [FieldKey; 9] = [
        FieldKey::GroundSpeed,
        FieldKey::Heading,
        FieldKey::BatteryVoltage,
        FieldKey::Armed,
        FieldKey::Latitude,
        FieldKey::Longitude,
        FieldKey::Altitude,
        FieldKey::FlightMode,
        FieldKey::EkfHealth,
    ];

    /// Field identifier agreed with the remote API's schema.
    pub fn field_id(self) -> u16 {
        match self {
            FieldKey::GroundSpeed => 1,
            FieldKey::Heading => 2,
            FieldKey::BatteryVoltage => 3,
            FieldKey::Armed => 4,
            FieldKey::Latitude => 5,
            FieldKey::Longitude => 6,
            FieldKey::Altitude => 7,
            FieldKey::FlightMode => 8,
            FieldKey::EkfHealth => 9,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKey::GroundSpeed => "ground_speed",
            FieldKey::Heading => "heading",
            FieldKey::BatteryVoltage => "battery_voltage",
            FieldKey::Armed => "armed",
            FieldKey::Latitude => "latitude",
            FieldKey::Longitude => "longitude",
            FieldKey::Altitude => "altitude",
            FieldKey::FlightMode => "flight_mode",
            FieldKey::EkfHealth => "ekf_health",
        }
    }
}

/// One scalar observation. `dirty` is true iff `value` changed since the
/// last confirmed flush that included this field.
#[derive(Debug, Clone)]
pub struct Field {
    pub value: FieldValue,
    pub dirty: bool,
}

impl Default for Field {
    fn default() -> Self {
        Self {
            value: FieldValue::Unset,
            dirty: false,
        }
    }
}

/// The fixed scalar field set for one vehicle.
#[derive(Debug, Clone, Default)]
pub struct VehicleFields {
    ground_speed: Field,
    heading: Field,
    battery_voltage: Field,
    armed: Field,
    latitude: Field,
    longitude: Field,
    altitude: Field,
    flight_mode: Field,
    ekf_health: Field,
}

impl VehicleFields {
    fn field(&self, key: FieldKey) -> &Field {
        match key {
            FieldKey::GroundSpeed => &self.ground_speed,
            FieldKey::Heading => &self.heading,
            FieldKey::BatteryVoltage => &self.battery_voltage,
            FieldKey::Armed => &self.armed,
            FieldKey::Latitude => &self.latitude,
            FieldKey::Longitude => &self.longitude,
            FieldKey::Altitude => &self.altitude,
            FieldKey::FlightMode => &self.flight_mode,
            FieldKey::EkfHealth => &self.ekf_health,
        }
    }

    fn field_mut(&mut self, key: FieldKey) -> &mut Field {
        match key {
            FieldKey::GroundSpeed => &mut self.ground_speed,
            FieldKey::Heading => &mut self.heading,
            FieldKey::BatteryVoltage => &mut self.battery_voltage,
            FieldKey::Armed => &mut self.armed,
            FieldKey::Latitude => &mut self.latitude,
            FieldKey::Longitude => &mut self.longitude,
            FieldKey::Altitude => &mut self.altitude,
            FieldKey::FlightMode => &mut self.flight_mode,
            FieldKey::EkfHealth => &mut self.ekf_health,
        }
    }

    /// Set a field's value and mark it dirty, unconditionally.
    pub fn apply(&mut self, key: FieldKey, value: FieldValue) {
        let field = self.field_mut(key);
        field.value = value;
        field.dirty = true;
    }

    pub fn value(&self, key: FieldKey) -> &FieldValue {
        &self.field(key).value
    }

    pub fn is_dirty(&self, key: FieldKey) -> bool {
        self.field(key).dirty
    }

    /// Currently-dirty fields in descriptor order. Does not clear flags;
    /// clearing happens only after the gateway confirms delivery.
    pub fn snapshot_dirty(&self) -> Vec<(FieldKey, FieldValue)> {
        FieldKey::ALL
            .iter()
            .filter(|key| self.field(**key).dirty)
            .map(|key| (*key, self.field(*key).value.clone()))
            .collect()
    }

    /// Clear dirty flags for exactly the given keys. Fields that became
    /// dirty after a snapshot was taken and are not in `keys` stay dirty.
    pub fn clear_dirty(&mut self, keys: &[FieldKey]) {
        for key in keys {
            self.field_mut(*key).dirty = false;
        }
    }
}

/// Geofence status record. Reported on its own API route, never mixed into
/// the scalar batch, and marked dirty on every fence update regardless of
/// whether the values changed.
#[derive(Debug, Clone, Default)]
pub struct FenceState {
    pub breach_time: u32,
    pub breach_count: u16,
    pub breach_status: u8,
    pub breach_type: u8,
    pub dirty: bool,
}

/// A full replacement of the fence record, as carried by one FENCE_STATUS
/// message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FenceUpdate {
    pub breach_time: u32,
    pub breach_count: u16,
    pub breach_status: u8,
    pub breach_type: u8,
}

/// One translated state mutation. The two kinds are statically distinct:
/// a scalar field update and a fence-record update never share a code path.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Scalar { key: FieldKey, value: FieldValue },
    Fence(FenceUpdate),
}

/// A fence breach occurrence, detected when an applied fence update raises
/// the breach count while a breach is active.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreachEvent {
    pub breach_count: u16,
    pub breach_type: u8,
}

/// One tracked vehicle: identity, field model, fence record, and the flush
/// clock the sync policy reads.
#[derive(Debug, Clone)]
pub struct Device {
    uuid: String,
    pub fields: VehicleFields,
    pub fence: FenceState,
    /// Advances only on a flush the gateway confirmed.
    pub last_flush_time: Instant,
    /// Last time any message for this vehicle was observed.
    pub last_seen: Instant,
}

impl Device {
    pub fn new(uuid: impl Into<String>, now: Instant) -> Self {
        Self {
            uuid: uuid.into(),
            fields: VehicleFields::default(),
            fence: FenceState::default(),
            last_flush_time: now,
            last_seen: now,
        }
    }

    pub fn uuid(&self) -> &str {
        &self.uuid
    }

    /// Apply one translated update. Returns a breach occurrence when a fence
    /// update reports a new breach (count increased, breach active).
    pub fn apply_update(&mut self, update: FieldUpdate) -> Option<BreachEvent> {
        match update {
            FieldUpdate::Scalar { key, value } => {
                self.fields.apply(key, value);
                None
            }
            FieldUpdate::Fence(fence) => {
                let new_breach =
                    fence.breach_status != 0 && fence.breach_count > self.fence.breach_count;
                self.fence.breach_time = fence.breach_time;
                self.fence.breach_count = fence.breach_count;
                self.fence.breach_status = fence.breach_status;
                self.fence.breach_type = fence.breach_type;
                self.fence.dirty = true;
                new_breach.then_some(BreachEvent {
                    breach_count: fence.breach_count,
                    breach_type: fence.breach_type,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device() -> Device {
        Device::new("12345", Instant::now())
    }

    #[test]
    fn apply_sets_value_and_marks_dirty_unconditionally() {
        let mut fields = VehicleFields::default();
        fields.apply(FieldKey::Heading, FieldValue::Int(90));
        assert_eq!(fields.value(FieldKey::Heading), &FieldValue::Int(90));
        assert!(fields.is_dirty(FieldKey::Heading));

        // Re-applying the same value still marks dirty; the equality skip
        // lives in the translator, not here.
        fields.clear_dirty(&[FieldKey::Heading]);
        fields.apply(FieldKey::Heading, FieldValue::Int(90));
        assert!(fields.is_dirty(FieldKey::Heading));
    }

    #[test]
    fn snapshot_returns_dirty_fields_in_descriptor_order() {
        let mut fields = VehicleFields::default();
        fields.apply(FieldKey::EkfHealth, FieldValue::Int(5));
        fields.apply(FieldKey::GroundSpeed, FieldValue::Int(12));

        let snapshot = fields.snapshot_dirty();
        let keys: Vec<FieldKey> = snapshot.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec![FieldKey::GroundSpeed, FieldKey::EkfHealth]);

        // Snapshot must not clear.
        assert!(fields.is_dirty(FieldKey::GroundSpeed));
        assert!(fields.is_dirty(FieldKey::EkfHealth));
    }

    #[test]
    fn clear_dirty_touches_exactly_the_given_keys() {
        let mut fields = VehicleFields::default();
        fields.apply(FieldKey::Latitude, FieldValue::Int(100));
        fields.apply(FieldKey::Longitude, FieldValue::Int(200));

        // A field that went dirty after the batch was assembled survives the
        // clear and is picked up next cycle.
        let batch: Vec<FieldKey> = fields.snapshot_dirty().iter().map(|(k, _)| *k).collect();
        fields.apply(FieldKey::Altitude, FieldValue::Int(50));
        fields.clear_dirty(&batch);

        assert!(!fields.is_dirty(FieldKey::Latitude));
        assert!(!fields.is_dirty(FieldKey::Longitude));
        assert!(fields.is_dirty(FieldKey::Altitude));
    }

    #[test]
    fn fence_update_always_marks_dirty() {
        let mut dev = device();
        let update = FenceUpdate {
            breach_time: 0,
            breach_count: 0,
            breach_status: 0,
            breach_type: 0,
        };
        // Equal to the default record in every sub-field, still dirty.
        dev.apply_update(FieldUpdate::Fence(update));
        assert!(dev.fence.dirty);
    }

    #[test]
    fn fence_breach_detected_only_on_count_increase_with_active_status() {
        let mut dev = device();

        let breach = dev.apply_update(FieldUpdate::Fence(FenceUpdate {
            breach_time: 1000,
            breach_count: 1,
            breach_status: 1,
            breach_type: 2,
        }));
        assert_eq!(
            breach,
            Some(BreachEvent {
                breach_count: 1,
                breach_type: 2
            })
        );

        // Same count again: no new occurrence, record still marked dirty.
        dev.fence.dirty = false;
        let repeat = dev.apply_update(FieldUpdate::Fence(FenceUpdate {
            breach_time: 1000,
            breach_count: 1,
            breach_status: 1,
            breach_type: 2,
        }));
        assert_eq!(repeat, None);
        assert!(dev.fence.dirty);

        // Count increase with breach_status cleared is not an occurrence.
        let cleared = dev.apply_update(FieldUpdate::Fence(FenceUpdate {
            breach_time: 2000,
            breach_count: 2,
            breach_status: 0,
            breach_type: 0,
        }));
        assert_eq!(cleared, None);
    }

    #[test]
    fn field_values_render_as_api_strings() {
        assert_eq!(FieldValue::Unset.to_string(), "");
        assert_eq!(FieldValue::Bool(true).to_string(), "true");
        assert_eq!(FieldValue::Int(-42).to_string(), "-42");
        assert_eq!(FieldValue::Text("GUIDED".into()).to_string(), "GUIDED");
    }

    #[test]
    fn field_ids_are_stable() {
        let ids: Vec<u16> = FieldKey::ALL.iter().map(|k| k.field_id()).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5, 6, 7, 8, 9]);
    }
}
