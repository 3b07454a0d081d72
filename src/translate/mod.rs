//! Message translation: decoded telemetry → field model updates.
//!
//! Pure functions: no I/O, no clocks. The translator owns the
//! changed-value check for scalar fields: an incoming value equal to the
//! field's current value produces no update, so an unchanged message never
//! re-dirties a clean field. FENCE_STATUS is the deliberate exception: its
//! updates are emitted unconditionally and always re-mark the fence record
//! dirty.

use crate::model::{FenceUpdate, FieldKey, FieldUpdate, FieldValue, VehicleFields};
use crate::telemetry::message::TelemetryMessage;

/// Link-derived values the heartbeat mapping needs. The heartbeat body
/// itself does not carry these; the ingestion loop supplies them from the
/// transport's flight state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeartbeatContext {
    pub armed: bool,
    pub flight_mode: String,
}

/// Translate one message into the updates to apply to the field model.
///
/// `heartbeat` must be `Some` for heartbeat messages; it is ignored for
/// every other type. A heartbeat without context yields no updates.
pub fn translate(
    message: &TelemetryMessage,
    heartbeat: Option<&HeartbeatContext>,
    fields: &VehicleFields,
) -> Vec<FieldUpdate> {
    let mut updates = Vec::new();

    match message {
        TelemetryMessage::EkfStatusReport(m) => {
            push_if_changed(
                &mut updates,
                fields,
                FieldKey::EkfHealth,
                FieldValue::Int(i64::from(m.flags)),
            );
        }
        TelemetryMessage::FenceStatus(m) => {
            // No equality check: the fence record re-dirties on every
            // FENCE_STATUS, even when nothing changed.
            updates.push(FieldUpdate::Fence(FenceUpdate {
                breach_time: m.breach_time,
                breach_count: m.breach_count,
                breach_status: m.breach_status,
                breach_type: m.breach_type,
            }));
        }
        TelemetryMessage::GlobalPositionInt(m) => {
            push_if_changed(
                &mut updates,
                fields,
                FieldKey::Latitude,
                FieldValue::Int(i64::from(m.lat)),
            );
            push_if_changed(
                &mut updates,
                fields,
                FieldKey::Longitude,
                FieldValue::Int(i64::from(m.lon)),
            );
            push_if_changed(
                &mut updates,
                fields,
                FieldKey::Altitude,
                FieldValue::Int(i64::from(m.relative_alt)),
            );
            push_if_changed(
                &mut updates,
                fields,
                FieldKey::Heading,
                FieldValue::Int(i64::from(m.hdg)),
            );
        }
        TelemetryMessage::GpsRawInt(m) => {
            push_if_changed(
                &mut updates,
                fields,
                FieldKey::GroundSpeed,
                FieldValue::Int(i64::from(m.vel)),
            );
        }
        TelemetryMessage::Heartbeat => {
            if let Some(ctx) = heartbeat {
                push_if_changed(
                    &mut updates,
                    fields,
                    FieldKey::Armed,
                    FieldValue::Bool(ctx.armed),
                );
                push_if_changed(
                    &mut updates,
                    fields,
                    FieldKey::FlightMode,
                    FieldValue::Text(ctx.flight_mode.clone()),
                );
            }
        }
        TelemetryMessage::SysStatus(m) => {
            push_if_changed(
                &mut updates,
                fields,
                FieldKey::BatteryVoltage,
                FieldValue::Int(i64::from(m.voltage_battery)),
            );
        }
    }

    updates
}

fn push_if_changed(
    updates: &mut Vec<FieldUpdate>,
    fields: &VehicleFields,
    key: FieldKey,
    value: FieldValue,
) {
    if fields.value(key) != &value {
        updates.push(FieldUpdate::Scalar { key, value });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::message::{
        EkfStatusReport, FenceStatus, GlobalPositionInt, GpsRawInt, SysStatus,
    };

    fn scalar(key: FieldKey, value: FieldValue) -> FieldUpdate {
        FieldUpdate::Scalar { key, value }
    }

    #[test]
    fn ekf_status_maps_to_ekf_health() {
        let fields = VehicleFields::default();
        let msg = TelemetryMessage::EkfStatusReport(EkfStatusReport { flags: 831 });
        assert_eq!(
            translate(&msg, None, &fields),
            vec![scalar(FieldKey::EkfHealth, FieldValue::Int(831))]
        );
    }

    #[test]
    fn global_position_maps_to_four_fields() {
        let fields = VehicleFields::default();
        let msg = TelemetryMessage::GlobalPositionInt(GlobalPositionInt {
            lat: 100,
            lon: 200,
            relative_alt: 50,
            hdg: 90,
        });
        assert_eq!(
            translate(&msg, None, &fields),
            vec![
                scalar(FieldKey::Latitude, FieldValue::Int(100)),
                scalar(FieldKey::Longitude, FieldValue::Int(200)),
                scalar(FieldKey::Altitude, FieldValue::Int(50)),
                scalar(FieldKey::Heading, FieldValue::Int(90)),
            ]
        );
    }

    #[test]
    fn gps_and_sys_status_map_to_single_fields() {
        let fields = VehicleFields::default();

        let gps = TelemetryMessage::GpsRawInt(GpsRawInt { vel: 1500 });
        assert_eq!(
            translate(&gps, None, &fields),
            vec![scalar(FieldKey::GroundSpeed, FieldValue::Int(1500))]
        );

        let sys = TelemetryMessage::SysStatus(SysStatus {
            voltage_battery: 12600,
        });
        assert_eq!(
            translate(&sys, None, &fields),
            vec![scalar(FieldKey::BatteryVoltage, FieldValue::Int(12600))]
        );
    }

    #[test]
    fn heartbeat_maps_link_state_through_context() {
        let fields = VehicleFields::default();
        let ctx = HeartbeatContext {
            armed: true,
            flight_mode: "GUIDED".into(),
        };
        assert_eq!(
            translate(&TelemetryMessage::Heartbeat, Some(&ctx), &fields),
            vec![
                scalar(FieldKey::Armed, FieldValue::Bool(true)),
                scalar(FieldKey::FlightMode, FieldValue::Text("GUIDED".into())),
            ]
        );

        // Without context there is nothing to map.
        assert!(translate(&TelemetryMessage::Heartbeat, None, &fields).is_empty());
    }

    #[test]
    fn unchanged_scalar_values_produce_no_updates() {
        let mut fields = VehicleFields::default();
        fields.apply(FieldKey::Latitude, FieldValue::Int(100));
        fields.clear_dirty(&[FieldKey::Latitude]);

        let msg = TelemetryMessage::GlobalPositionInt(GlobalPositionInt {
            lat: 100,
            lon: 200,
            relative_alt: 50,
            hdg: 90,
        });
        let updates = translate(&msg, None, &fields);

        // Latitude is unchanged and must not re-appear; the rest do.
        assert_eq!(
            updates,
            vec![
                scalar(FieldKey::Longitude, FieldValue::Int(200)),
                scalar(FieldKey::Altitude, FieldValue::Int(50)),
                scalar(FieldKey::Heading, FieldValue::Int(90)),
            ]
        );
    }

    #[test]
    fn repeated_identical_message_is_a_no_op() {
        let mut fields = VehicleFields::default();
        let msg = TelemetryMessage::SysStatus(SysStatus {
            voltage_battery: 11800,
        });

        for update in translate(&msg, None, &fields) {
            if let FieldUpdate::Scalar { key, value } = update {
                fields.apply(key, value);
            }
        }
        fields.clear_dirty(&[FieldKey::BatteryVoltage]);

        assert!(translate(&msg, None, &fields).is_empty());
        assert!(!fields.is_dirty(FieldKey::BatteryVoltage));
    }

    #[test]
    fn fence_updates_are_emitted_even_when_equal() {
        let fields = VehicleFields::default();
        let msg = TelemetryMessage::FenceStatus(FenceStatus {
            breach_time: 0,
            breach_count: 0,
            breach_status: 0,
            breach_type: 0,
        });

        // Twice in a row with the same payload; both times an update is produced.
        // The scalar paths skip unchanged values; the fence path must not.
        assert_eq!(translate(&msg, None, &fields).len(), 1);
        assert_eq!(translate(&msg, None, &fields).len(), 1);
        assert!(matches!(
            translate(&msg, None, &fields)[0],
            FieldUpdate::Fence(_)
        ));
    }
}
