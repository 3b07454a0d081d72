//! MAVLink-over-UDP telemetry source.
//!
//! The one module that knows the wire protocol. Decoding is delegated to
//! the `mavlink` crate (ardupilotmega dialect); this adapter classifies
//! decoded frames into the tracked [`TelemetryMessage`] set, maintains the
//! link-derived armed/mode state from heartbeats, and drops everything
//! else. Undecodable frames are skipped with a debug log; a malformed
//! datagram must never take the bridge down.

use async_trait::async_trait;
use mavlink::ardupilotmega::{MavMessage, MavModeFlag, MavType};
use mavlink::error::MessageReadError;
use tracing::{debug, info, warn};

use super::message::{
    EkfStatusReport, FenceStatus, GlobalPositionInt, GpsRawInt, SysStatus, TelemetryMessage,
};
use super::modes::{mode_label, VehicleClass};
use super::source::{
    FlightState, MessageEvent, ReceivedMessage, TelemetrySource, TransportError,
};

/// Telemetry source bound to a local UDP endpoint.
pub struct MavlinkUdpSource {
    conn: Box<dyn mavlink::AsyncMavConnection<MavMessage> + Sync + Send>,
    name: String,
    flight: FlightState,
}

impl MavlinkUdpSource {
    /// Bind the listening endpoint, e.g. `0.0.0.0:14550`.
    pub async fn bind(listen: &str) -> Result<Self, TransportError> {
        let endpoint = format!("udpin:{}", listen);
        let conn = mavlink::connect_async::<MavMessage>(&endpoint)
            .await
            .map_err(|e| TransportError::ConnectionFailed(format!("{}: {}", endpoint, e)))?;

        Ok(Self {
            conn,
            name: format!("mavlink-udp:{}", listen),
            flight: FlightState::default(),
        })
    }

    /// Update link-derived state from a heartbeat frame.
    fn observe_heartbeat(&mut self, data: &mavlink::ardupilotmega::HEARTBEAT_DATA) {
        let armed = data
            .base_mode
            .contains(MavModeFlag::MAV_MODE_FLAG_SAFETY_ARMED);
        let mode = mode_label(vehicle_class(data.mavtype), data.custom_mode);
        if armed != self.flight.armed || mode != self.flight.mode {
            debug!(armed = armed, mode = %mode, "Link flight state changed");
        }
        self.flight = FlightState { armed, mode };
    }
}

#[async_trait]
impl TelemetrySource for MavlinkUdpSource {
    async fn wait_online(&mut self) -> Result<(), TransportError> {
        loop {
            match self.conn.recv().await {
                Ok((header, MavMessage::HEARTBEAT(data))) => {
                    self.observe_heartbeat(&data);
                    info!(
                        system_id = header.system_id,
                        "Heartbeat received, link is up"
                    );
                    return Ok(());
                }
                Ok(_) => continue,
                Err(MessageReadError::Io(e)) => return Err(TransportError::Io(e)),
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable frame while waiting for heartbeat");
                }
            }
        }
    }

    async fn next_message(&mut self) -> Result<MessageEvent, TransportError> {
        loop {
            match self.conn.recv().await {
                Ok((header, message)) => {
                    if let MavMessage::HEARTBEAT(ref data) = message {
                        self.observe_heartbeat(data);
                    }
                    if let Some(decoded) = classify(&message) {
                        return Ok(MessageEvent::Message(ReceivedMessage {
                            system_id: header.system_id,
                            message: decoded,
                        }));
                    }
                }
                Err(MessageReadError::Io(e)) => {
                    warn!(error = %e, "Transport read failed, treating as end of stream");
                    return Ok(MessageEvent::Eof);
                }
                Err(e) => {
                    debug!(error = %e, "Skipping undecodable frame");
                }
            }
        }
    }

    fn flight_state(&self) -> FlightState {
        self.flight.clone()
    }

    fn source_name(&self) -> &str {
        &self.name
    }
}

/// Map a decoded MAVLink frame onto the tracked message set. Untracked
/// types yield `None` and are dropped without any state effect.
fn classify(message: &MavMessage) -> Option<TelemetryMessage> {
    match message {
        MavMessage::EKF_STATUS_REPORT(m) => {
            Some(TelemetryMessage::EkfStatusReport(EkfStatusReport {
                flags: m.flags.bits(),
            }))
        }
        MavMessage::FENCE_STATUS(m) => Some(TelemetryMessage::FenceStatus(FenceStatus {
            breach_time: m.breach_time,
            breach_count: m.breach_count,
            breach_status: m.breach_status,
            breach_type: m.breach_type as u8,
        })),
        MavMessage::GLOBAL_POSITION_INT(m) => {
            Some(TelemetryMessage::GlobalPositionInt(GlobalPositionInt {
                lat: m.lat,
                lon: m.lon,
                relative_alt: m.relative_alt,
                hdg: m.hdg,
            }))
        }
        MavMessage::GPS_RAW_INT(m) => {
            Some(TelemetryMessage::GpsRawInt(GpsRawInt { vel: m.vel }))
        }
        MavMessage::HEARTBEAT(_) => Some(TelemetryMessage::Heartbeat),
        MavMessage::SYS_STATUS(m) => Some(TelemetryMessage::SysStatus(SysStatus {
            voltage_battery: m.voltage_battery,
        })),
        _ => None,
    }
}

/// Collapse the protocol's frame-type zoo into the classes the mode tables
/// distinguish.
fn vehicle_class(mav_type: MavType) -> VehicleClass {
    match mav_type {
        MavType::MAV_TYPE_QUADROTOR
        | MavType::MAV_TYPE_HEXAROTOR
        | MavType::MAV_TYPE_OCTOROTOR
        | MavType::MAV_TYPE_TRICOPTER
        | MavType::MAV_TYPE_COAXIAL
        | MavType::MAV_TYPE_HELICOPTER => VehicleClass::Copter,
        MavType::MAV_TYPE_FIXED_WING => VehicleClass::Plane,
        MavType::MAV_TYPE_GROUND_ROVER | MavType::MAV_TYPE_SURFACE_BOAT => VehicleClass::Rover,
        _ => VehicleClass::Other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mavlink::ardupilotmega::{
        ATTITUDE_DATA, GLOBAL_POSITION_INT_DATA, GPS_RAW_INT_DATA, STATUSTEXT_DATA,
        SYS_STATUS_DATA,
    };

    #[test]
    fn tracked_frames_classify_to_decoded_messages() {
        let position = MavMessage::GLOBAL_POSITION_INT(GLOBAL_POSITION_INT_DATA {
            lat: 100,
            lon: 200,
            relative_alt: 50,
            hdg: 90,
            ..Default::default()
        });
        assert_eq!(
            classify(&position),
            Some(TelemetryMessage::GlobalPositionInt(GlobalPositionInt {
                lat: 100,
                lon: 200,
                relative_alt: 50,
                hdg: 90,
            }))
        );

        let gps = MavMessage::GPS_RAW_INT(GPS_RAW_INT_DATA {
            vel: 1500,
            ..Default::default()
        });
        assert_eq!(
            classify(&gps),
            Some(TelemetryMessage::GpsRawInt(GpsRawInt { vel: 1500 }))
        );

        let sys = MavMessage::SYS_STATUS(SYS_STATUS_DATA {
            voltage_battery: 12600,
            ..Default::default()
        });
        assert_eq!(
            classify(&sys),
            Some(TelemetryMessage::SysStatus(SysStatus {
                voltage_battery: 12600
            }))
        );
    }

    #[test]
    fn untracked_frames_classify_to_none() {
        assert_eq!(classify(&MavMessage::ATTITUDE(ATTITUDE_DATA::default())), None);
        assert_eq!(
            classify(&MavMessage::STATUSTEXT(STATUSTEXT_DATA::default())),
            None
        );
    }

    #[test]
    fn frame_types_collapse_to_vehicle_classes() {
        assert_eq!(
            vehicle_class(MavType::MAV_TYPE_QUADROTOR),
            VehicleClass::Copter
        );
        assert_eq!(
            vehicle_class(MavType::MAV_TYPE_FIXED_WING),
            VehicleClass::Plane
        );
        assert_eq!(
            vehicle_class(MavType::MAV_TYPE_GROUND_ROVER),
            VehicleClass::Rover
        );
        assert_eq!(vehicle_class(MavType::MAV_TYPE_GCS), VehicleClass::Other);
    }
}
