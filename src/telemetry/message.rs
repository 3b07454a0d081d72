//! The decoded telemetry message set.
//!
//! A closed enum: exactly the message types the field model tracks. Anything
//! else on the wire is dropped at the transport adapter and never reaches
//! the translator. Payload fields keep their wire-level integer types; unit
//! conversion is not this system's concern; the remote API receives raw
//! protocol values, string-encoded.

/// One decoded telemetry message relevant to the field model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TelemetryMessage {
    EkfStatusReport(EkfStatusReport),
    FenceStatus(FenceStatus),
    GlobalPositionInt(GlobalPositionInt),
    GpsRawInt(GpsRawInt),
    /// Armed state and flight mode are link-derived, not message-body
    /// fields, so the decoded heartbeat carries no payload here.
    Heartbeat,
    SysStatus(SysStatus),
}

impl TelemetryMessage {
    /// Wire-level message-type name, for logging.
    pub fn name(&self) -> &'static str {
        match self {
            TelemetryMessage::EkfStatusReport(_) => "EKF_STATUS_REPORT",
            TelemetryMessage::FenceStatus(_) => "FENCE_STATUS",
            TelemetryMessage::GlobalPositionInt(_) => "GLOBAL_POSITION_INT",
            TelemetryMessage::GpsRawInt(_) => "GPS_RAW_INT",
            TelemetryMessage::Heartbeat => "HEARTBEAT",
            TelemetryMessage::SysStatus(_) => "SYS_STATUS",
        }
    }
}

/// EKF health flags bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EkfStatusReport {
    pub flags: u16,
}

/// Geofence status snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FenceStatus {
    pub breach_time: u32,
    pub breach_count: u16,
    pub breach_status: u8,
    pub breach_type: u8,
}

/// Fused position estimate. Degrees ×1e7 for lat/lon, millimeters for
/// relative altitude, centidegrees for heading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalPositionInt {
    pub lat: i32,
    pub lon: i32,
    pub relative_alt: i32,
    pub hdg: u16,
}

/// Raw GPS fix. Ground speed in cm/s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GpsRawInt {
    pub vel: u16,
}

/// System status. Battery voltage in millivolts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SysStatus {
    pub voltage_battery: u16,
}
