//! Telemetry ingestion boundary.
//!
//! Wire decoding lives behind [`TelemetrySource`]; everything downstream of
//! this module works on the already-decoded [`TelemetryMessage`] set and has
//! zero protocol knowledge.

pub mod mavlink_udp;
pub mod message;
pub mod modes;
pub mod source;

pub use mavlink_udp::MavlinkUdpSource;
pub use message::TelemetryMessage;
pub use source::{FlightState, MessageEvent, ReceivedMessage, TelemetrySource, TransportError};
