//! Source abstraction for decoded telemetry.
//!
//! The ingestion loop drives a [`TelemetrySource`] and never touches the
//! wire protocol. The production implementation is
//! [`MavlinkUdpSource`](crate::telemetry::MavlinkUdpSource); tests script
//! their own.

use async_trait::async_trait;
use thiserror::Error;

use super::message::TelemetryMessage;

/// Transport-level errors. None of these are fatal to the process; the
/// ingestion loop treats them as the end of the stream.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Events produced by a telemetry source.
pub enum MessageEvent {
    /// A decoded, tracked message was received.
    Message(ReceivedMessage),
    /// The stream yielded no further message. Clean termination, not an
    /// error.
    Eof,
}

/// A decoded message together with the wire identity it arrived under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedMessage {
    /// Protocol-level system id of the sender; identity resolution maps
    /// this onto a vehicle uuid.
    pub system_id: u8,
    pub message: TelemetryMessage,
}

/// Link-derived flight state, maintained by the source from the heartbeat
/// stream. The heartbeat body does not carry these verbatim; the armed bit
/// and mode label are decoded from base/custom mode by the transport.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlightState {
    pub armed: bool,
    pub mode: String,
}

/// Trait abstracting where decoded telemetry comes from.
#[async_trait]
pub trait TelemetrySource: Send {
    /// Block until the transport confirms a live peer (first heartbeat).
    async fn wait_online(&mut self) -> Result<(), TransportError>;

    /// Read the next tracked message. Untracked types and undecodable
    /// frames are skipped internally and never surface here.
    async fn next_message(&mut self) -> Result<MessageEvent, TransportError>;

    /// Current link-derived armed/mode state, updated on every heartbeat.
    fn flight_state(&self) -> FlightState;

    /// Human-readable name for logging (e.g. "mavlink-udp:0.0.0.0:14550").
    fn source_name(&self) -> &str;
}
