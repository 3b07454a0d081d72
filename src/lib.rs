//! fleetlink: MAVLink-to-fleet-API telemetry bridge
//!
//! Ingests a live telemetry stream from a vehicle over UDP, maintains a
//! canonical in-memory model of the vehicle's state, and forwards state
//! changes and discrete events to a remote fleet-management HTTP API on a
//! throttled schedule.
//!
//! ## Architecture
//!
//! - **Field Model** (`model`): typed vehicle state with per-field dirty
//!   tracking; scalar fields and the fence record are separate units
//! - **Translator** (`translate`): pure mapping from decoded messages to
//!   field updates, with the changed-value check for scalars
//! - **Fleet** (`fleet`): registry of tracked vehicles, created lazily
//! - **Sync Policy** (`sync`): polling cycle + priority fields decide when
//!   the accumulated dirty set is flushed; at-least-once delivery
//! - **API Gateway** (`api`): the three fleet API routes behind a seam
//!   trait, success == HTTP 200
//! - **Ingestion Loop** (`ingest`): one task driving
//!   source → translator → model → policy until the stream ends

pub mod api;
pub mod config;
pub mod fleet;
pub mod ingest;
pub mod model;
pub mod sync;
pub mod telemetry;
pub mod translate;

pub use api::{ApiClient, ApiError, EventReport, FenceReport, FieldReport, VehicleApi};
pub use config::BridgeConfig;
pub use fleet::Fleet;
pub use ingest::{
    FixedIdentity, IdentityResolver, IngestLoop, IngestStats, FENCE_BREACH_EVENT_TYPE,
};
pub use model::{
    BreachEvent, Device, FenceState, FenceUpdate, Field, FieldKey, FieldUpdate, FieldValue,
    VehicleFields,
};
pub use sync::{FlushReport, FlushTrigger, SyncPolicy, DEFAULT_POLLING_CYCLE, PRIORITY_FIELDS};
pub use telemetry::{
    FlightState, MavlinkUdpSource, MessageEvent, ReceivedMessage, TelemetryMessage,
    TelemetrySource, TransportError,
};
pub use translate::{translate, HeartbeatContext};
