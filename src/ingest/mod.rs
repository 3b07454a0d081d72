//! The ingestion loop: the single task that drives the bridge.
//!
//! `AwaitHeartbeat → Streaming → Terminated`: block until the transport
//! confirms a live peer, then process one message at a time (resolve the
//! vehicle identity, translate, mutate the field model, report breach
//! occurrences, evaluate the sync policy) until the stream ends or the
//! process is cancelled. Stream end is a normal termination of the loop,
//! not of the process, and nothing inside the loop is fatal: bad messages
//! are skipped and failed flushes are retried by accumulation.

use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::api::VehicleApi;
use crate::fleet::Fleet;
use crate::sync::{FlushTrigger, SyncPolicy};
use crate::telemetry::{MessageEvent, TelemetryMessage, TelemetrySource};
use crate::translate::{translate, HeartbeatContext};

/// Event type id for fence breach occurrences, agreed with the remote API.
pub const FENCE_BREACH_EVENT_TYPE: u16 = 8;

/// Loop lifecycle, for logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    AwaitHeartbeat,
    Streaming,
    Terminated,
}

/// Maps a wire-level system id onto a vehicle uuid. Returning `None`
/// filters the message out entirely.
pub trait IdentityResolver: Send + Sync {
    fn resolve(&self, system_id: u8) -> Option<&str>;
}

/// The default resolver: one configured vehicle, one target system. Every
/// other system id on the link is ignored.
#[derive(Debug, Clone)]
pub struct FixedIdentity {
    target_system: u8,
    uuid: String,
}

impl FixedIdentity {
    pub fn new(target_system: u8, uuid: impl Into<String>) -> Self {
        Self {
            target_system,
            uuid: uuid.into(),
        }
    }
}

impl IdentityResolver for FixedIdentity {
    fn resolve(&self, system_id: u8) -> Option<&str> {
        (system_id == self.target_system).then_some(self.uuid.as_str())
    }
}

/// Counters reported when the loop exits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestStats {
    pub messages: u64,
    pub flushes: u64,
    pub flush_failures: u64,
    pub events_posted: u64,
    pub devices_pruned: u64,
}

/// Owns everything the loop needs besides the source, gateway, and fleet.
pub struct IngestLoop<R: IdentityResolver> {
    policy: SyncPolicy,
    resolver: R,
    idle_eviction: Option<Duration>,
    cancel: CancellationToken,
}

impl<R: IdentityResolver> IngestLoop<R> {
    pub fn new(policy: SyncPolicy, resolver: R, cancel: CancellationToken) -> Self {
        Self {
            policy,
            resolver,
            idle_eviction: None,
            cancel,
        }
    }

    /// Enable the idle-eviction sweep with the given window.
    pub fn with_idle_eviction(mut self, max_idle: Duration) -> Self {
        self.idle_eviction = Some(max_idle);
        self
    }

    /// Run until the stream ends or cancellation. Returns final counters.
    pub async fn run<S, A>(self, source: &mut S, api: &A, fleet: &mut Fleet) -> IngestStats
    where
        S: TelemetrySource,
        A: VehicleApi + ?Sized,
    {
        let mut stats = IngestStats::default();
        let mut state = LoopState::AwaitHeartbeat;
        info!(source = source.source_name(), state = ?state, "Waiting for first heartbeat");

        tokio::select! {
            _ = self.cancel.cancelled() => {
                info!("Shutdown before link came up");
                return stats;
            }
            result = source.wait_online() => {
                if let Err(e) = result {
                    warn!(error = %e, "Transport failed before first heartbeat");
                    return stats;
                }
            }
        }

        state = LoopState::Streaming;
        info!(state = ?state, "Streaming telemetry");

        loop {
            let event = tokio::select! {
                _ = self.cancel.cancelled() => {
                    info!("Shutdown signal received");
                    break;
                }
                result = source.next_message() => match result {
                    Ok(event) => event,
                    Err(e) => {
                        warn!(error = %e, "Transport error, ending stream");
                        break;
                    }
                }
            };

            let received = match event {
                MessageEvent::Message(m) => m,
                MessageEvent::Eof => {
                    info!(messages = stats.messages, "Telemetry stream ended");
                    break;
                }
            };

            stats.messages += 1;
            let now = Instant::now();

            let Some(uuid) = self.resolver.resolve(received.system_id) else {
                continue;
            };
            let uuid = uuid.to_string();

            // Heartbeats alone need enrichment: armed state and mode label
            // live on the link, not in the message body.
            let heartbeat_ctx = matches!(received.message, TelemetryMessage::Heartbeat)
                .then(|| {
                    let flight = source.flight_state();
                    HeartbeatContext {
                        armed: flight.armed,
                        flight_mode: flight.mode,
                    }
                });

            let device = fleet.device_mut(&uuid, now);
            device.last_seen = now;

            let updates = translate(&received.message, heartbeat_ctx.as_ref(), &device.fields);
            let mut breaches = Vec::new();
            for update in updates {
                if let Some(breach) = device.apply_update(update) {
                    breaches.push(breach);
                }
            }

            for breach in breaches {
                let description = format!(
                    "Fence breach #{} (type {})",
                    breach.breach_count, breach.breach_type
                );
                match api
                    .post_event(&uuid, FENCE_BREACH_EVENT_TYPE, &description)
                    .await
                {
                    Ok(()) => {
                        stats.events_posted += 1;
                        info!(uuid = %uuid, description = %description, "Reported fence breach");
                    }
                    Err(e) => {
                        warn!(uuid = %uuid, error = %e, "Breach event post failed, dropping occurrence");
                    }
                }
            }

            if let Some(trigger) = self.policy.evaluate(device, now) {
                let report = self.policy.flush(device, api, now, trigger).await;
                stats.flushes += 1;
                if !report.fields_confirmed || (report.fence_sent && !report.fence_confirmed) {
                    stats.flush_failures += 1;
                }
                if let FlushTrigger::PriorityField(key) = trigger {
                    tracing::debug!(uuid = %uuid, field = key.name(), "Priority flush");
                }
            }

            if let Some(max_idle) = self.idle_eviction {
                stats.devices_pruned += fleet.prune_idle(max_idle, now) as u64;
            }
        }

        state = LoopState::Terminated;
        info!(
            state = ?state,
            messages = stats.messages,
            flushes = stats.flushes,
            flush_failures = stats.flush_failures,
            events = stats.events_posted,
            pruned = stats.devices_pruned,
            fleet_size = fleet.len(),
            "Ingestion loop finished"
        );

        stats
    }
}
