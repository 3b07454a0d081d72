//! Flush policy: decides when accumulated dirty state goes to the API.
//!
//! Two triggers: the polling cycle has elapsed since the last confirmed
//! flush, or a priority field (armed, flight mode) is dirty; safety and
//! operations state must not wait out the polling window.
//!
//! Delivery is at-least-once: a failed flush leaves every dirty flag and
//! the flush clock untouched, so the next trigger retries the accumulated
//! (possibly larger) set. Intermediate values overwritten between flushes
//! are lost; the API only ever sees the latest value at flush time.

use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::api::{FenceReport, FieldReport, VehicleApi};
use crate::model::{Device, FieldKey};

/// Default maximum age of unreported dirty state.
pub const DEFAULT_POLLING_CYCLE: Duration = Duration::from_secs(10);

/// Fields whose dirtiness forces an out-of-cycle flush.
pub const PRIORITY_FIELDS: [FieldKey; 2] = [FieldKey::Armed, FieldKey::FlightMode];

/// Why a flush attempt was triggered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// `elapsed > polling_cycle` since the last confirmed flush.
    PollingCycle,
    /// A priority field is dirty.
    PriorityField(FieldKey),
}

/// Outcome of one flush attempt, for stats and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub trigger: FlushTrigger,
    /// Scalar fields included in the batch.
    pub fields_sent: usize,
    /// Batch accepted (or trivially empty); `last_flush_time` advanced.
    pub fields_confirmed: bool,
    /// The fence record was dirty and a fence post was attempted.
    pub fence_sent: bool,
    pub fence_confirmed: bool,
}

/// The sync policy for one bridge process. Stateless across devices; all
/// per-vehicle state lives on the [`Device`].
#[derive(Debug, Clone)]
pub struct SyncPolicy {
    polling_cycle: Duration,
    actor_id: u32,
}

impl SyncPolicy {
    pub fn new(polling_cycle: Duration, actor_id: u32) -> Self {
        Self {
            polling_cycle,
            actor_id,
        }
    }

    /// Evaluate whether a flush attempt is due for `device` at `now`.
    pub fn evaluate(&self, device: &Device, now: Instant) -> Option<FlushTrigger> {
        let elapsed = now.duration_since(device.last_flush_time);
        if elapsed > self.polling_cycle {
            return Some(FlushTrigger::PollingCycle);
        }
        PRIORITY_FIELDS
            .iter()
            .find(|key| device.fields.is_dirty(**key))
            .map(|key| FlushTrigger::PriorityField(*key))
    }

    /// Perform one flush attempt.
    ///
    /// On a confirmed scalar batch, exactly the batched fields are cleared
    /// and `last_flush_time` advances to `now`. On failure nothing changes.
    /// An empty dirty set advances the clock without a network call. The
    /// fence record is reported independently on its own route and clears
    /// only its own flag.
    pub async fn flush<A: VehicleApi + ?Sized>(
        &self,
        device: &mut Device,
        api: &A,
        now: Instant,
        trigger: FlushTrigger,
    ) -> FlushReport {
        let snapshot = device.fields.snapshot_dirty();
        let mut report = FlushReport {
            trigger,
            fields_sent: snapshot.len(),
            fields_confirmed: false,
            fence_sent: device.fence.dirty,
            fence_confirmed: false,
        };

        if snapshot.is_empty() {
            device.last_flush_time = now;
            report.fields_confirmed = true;
        } else {
            let batch: Vec<FieldReport> = snapshot
                .iter()
                .map(|(key, value)| FieldReport::new(*key, value, self.actor_id))
                .collect();

            match api.post_field_batch(device.uuid(), &batch).await {
                Ok(()) => {
                    let keys: Vec<FieldKey> = snapshot.iter().map(|(key, _)| *key).collect();
                    device.fields.clear_dirty(&keys);
                    device.last_flush_time = now;
                    report.fields_confirmed = true;
                    debug!(
                        uuid = %device.uuid(),
                        fields = keys.len(),
                        trigger = ?trigger,
                        "Field batch confirmed"
                    );
                }
                Err(e) => {
                    warn!(
                        uuid = %device.uuid(),
                        error = %e,
                        "Field batch failed, keeping dirty set for retry"
                    );
                }
            }
        }

        if device.fence.dirty {
            let fence = FenceReport::from_state(&device.fence);
            match api.post_fence_status(device.uuid(), &fence).await {
                Ok(()) => {
                    device.fence.dirty = false;
                    report.fence_confirmed = true;
                }
                Err(e) => {
                    warn!(
                        uuid = %device.uuid(),
                        error = %e,
                        "Fence status post failed, keeping record dirty for retry"
                    );
                }
            }
        }

        report
    }
}
