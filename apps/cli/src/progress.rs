//! Progress logging for the command line.

use std::sync::atomic::{AtomicU64, Ordering};

use chunkup_transfer::{ProgressGate, ProgressSnapshot, ThroughputMeter};
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Logs each checkpoint with throughput and stops once `cancel` fires.
pub struct ProgressReporter {
    cancel: CancellationToken,
    total_bytes: Option<u64>,
    meter: ThroughputMeter,
    last_offset: AtomicU64,
}

impl ProgressReporter {
    pub fn new(cancel: CancellationToken, total_bytes: Option<u64>) -> Self {
        Self {
            cancel,
            total_bytes,
            meter: ThroughputMeter::default(),
            last_offset: AtomicU64::new(0),
        }
    }
}

impl ProgressGate for ProgressReporter {
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> bool {
        let previous = self.last_offset.swap(snapshot.offset, Ordering::Relaxed);
        self.meter.record(snapshot.offset.saturating_sub(previous));

        let rate = self.meter.bytes_per_second();
        let eta = self
            .total_bytes
            .and_then(|total| self.meter.eta(total.saturating_sub(snapshot.offset)))
            .map(|d| d.as_secs());

        info!(
            phase = %snapshot.phase,
            block = snapshot.block_index,
            offset = snapshot.offset,
            total = ?self.total_bytes,
            bytes_per_sec = rate as u64,
            eta_secs = ?eta,
            "upload progress"
        );

        !self.cancel.is_cancelled()
    }
}
