use std::sync::Mutex;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::types::ProgressSnapshot;

/// Capability consulted by the upload controller at every phase checkpoint
/// (starting, continue, finishing).
///
/// Receives a read-only snapshot and returns `true` to continue or `false`
/// to cancel. It is never called mid-read or mid-request.
pub trait ProgressGate: Send + Sync {
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> bool;
}

/// Gate that never cancels.
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysContinue;

impl ProgressGate for AlwaysContinue {
    fn on_progress(&self, _snapshot: &ProgressSnapshot) -> bool {
        true
    }
}

impl<F> ProgressGate for F
where
    F: Fn(&ProgressSnapshot) -> bool + Send + Sync,
{
    fn on_progress(&self, snapshot: &ProgressSnapshot) -> bool {
        self(snapshot)
    }
}

/// Continues until the token is cancelled.
impl ProgressGate for CancellationToken {
    fn on_progress(&self, _snapshot: &ProgressSnapshot) -> bool {
        !self.is_cancelled()
    }
}

// ---------------------------------------------------------------------------
// ThroughputMeter
// ---------------------------------------------------------------------------

/// Default sliding window for throughput samples.
const DEFAULT_WINDOW: Duration = Duration::from_secs(5);

/// Maximum samples retained regardless of the window.
const MAX_SAMPLES: usize = 100;

/// Measures transfer throughput over a sliding time window.
pub struct ThroughputMeter {
    inner: Mutex<MeterInner>,
}

struct MeterInner {
    samples: Vec<(Instant, u64)>,
    window: Duration,
}

impl Default for ThroughputMeter {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW)
    }
}

impl ThroughputMeter {
    pub fn new(window: Duration) -> Self {
        Self {
            inner: Mutex::new(MeterInner {
                samples: Vec::new(),
                window,
            }),
        }
    }

    /// Records `bytes` transferred now.
    pub fn record(&self, bytes: u64) {
        self.record_at(Instant::now(), bytes);
    }

    fn record_at(&self, at: Instant, bytes: u64) {
        let Ok(mut m) = self.inner.lock() else {
            return;
        };
        m.samples.push((at, bytes));

        if let Some(cutoff) = at.checked_sub(m.window) {
            m.samples.retain(|(t, _)| *t >= cutoff);
        }
        if m.samples.len() > MAX_SAMPLES {
            let excess = m.samples.len() - MAX_SAMPLES;
            m.samples.drain(..excess);
        }
    }

    /// Average bytes per second across the window; 0.0 with fewer than two samples.
    pub fn bytes_per_second(&self) -> f64 {
        let Ok(m) = self.inner.lock() else {
            return 0.0;
        };
        let (Some(first), Some(last)) = (m.samples.first(), m.samples.last()) else {
            return 0.0;
        };
        let elapsed = last.0.duration_since(first.0);
        if m.samples.len() < 2 || elapsed.is_zero() {
            return 0.0;
        }
        // The first sample marks the window start; its bytes predate it.
        let bytes: u64 = m.samples.iter().skip(1).map(|(_, b)| b).sum();
        bytes as f64 / elapsed.as_secs_f64()
    }

    /// Estimated time to move `remaining` bytes, `None` while speed is unknown.
    pub fn eta(&self, remaining: u64) -> Option<Duration> {
        let speed = self.bytes_per_second();
        if speed <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f64(remaining as f64 / speed))
    }

    pub fn reset(&self) {
        if let Ok(mut m) = self.inner.lock() {
            m.samples.clear();
        }
    }
}
