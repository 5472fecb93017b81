// crates/gammastake-core/src/clock.rs
//
// Time source abstraction. Accrual math only ever sees timestamps, so the
// engine runs equally against wall-clock time or a simulated block clock.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;

use crate::types::Timestamp;

/// Monotonic source of block timestamps.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time in whole seconds.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        // pre-epoch wall time clamps to zero
        u64::try_from(Utc::now().timestamp()).unwrap_or_default()
    }
}

/// Manually advanced clock for simulations and tests.
///
/// Clones share the same underlying time, so a router holding one clone
/// observes every `advance` made through another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Arc<AtomicU64>,
}

impl ManualClock {
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(AtomicU64::new(start)),
        }
    }

    /// Move time forward by `seconds`.
    pub fn advance(&self, seconds: u64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }

    /// Jump to `timestamp`. Ignored if it would move time backwards.
    pub fn set(&self, timestamp: Timestamp) {
        self.now.fetch_max(timestamp, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        self.now.load(Ordering::SeqCst)
    }
}
