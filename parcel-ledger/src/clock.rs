//! Time source for transaction timestamps

use std::sync::atomic::{AtomicI64, Ordering};

/// Clock provides the unix timestamp stamped on each transaction
///
/// Swappable so tests can pin time.
pub trait Clock: Send + Sync {
    /// Current unix timestamp in seconds
    fn unix_timestamp(&self) -> i64;
}

/// Wall clock (UTC)
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn unix_timestamp(&self) -> i64 {
        chrono::Utc::now().timestamp()
    }
}

/// Manually advanced clock for tests and replays
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicI64,
}

impl ManualClock {
    /// Start at `now`
    pub fn new(now: i64) -> Self {
        Self {
            now: AtomicI64::new(now),
        }
    }

    /// Jump to `now`
    pub fn set(&self, now: i64) {
        self.now.store(now, Ordering::SeqCst);
    }

    /// Move forward by `seconds`
    pub fn advance(&self, seconds: i64) {
        self.now.fetch_add(seconds, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn unix_timestamp(&self) -> i64 {
        self.now.load(Ordering::SeqCst)
    }
}
