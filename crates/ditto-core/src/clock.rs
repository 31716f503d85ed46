//! Monotonic millisecond timestamps for local mutations.

use std::sync::atomic::{AtomicI64, Ordering};

/// Hands out Unix-millisecond timestamps that never repeat and never go backwards.
///
/// Two mutations inside the same wall-clock millisecond, or a wall clock that
/// steps back, still produce strictly increasing values.
#[derive(Debug, Default)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    /// Create a clock that will never return a value at or below `floor`.
    pub const fn starting_after(floor: i64) -> Self {
        Self {
            last: AtomicI64::new(floor),
        }
    }

    /// Next timestamp based on the current wall clock.
    pub fn now(&self) -> i64 {
        self.next_after(chrono::Utc::now().timestamp_millis())
    }

    /// Next timestamp, strictly above `floor` as well as every earlier value.
    ///
    /// Other handles on the same database file advance the persisted maxima
    /// without touching this clock, so callers pass those maxima as `floor`.
    pub fn now_after(&self, floor: i64) -> i64 {
        self.last.fetch_max(floor, Ordering::SeqCst);
        self.now()
    }

    fn next_after(&self, wall: i64) -> i64 {
        let mut current = self.last.load(Ordering::SeqCst);
        loop {
            let candidate = wall.max(current.saturating_add(1));
            match self.last.compare_exchange_weak(
                current,
                candidate,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return candidate,
                Err(actual) => current = actual,
            }
        }
    }
}
