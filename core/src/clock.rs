// Copyright (c) 2022-2023 The MobileCoin Foundation

use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Monotonic time source, allowing expiry logic to be driven in tests
pub trait Clock {
    /// Fetch the current instant
    fn now(&self) -> Instant;
}

/// [Clock] backed by [Instant::now]
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Manually advanced [Clock].
///
/// Clones share the same offset, so a handle kept by a test can advance
/// time for a clock moved into a [PinCache][crate::PinCache].
#[derive(Clone, Debug)]
pub struct ManualClock {
    base: Instant,
    offset_ns: Arc<AtomicU64>,
}

impl ManualClock {
    /// Create a new clock starting at the current instant
    pub fn new() -> Self {
        Self {
            base: Instant::now(),
            offset_ns: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, d: Duration) {
        let ns = u64::try_from(d.as_nanos()).unwrap_or(u64::MAX);
        self.offset_ns.fetch_add(ns, Ordering::SeqCst);
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.base + Duration::from_nanos(self.offset_ns.load(Ordering::SeqCst))
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn manual_clock_shared() {
        let c = ManualClock::new();
        let h = c.clone();

        let t0 = c.now();
        h.advance(Duration::from_secs(5));

        assert_eq!(c.now() - t0, Duration::from_secs(5));
    }
}
