use std::cell::Cell;
use std::time::Instant;

use crate::traits::{Clock, Micros};

/// Wall-independent clock backed by [`Instant`].
///
/// Readings are truncated to 32 bits, so they wrap exactly like a
/// microcontroller `micros()` counter.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_micros(&self) -> Micros {
        self.origin.elapsed().as_micros() as Micros
    }
}

/// A clock that only moves when told to. Used for replays and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: Cell<Micros>,
}

impl ManualClock {
    pub fn new(start: Micros) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    /// Set the current reading.
    pub fn set(&self, now: Micros) {
        self.now.set(now);
    }

    /// Advance by `delta` microseconds, wrapping like a hardware counter.
    pub fn advance(&self, delta: Micros) -> Micros {
        let next = self.now.get().wrapping_add(delta);
        self.now.set(next);
        next
    }
}

impl Clock for ManualClock {
    fn now_micros(&self) -> Micros {
        self.now.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn manual_clock_advances_and_wraps() {
        let clock = ManualClock::new(u32::MAX - 1);
        assert_eq!(clock.now_micros(), u32::MAX - 1);
        assert_eq!(clock.advance(3), 1);
        assert_eq!(clock.now_micros(), 1);
        clock.set(500);
        assert_eq!(clock.now_micros(), 500);
    }

    #[test]
    fn monotonic_clock_does_not_go_backwards() {
        let clock = MonotonicClock::new();
        let a = clock.now_micros();
        let b = clock.now_micros();
        assert!(crate::elapsed(b, a) < 1_000_000);
    }

    #[test]
    fn clock_by_reference() {
        fn read(clock: impl Clock) -> Micros {
            clock.now_micros()
        }
        let clock = ManualClock::new(42);
        assert_eq!(read(&clock), 42);
    }
}
