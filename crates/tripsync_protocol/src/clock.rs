//! Per-writer monotonic clock.

use crate::envelope::Timestamp;
use std::sync::atomic::{AtomicI64, Ordering};

/// Issues strictly increasing timestamps for one writer.
///
/// Each tick returns `max(wall_clock, last + 1ms)`, so the clock never goes
/// backwards even if the wall clock does. [`MonotonicClock::observe`] lets a
/// writer catch up with timestamps it has seen from other devices, so that a
/// local edit made after applying a newer remote record wins over it.
#[derive(Debug)]
pub struct MonotonicClock {
    last: AtomicI64,
}

impl MonotonicClock {
    /// Creates a clock that has issued nothing yet.
    pub fn new() -> Self {
        Self {
            last: AtomicI64::new(i64::MIN),
        }
    }

    /// Creates a clock resuming after a previously issued timestamp.
    pub fn resume_after(last: Timestamp) -> Self {
        Self {
            last: AtomicI64::new(last.as_millis()),
        }
    }

    /// Returns the next timestamp.
    pub fn tick(&self) -> Timestamp {
        self.tick_at(Timestamp::now())
    }

    /// Returns the next timestamp given a wall-clock reading.
    pub fn tick_at(&self, wall: Timestamp) -> Timestamp {
        let mut current = self.last.load(Ordering::Acquire);
        loop {
            let next = wall.as_millis().max(current.saturating_add(1));
            match self
                .last
                .compare_exchange_weak(current, next, Ordering::AcqRel, Ordering::Acquire)
            {
                Ok(_) => return Timestamp::from_millis(next),
                Err(actual) => current = actual,
            }
        }
    }

    /// Advances the clock so later ticks are after `seen`.
    pub fn observe(&self, seen: Timestamp) {
        self.last.fetch_max(seen.as_millis(), Ordering::AcqRel);
    }

    /// Returns the last issued or observed timestamp, if any.
    pub fn last(&self) -> Option<Timestamp> {
        match self.last.load(Ordering::Acquire) {
            i64::MIN => None,
            millis => Some(Timestamp::from_millis(millis)),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ticks_are_strictly_increasing() {
        let clock = MonotonicClock::new();
        let wall = Timestamp::from_millis(1_000);

        let a = clock.tick_at(wall);
        let b = clock.tick_at(wall);
        let c = clock.tick_at(Timestamp::from_millis(500));

        assert_eq!(a, Timestamp::from_millis(1_000));
        assert_eq!(b, Timestamp::from_millis(1_001));
        assert_eq!(c, Timestamp::from_millis(1_002));
    }

    #[test]
    fn observe_moves_clock_forward() {
        let clock = MonotonicClock::new();
        clock.tick_at(Timestamp::from_millis(10));
        clock.observe(Timestamp::from_millis(90));

        assert_eq!(
            clock.tick_at(Timestamp::from_millis(20)),
            Timestamp::from_millis(91)
        );

        // Observing the past is a no-op.
        clock.observe(Timestamp::from_millis(5));
        assert_eq!(clock.last(), Some(Timestamp::from_millis(91)));
    }

    #[test]
    fn resume_after_persisted_value() {
        let clock = MonotonicClock::resume_after(Timestamp::from_millis(300));
        assert_eq!(
            clock.tick_at(Timestamp::from_millis(100)),
            Timestamp::from_millis(301)
        );
    }

    #[test]
    fn fresh_clock_has_no_last() {
        assert_eq!(MonotonicClock::new().last(), None);
    }
}
