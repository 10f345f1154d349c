use std::time::{Duration, Instant};

use log::warn;

/// Shortest pause between two cycles, even when running late.
pub const MIN_DELAY: Duration = Duration::from_millis(100);

/// Keeps cycles on a fixed grid of `interval` regardless of how long each
/// cycle takes.
#[derive(Debug)]
pub struct Scheduler {
    interval: Duration,
    min_delay: Duration,
    next_tick: Instant,
}

impl Scheduler {
    /// `start` is the time of the first tick.
    pub fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            min_delay: MIN_DELAY,
            next_tick: start,
        }
    }

    pub fn with_min_delay(mut self, min_delay: Duration) -> Self {
        self.min_delay = min_delay;
        self
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn next_tick(&self) -> Instant {
        self.next_tick
    }

    /// Advances to the next tick and returns how long to sleep until it, given
    /// that the current cycle finished at `now`.
    ///
    /// A cycle that overran the interval moves the grid: the next tick is
    /// `now + min_delay` and later ticks follow from there. An interval too
    /// large for the clock keeps the tick where it is and waits one full
    /// interval.
    pub fn delay_after(&mut self, now: Instant) -> Duration {
        let Some(next_tick) = self.next_tick.checked_add(self.interval) else {
            warn!(
                "Poll interval of {:?} is out of range, not advancing the schedule",
                self.interval
            );
            return self.interval;
        };
        self.next_tick = next_tick;
        let earliest = now + self.min_delay;
        if self.next_tick < earliest {
            if self.next_tick < now {
                warn!(
                    "Cycle overran the poll interval of {:?} by {:?}",
                    self.interval,
                    now - self.next_tick
                );
            }
            self.next_tick = earliest;
        }
        self.next_tick - now
    }
}
