use std::time::{Duration, Instant};

/// Fixed-rate flush schedule.
///
/// Ticks are anchored to the start time, so command processing does not
/// drift the schedule. Ticks missed while the worker was busy are skipped.
/// An interval too large to represent as an `Instant` never ticks.
pub(crate) struct FlushTimer {
    interval: Duration,
    next: Option<Instant>,
}

impl FlushTimer {
    pub(crate) fn new(interval: Duration, start: Instant) -> Self {
        Self {
            interval,
            next: start.checked_add(interval),
        }
    }

    /// Time left until the next tick, zero if one is already due.
    pub(crate) fn remaining(&self, now: Instant) -> Duration {
        match self.next {
            Some(next) => next.saturating_duration_since(now),
            None => Duration::MAX,
        }
    }

    /// Consume a due tick. Returns `false` if no tick is due yet.
    pub(crate) fn fire(&mut self, now: Instant) -> bool {
        let Some(mut next) = self.next else {
            return false;
        };
        if now < next {
            return false;
        }
        while next <= now {
            match next.checked_add(self.interval) {
                Some(later) => next = later,
                None => {
                    self.next = None;
                    return true;
                }
            }
        }
        self.next = Some(next);
        true
    }
}
