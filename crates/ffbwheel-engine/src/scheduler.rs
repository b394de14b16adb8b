//! Absolute-deadline tick scheduler for the torque thread.
//!
//! Deadlines are computed from the start instant, so sleep overshoot never
//! accumulates into drift. When the thread falls behind by one or more
//! whole periods those ticks are skipped and reported instead of being run
//! back to back.

use std::thread;
use std::time::{Duration, Instant};

/// Default torque loop period.
pub const DEFAULT_PERIOD: Duration = Duration::from_millis(1);

/// Result of waiting for one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tick {
    /// Ticks started so far, including this one
    pub index: u64,
    /// Whole periods skipped just before this tick
    pub missed: u64,
    /// The deadline this tick was scheduled for
    pub deadline: Instant,
}

/// Fixed-period scheduler.
///
/// # RT Safety
///
/// `wait_for_tick` is O(1) and allocation free.
#[derive(Debug)]
pub struct TickScheduler {
    period: Duration,
    next: Instant,
    index: u64,
    missed_total: u64,
}

impl TickScheduler {
    /// Scheduler whose first tick is due immediately.
    pub fn new(period: Duration) -> Self {
        Self::starting_at(period, Instant::now())
    }

    pub fn starting_at(period: Duration, start: Instant) -> Self {
        Self {
            period: period.max(Duration::from_micros(1)),
            next: start,
            index: 0,
            missed_total: 0,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    pub fn missed_total(&self) -> u64 {
        self.missed_total
    }

    /// Block until the next deadline.
    pub fn wait_for_tick(&mut self) -> Tick {
        let now = Instant::now();
        if now < self.next {
            thread::sleep(self.next - now);
        }
        self.advance(now)
    }

    /// Account for a tick observed at `now` without sleeping.
    pub fn advance(&mut self, now: Instant) -> Tick {
        let mut missed = 0u64;
        if let Some(late) = now.checked_duration_since(self.next) {
            let periods = late.as_nanos() / self.period.as_nanos().max(1);
            missed = u64::try_from(periods).unwrap_or(u64::MAX);
            if missed > 0 {
                self.next = self
                    .next
                    .checked_add(self.period.saturating_mul(u32::try_from(missed).unwrap_or(u32::MAX)))
                    .unwrap_or(now);
            }
        }
        let deadline = self.next;
        self.next = deadline.checked_add(self.period).unwrap_or(deadline);
        self.index = self.index.saturating_add(1);
        self.missed_total = self.missed_total.saturating_add(missed);
        Tick {
            index: self.index,
            missed,
            deadline,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_on_time_ticks() {
        let start = Instant::now();
        let period = Duration::from_millis(1);
        let mut scheduler = TickScheduler::starting_at(period, start);
        let first = scheduler.advance(start);
        assert_eq!(first.index, 1);
        assert_eq!(first.missed, 0);
        let second = scheduler.advance(start + Duration::from_micros(1500));
        assert_eq!(second.missed, 0);
        assert_eq!(second.deadline, start + period);
    }

    #[test]
    fn test_late_ticks_are_skipped() {
        let start = Instant::now();
        let period = Duration::from_millis(1);
        let mut scheduler = TickScheduler::starting_at(period, start);
        scheduler.advance(start);
        let late = scheduler.advance(start + Duration::from_micros(4200));
        assert_eq!(late.missed, 3);
        assert_eq!(late.deadline, start + Duration::from_millis(4));
        assert_eq!(scheduler.missed_total(), 3);
        let next = scheduler.advance(start + Duration::from_millis(5));
        assert_eq!(next.missed, 0);
    }

    #[test]
    fn test_wait_does_not_drift() {
        let period = Duration::from_millis(2);
        let start = Instant::now();
        let mut scheduler = TickScheduler::starting_at(period, start);
        let mut last = scheduler.wait_for_tick();
        for _ in 0..5 {
            last = scheduler.wait_for_tick();
        }
        let slots = u32::try_from(5 + scheduler.missed_total()).unwrap_or(u32::MAX);
        assert_eq!(last.index, 6);
        assert_eq!(last.deadline, start + period * slots);
    }
}
