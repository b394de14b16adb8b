//! Lock-to-lock range selection from the panel switches.
//!
//! Switch 0 steps the range down the ladder, switch 1 steps it up. Switch 2
//! is wired but reserved. The three indicator outputs show the ladder index
//! plus one in binary.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{debug, info, warn};

use crate::{LockToLock, SettingsStore};

pub const SWITCH_DOWN: usize = 0;
pub const SWITCH_UP: usize = 1;
pub const SWITCH_RESERVED: usize = 2;

/// Selector polling period.
pub const SELECTOR_PERIOD: Duration = Duration::from_millis(20);

/// Debounced levels of the three panel switches, `true` = pressed.
pub trait SwitchBank: Send {
    fn levels(&mut self) -> [bool; 3];
}

/// Three indicator outputs.
pub trait Indicator: Send {
    fn show(&mut self, pattern: [bool; 3]);
}

/// Edge detector for the range switches.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LockRangeSelector {
    prev: [bool; 3],
}

impl LockRangeSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from `levels` so a switch already held at startup does not
    /// count as a press.
    pub fn with_levels(levels: [bool; 3]) -> Self {
        Self { prev: levels }
    }

    pub fn levels(&self) -> [bool; 3] {
        self.prev
    }

    /// Feed one sample. Returns the new range if a rising edge moves it.
    ///
    /// Edges on both switches in the same sample cancel out, as do presses
    /// at either end of the ladder.
    pub fn on_tick(&mut self, levels: [bool; 3], current: LockToLock) -> Option<LockToLock> {
        let [down, up, _reserved] = levels;
        let [was_down, was_up, _] = self.prev;
        self.prev = levels;

        match (down && !was_down, up && !was_up) {
            (false, true) => current.step_up(),
            (true, false) => current.step_down(),
            _ => None,
        }
    }
}

/// Switch levels settable from another thread or task.
#[derive(Debug, Clone, Default)]
pub struct SharedSwitches {
    levels: Arc<Mutex<[bool; 3]>>,
}

impl SharedSwitches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set one switch. Out of range indices are ignored.
    pub fn set(&self, index: usize, pressed: bool) {
        if let Some(level) = self.levels.lock().get_mut(index) {
            *level = pressed;
        }
    }
}

impl SwitchBank for SharedSwitches {
    fn levels(&mut self) -> [bool; 3] {
        *self.levels.lock()
    }
}

/// Indicator that logs pattern changes.
#[derive(Debug, Clone, Default)]
pub struct TracingIndicator {
    last: Arc<Mutex<Option<[bool; 3]>>>,
}

impl TracingIndicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pattern currently shown, `None` before the first refresh.
    pub fn last(&self) -> Option<[bool; 3]> {
        *self.last.lock()
    }
}

impl Indicator for TracingIndicator {
    fn show(&mut self, pattern: [bool; 3]) {
        let mut last = self.last.lock();
        if *last != Some(pattern) {
            debug!(?pattern, "Indicator changed");
            *last = Some(pattern);
        }
    }
}

/// Run the selector every `period` until `shutdown` fires or its sender is
/// dropped.
///
/// Each change is saved once through `store`; the store publishes it to the
/// torque loop. A failed save keeps the previous range and is logged.
pub async fn run_selector<S, I>(
    store: Arc<dyn SettingsStore>,
    mut switches: S,
    mut indicator: I,
    period: Duration,
    mut shutdown: broadcast::Receiver<()>,
) where
    S: SwitchBank,
    I: Indicator,
{
    let mut selector = LockRangeSelector::with_levels(switches.levels());
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    info!(?period, "Lock range selector started");

    loop {
        tokio::select! {
            _ = shutdown.recv() => break,
            _ = ticker.tick() => {}
        }

        let settings = store.current();
        let current = settings.lock_to_lock;
        if let Some(next) = selector.on_tick(switches.levels(), current) {
            match store.save(settings.with_lock(next)).await {
                Ok(()) => info!(from = %current, to = %next, "Lock-to-lock changed"),
                Err(e) => warn!(error = %e, "Failed to persist lock-to-lock change"),
            }
        }
        indicator.show(store.current().lock_to_lock.indicator_pattern());
    }

    info!("Lock range selector stopped");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rising_edges_walk_the_ladder() {
        let mut selector = LockRangeSelector::new();
        let up = [false, true, false];
        let idle = [false; 3];

        let mut lock = LockToLock::D180;
        let mut seen = vec![lock];
        for _ in 0..6 {
            if let Some(next) = selector.on_tick(up, lock) {
                lock = next;
                seen.push(lock);
            }
            assert_eq!(selector.on_tick(idle, lock), None);
        }
        assert_eq!(seen, LockToLock::LADDER.to_vec());
    }

    #[test]
    fn test_held_switch_steps_once() {
        let mut selector = LockRangeSelector::new();
        let down = [true, false, false];
        assert_eq!(selector.on_tick(down, LockToLock::D720), Some(LockToLock::D540));
        for _ in 0..10 {
            assert_eq!(selector.on_tick(down, LockToLock::D540), None);
        }
    }

    #[test]
    fn test_ends_of_ladder_are_noops() {
        let mut selector = LockRangeSelector::new();
        assert_eq!(selector.on_tick([true, false, false], LockToLock::D180), None);
        let mut selector = LockRangeSelector::new();
        assert_eq!(selector.on_tick([false, true, false], LockToLock::D1080), None);
    }

    #[test]
    fn test_reserved_switch_and_simultaneous_edges_do_nothing() {
        let mut selector = LockRangeSelector::new();
        assert_eq!(selector.on_tick([false, false, true], LockToLock::D540), None);
        assert_eq!(selector.on_tick([true, true, true], LockToLock::D540), None);
    }

    #[test]
    fn test_switch_held_at_startup_is_not_a_press() {
        let mut selector = LockRangeSelector::with_levels([false, true, false]);
        assert_eq!(selector.on_tick([false, true, false], LockToLock::D540), None);
    }

    #[test]
    fn test_tracing_indicator_records_last_pattern() {
        let mut indicator = TracingIndicator::new();
        assert_eq!(indicator.last(), None);
        indicator.show(LockToLock::D720.indicator_pattern());
        assert_eq!(indicator.last(), Some([false, false, true]));
    }
}
