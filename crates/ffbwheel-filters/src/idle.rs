//! Idle/sleep hysteresis on the wheel angle.
//!
//! While the wheel is left untouched the torque loop stops driving the motor.
//! The monitor tracks the last angle at which the wheel was considered
//! active; a small deadband keeps encoder noise from holding it awake, and a
//! much larger deflection is required to wake it again.

use std::time::{Duration, Instant};

/// Thresholds for [`IdleMonitor`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct IdleConfig {
    /// Movement (exclusive) that counts as activity while awake
    pub active_threshold: i32,
    /// Movement (inclusive) that wakes the wheel from sleep
    pub wake_threshold: i32,
    /// Inactivity before the wheel goes to sleep
    pub timeout: Duration,
}

impl IdleConfig {
    /// Defaults: 40 counts activity, 800 counts wake, 10 s timeout.
    pub const fn standard() -> Self {
        Self {
            active_threshold: 40,
            wake_threshold: 800,
            timeout: Duration::from_secs(10),
        }
    }
}

impl Default for IdleConfig {
    fn default() -> Self {
        Self::standard()
    }
}

/// Sleep state change reported by [`IdleMonitor::update`].
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum IdleTransition {
    /// Active -> Sleeping
    EnteredSleep,
    /// Sleeping -> Active
    Woke,
}

/// Active/Sleeping state machine.
///
/// Time is passed in rather than read so the machine is deterministic.
#[derive(Copy, Clone, Debug)]
pub struct IdleMonitor {
    config: IdleConfig,
    last_active_angle: i32,
    last_active_time: Instant,
    sleeping: bool,
}

impl IdleMonitor {
    /// Start awake with `now` as the last active sample at angle zero.
    pub fn new(config: IdleConfig, now: Instant) -> Self {
        Self {
            config,
            last_active_angle: 0,
            last_active_time: now,
            sleeping: false,
        }
    }

    /// Whether torque output is currently suppressed.
    pub fn is_sleeping(&self) -> bool {
        self.sleeping
    }

    /// Angle of the last active sample.
    pub fn last_active_angle(&self) -> i32 {
        self.last_active_angle
    }

    /// Time of the last active sample.
    pub fn last_active_time(&self) -> Instant {
        self.last_active_time
    }

    /// Thresholds in use.
    pub fn config(&self) -> &IdleConfig {
        &self.config
    }

    /// Feed the current fitted angle.
    ///
    /// ```
    /// use std::time::{Duration, Instant};
    /// use ffbwheel_filters::{IdleConfig, IdleMonitor, IdleTransition};
    ///
    /// let start = Instant::now();
    /// let mut idle = IdleMonitor::new(IdleConfig::default(), start);
    /// assert_eq!(idle.update(0, start + Duration::from_secs(11)), Some(IdleTransition::EnteredSleep));
    /// assert_eq!(idle.update(799, start + Duration::from_secs(12)), None);
    /// assert_eq!(idle.update(800, start + Duration::from_secs(12)), Some(IdleTransition::Woke));
    /// ```
    pub fn update(&mut self, angle: i32, now: Instant) -> Option<IdleTransition> {
        let delta = (i64::from(angle) - i64::from(self.last_active_angle)).abs();

        if self.sleeping {
            if delta >= i64::from(self.config.wake_threshold) {
                self.sleeping = false;
                self.mark_active(angle, now);
                return Some(IdleTransition::Woke);
            }
            return None;
        }

        if delta > i64::from(self.config.active_threshold) {
            self.mark_active(angle, now);
            return None;
        }

        if now.saturating_duration_since(self.last_active_time) > self.config.timeout {
            self.sleeping = true;
            self.mark_active(angle, now);
            return Some(IdleTransition::EnteredSleep);
        }
        None
    }

    fn mark_active(&mut self, angle: i32, now: Instant) {
        self.last_active_angle = angle;
        self.last_active_time = now;
    }
}
