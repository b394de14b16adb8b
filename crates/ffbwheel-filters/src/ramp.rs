//! Startup torque ramp.
//!
//! After the motor link is (re)configured the command ramps linearly from
//! zero to the full computed value over [`DEFAULT_RAMP_TICKS`] ticks.

/// Ticks over which torque ramps in after initialisation.
pub const DEFAULT_RAMP_TICKS: u64 = 300;

/// Ramp configuration.
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct RampState {
    /// Ramp length in ticks. Zero disables the ramp.
    pub ramp_ticks: u64,
}

impl RampState {
    /// Ramp over `ramp_ticks` ticks.
    pub fn new(ramp_ticks: u64) -> Self {
        Self { ramp_ticks }
    }

    /// Whether the ramp has finished at `tick_count`.
    pub fn is_complete(&self, tick_count: u64) -> bool {
        tick_count >= self.ramp_ticks
    }
}

impl Default for RampState {
    fn default() -> Self {
        Self::new(DEFAULT_RAMP_TICKS)
    }
}

/// Scale `output` by `tick_count / ramp_ticks` while the ramp is running.
///
/// `tick_count` is the 1-based count of the current tick, so the first tick
/// after initialisation passes 1. From `ramp_ticks` on the output is
/// returned unchanged.
///
/// ```
/// use ffbwheel_filters::{RampState, ramp_filter};
///
/// let ramp = RampState::default();
/// assert_eq!(ramp_filter(3000, 1, &ramp), 10);
/// assert_eq!(ramp_filter(3000, 150, &ramp), 1500);
/// assert_eq!(ramp_filter(3000, 300, &ramp), 3000);
/// ```
#[inline]
pub fn ramp_filter(output: i32, tick_count: u64, state: &RampState) -> i32 {
    if state.is_complete(tick_count) {
        return output;
    }
    // tick_count < ramp_ticks here, so the quotient stays within |output|.
    let scaled = i128::from(output) * i128::from(tick_count) / i128::from(state.ramp_ticks);
    i32::try_from(scaled).unwrap_or(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ramp_starts_near_zero() {
        let ramp = RampState::default();
        assert_eq!(ramp_filter(32767, 0, &ramp), 0);
        assert_eq!(ramp_filter(32767, 1, &ramp), 109);
    }

    #[test]
    fn test_ramp_negative_output() {
        let ramp = RampState::default();
        assert_eq!(ramp_filter(-3000, 100, &ramp), -1000);
    }

    #[test]
    fn test_zero_length_ramp_is_passthrough() {
        let ramp = RampState::new(0);
        assert_eq!(ramp_filter(-77, 0, &ramp), -77);
    }

    #[test]
    fn test_after_ramp_unchanged() {
        let ramp = RampState::default();
        assert_eq!(ramp_filter(i32::MIN, 10_000, &ramp), i32::MIN);
    }
}
