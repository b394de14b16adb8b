//! Cogging torque cancellation.

use crate::ForceFrame;

/// Velocity-proportional assist.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct CoggingState {
    /// Gain applied to the normalised velocity
    pub gain: i32,
}

impl CoggingState {
    /// Create with the given gain.
    pub fn new(gain: i32) -> Self {
        Self { gain }
    }
}

/// Adds `gain * velocity`.
#[inline]
pub fn cogging_filter(frame: &mut ForceFrame, state: &CoggingState) {
    frame.add(i64::from(state.gain) * i64::from(frame.velocity));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cogging_follows_velocity() {
        let state = CoggingState::new(3);
        let mut frame = ForceFrame::new(0, -40);
        cogging_filter(&mut frame, &state);
        assert_eq!(frame.torque, -120);
    }

    #[test]
    fn test_zero_gain() {
        let mut frame = ForceFrame::new(0, 9999);
        cogging_filter(&mut frame, &CoggingState::default());
        assert_eq!(frame.torque, 0);
    }
}
