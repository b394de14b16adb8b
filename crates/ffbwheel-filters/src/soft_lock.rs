//! Soft lock spring past the end of the lock range.

use crate::{FULL_SCALE, ForceFrame};

/// Stiffness of the virtual end stop.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct SoftLockState {
    /// Gain applied to the penetration past full scale
    pub gain: i32,
}

impl SoftLockState {
    /// Create with the given gain.
    pub fn new(gain: i32) -> Self {
        Self { gain }
    }
}

/// Subtracts `gain * (angle - FULL_SCALE)` above full scale and
/// `gain * (angle + FULL_SCALE)` below it. No contribution inside the range.
///
/// ```
/// use ffbwheel_filters::prelude::*;
///
/// let mut frame = ForceFrame::new(32767 + 100, 0);
/// soft_lock_filter(&mut frame, &SoftLockState::new(4));
/// assert_eq!(frame.torque, -400);
/// ```
#[inline]
pub fn soft_lock_filter(frame: &mut ForceFrame, state: &SoftLockState) {
    let angle = i64::from(frame.angle);
    let full = i64::from(FULL_SCALE);
    let penetration = if angle > full {
        angle - full
    } else if angle < -full {
        angle + full
    } else {
        return;
    };
    frame.add(
        i64::from(state.gain)
            .saturating_mul(penetration)
            .saturating_neg(),
    );
}
