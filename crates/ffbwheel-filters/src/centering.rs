//! Centering spring.

use crate::ForceFrame;

/// State for the centering spring.
///
/// # RT Safety
///
/// - `#[repr(C)]` for stable ABI
/// - No heap allocations
#[repr(C)]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct CenteringState {
    /// Largest magnitude the spring may contribute. Zero disables it.
    pub max_force: i32,
}

impl CenteringState {
    /// Create a centering spring bounded by `max_force`.
    pub fn new(max_force: i32) -> Self {
        Self {
            max_force: max_force.max(0),
        }
    }

    /// A spring that contributes nothing.
    pub fn disabled() -> Self {
        Self { max_force: 0 }
    }
}

impl Default for CenteringState {
    fn default() -> Self {
        Self::disabled()
    }
}

/// Adds `clamp(-angle, -max_force, max_force)`.
///
/// ```
/// use ffbwheel_filters::prelude::*;
///
/// let state = CenteringState::new(500);
/// let mut frame = ForceFrame::new(2000, 0);
/// centering_filter(&mut frame, &state);
/// assert_eq!(frame.torque, -500);
/// ```
#[inline]
pub fn centering_filter(frame: &mut ForceFrame, state: &CenteringState) {
    let limit = i64::from(state.max_force);
    let spring = (-i64::from(frame.angle)).clamp(-limit, limit);
    frame.add(spring);
}
