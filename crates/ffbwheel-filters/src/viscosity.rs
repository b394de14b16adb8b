//! Cubic viscous damping.

use crate::ForceFrame;

/// Damping coefficient for [`viscosity_filter`].
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ViscosityState {
    /// Gain applied to the cubed velocity
    pub gain: i32,
}

impl ViscosityState {
    /// Create with the given gain.
    pub fn new(gain: i32) -> Self {
        Self { gain }
    }
}

/// `(v * v / 256) * v / 256`, sign preserving, saturated to `i32`.
///
/// ```
/// use ffbwheel_filters::cube;
///
/// assert_eq!(cube(256), 256);
/// assert_eq!(cube(-512), -2048);
/// assert_eq!(cube(10), 0);
/// ```
#[inline]
pub fn cube(v: i32) -> i32 {
    let v = i64::from(v);
    let cubed = (v * v / 256).saturating_mul(v) / 256;
    i32::try_from(cubed).unwrap_or(if cubed < 0 { i32::MIN } else { i32::MAX })
}

/// Adds `-gain * cube(velocity)`.
#[inline]
pub fn viscosity_filter(frame: &mut ForceFrame, state: &ViscosityState) {
    let damping = i64::from(state.gain).saturating_mul(i64::from(cube(frame.velocity)));
    frame.add(damping.saturating_neg());
}
