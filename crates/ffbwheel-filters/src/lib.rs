//! RT-safe integer force model for the ffbwheel torque loop
//!
//! Every tick the torque loop turns one motor sample into a [`ForceFrame`]
//! and runs it through the force terms below. Each term adds its
//! contribution to the frame's wide torque accumulator.
//!
//! - **Fit**: lock-to-lock dependent angle normalisation and velocity scaling
//! - **Centering**: spring towards the centre, bounded by a maximum force
//! - **Cogging**: velocity-proportional assist cancelling motor cogging
//! - **Viscosity**: cubic velocity damping
//! - **Soft lock**: spring beyond the end of the lock range
//! - **Ramp**: linear torque ramp after (re)initialisation
//! - **Idle**: sleep/wake hysteresis on the wheel angle
//!
//! # RT Safety
//!
//! - No heap allocations
//! - O(1) per term
//! - All arithmetic saturates instead of wrapping
//!
//! # Example
//!
//! ```
//! use ffbwheel_filters::prelude::*;
//!
//! let model = ForceModel {
//!     centering: CenteringState::new(32767),
//!     ..ForceModel::default()
//! };
//! let mut frame = ForceFrame::new(1000, 0);
//! model.apply(&mut frame);
//! assert_eq!(frame.output(), Ok(-1000));
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![deny(unused_must_use)]
#![warn(missing_docs)]
#![warn(missing_debug_implementations)]

pub mod centering;
pub mod cogging;
pub mod fit;
pub mod idle;
pub mod model;
pub mod prelude;
pub mod ramp;
pub mod soft_lock;
pub mod viscosity;

use ffbwheel_errors::{CalibrationOverflow, Quantity};

pub use centering::{CenteringState, centering_filter};
pub use cogging::{CoggingState, cogging_filter};
pub use fit::{AngleFit, LinearFit, clamp_full_scale, normalize_velocity};
pub use idle::{IdleConfig, IdleMonitor, IdleTransition};
pub use model::ForceModel;
pub use ramp::{DEFAULT_RAMP_TICKS, RampState, ramp_filter};
pub use soft_lock::{SoftLockState, soft_lock_filter};
pub use viscosity::{ViscosityState, cube, viscosity_filter};

/// Magnitude of a full-scale normalised angle, torque command or HID axis.
pub const FULL_SCALE: i32 = 32767;

/// Per-tick working set for the force terms.
///
/// `angle` is the fitted angle and may exceed [`FULL_SCALE`] when the wheel
/// is past the configured lock. `torque` is a wide accumulator; the terms add
/// into it with saturating arithmetic and [`ForceFrame::output`] narrows it.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ForceFrame {
    /// Fitted wheel angle
    pub angle: i32,
    /// Normalised wheel velocity
    pub velocity: i32,
    /// Accumulated torque command
    pub torque: i64,
}

impl ForceFrame {
    /// Frame for one sample with an empty accumulator.
    pub fn new(angle: i32, velocity: i32) -> Self {
        Self {
            angle,
            velocity,
            torque: 0,
        }
    }

    /// Add a contribution to the accumulator.
    #[inline]
    pub fn add(&mut self, contribution: i64) {
        self.torque = self.torque.saturating_add(contribution);
    }

    /// Narrow the accumulator to `i32`.
    ///
    /// # Errors
    ///
    /// Returns [`CalibrationOverflow`] carrying the saturated value when the
    /// accumulator does not fit.
    pub fn output(&self) -> Result<i32, CalibrationOverflow> {
        CalibrationOverflow::saturate(Quantity::Torque, self.torque)
    }
}

/// Subtract the host's force-effect output from the frame.
#[inline]
pub fn host_effect_filter(frame: &mut ForceFrame, host_force: i32) {
    frame.add(-i64::from(host_force));
}
