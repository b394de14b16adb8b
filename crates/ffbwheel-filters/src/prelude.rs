//! Prelude for the filters crate.
//!
//! ```
//! use ffbwheel_filters::prelude::*;
//!
//! let mut frame = ForceFrame::new(100, 0);
//! centering_filter(&mut frame, &CenteringState::new(32767));
//! assert_eq!(frame.torque, -100);
//! ```

pub use crate::centering::{CenteringState, centering_filter};
pub use crate::cogging::{CoggingState, cogging_filter};
pub use crate::fit::{AngleFit, LinearFit, clamp_full_scale, normalize_velocity};
pub use crate::idle::{IdleConfig, IdleMonitor, IdleTransition};
pub use crate::model::ForceModel;
pub use crate::ramp::{DEFAULT_RAMP_TICKS, RampState, ramp_filter};
pub use crate::soft_lock::{SoftLockState, soft_lock_filter};
pub use crate::viscosity::{ViscosityState, cube, viscosity_filter};
pub use crate::{FULL_SCALE, ForceFrame, host_effect_filter};
