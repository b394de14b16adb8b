//! The complete per-tick force model.

use crate::{
    CenteringState, CoggingState, ForceFrame, SoftLockState, ViscosityState, centering_filter,
    cogging_filter, soft_lock_filter, viscosity_filter,
};

/// All force terms driven by the user settings, applied in a fixed order.
#[repr(C)]
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct ForceModel {
    /// Centering spring
    pub centering: CenteringState,
    /// Cogging cancellation
    pub cogging: CoggingState,
    /// Cubic damping
    pub viscosity: ViscosityState,
    /// Virtual end stop
    pub soft_lock: SoftLockState,
}

impl ForceModel {
    /// Apply every term to `frame`. Host force effects are not included.
    #[inline]
    pub fn apply(&self, frame: &mut ForceFrame) {
        centering_filter(frame, &self.centering);
        cogging_filter(frame, &self.cogging);
        viscosity_filter(frame, &self.viscosity);
        soft_lock_filter(frame, &self.soft_lock);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FULL_SCALE;

    #[test]
    fn test_terms_are_additive() {
        let model = ForceModel {
            centering: CenteringState::new(1000),
            cogging: CoggingState::new(2),
            viscosity: ViscosityState::new(1),
            soft_lock: SoftLockState::new(5),
        };
        let mut frame = ForceFrame::new(FULL_SCALE + 10, 256);
        model.apply(&mut frame);
        // -1000 centering, +512 cogging, -256 viscosity, -50 soft lock
        assert_eq!(frame.torque, -794);
    }

    #[test]
    fn test_default_model_is_silent() {
        let mut frame = ForceFrame::new(20_000, -3_000);
        ForceModel::default().apply(&mut frame);
        assert_eq!(frame.torque, 0);
    }
}
