//! Capability trait for publishing joystick state.

use std::sync::Arc;

use crate::HidResult;

/// Destination for axis and button updates.
///
/// Setters never block and never fail; indices outside the report are
/// ignored. [`flush`](HidSink::flush) hands the current state to the host.
pub trait HidSink: Send + Sync {
    fn set_axis(&self, index: usize, value: i32);

    fn set_button(&self, index: usize, pressed: bool);

    /// Apply several button changes as one update. A concurrent flush sees
    /// either none or all of them.
    fn set_buttons(&self, updates: &[(usize, bool)]);

    fn flush(&self) -> HidResult<()>;
}

impl<T: HidSink + ?Sized> HidSink for Arc<T> {
    fn set_axis(&self, index: usize, value: i32) {
        (**self).set_axis(index, value);
    }

    fn set_button(&self, index: usize, pressed: bool) {
        (**self).set_button(index, pressed);
    }

    fn set_buttons(&self, updates: &[(usize, bool)]) {
        (**self).set_buttons(updates);
    }

    fn flush(&self) -> HidResult<()> {
        (**self).flush()
    }
}
