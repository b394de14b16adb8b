//! Recording sink for tests.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::report::button_bit;
use crate::{AXIS_COUNT, HidError, HidResult, HidSink, ReportSnapshot};

/// One call made against a [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HidEvent {
    Axis(usize, i32),
    Button(usize, bool),
    Buttons(Vec<(usize, bool)>),
    Flush(ReportSnapshot),
}

#[derive(Debug, Default)]
struct Recorded {
    state: ReportSnapshot,
    events: Vec<HidEvent>,
    fail_flush: bool,
}

/// [`HidSink`] that records every call and keeps an unclamped copy of the
/// report state.
///
/// Clones share the same recording.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent flushes fail with [`HidError::Disconnected`].
    pub fn fail_flushes(&self, fail: bool) {
        self.inner.lock().fail_flush = fail;
    }

    pub fn state(&self) -> ReportSnapshot {
        self.inner.lock().state
    }

    pub fn events(&self) -> Vec<HidEvent> {
        self.inner.lock().events.clone()
    }

    /// Reports passed to successful flushes, oldest first.
    pub fn flushed(&self) -> Vec<ReportSnapshot> {
        self.inner
            .lock()
            .events
            .iter()
            .filter_map(|e| match e {
                HidEvent::Flush(snap) => Some(*snap),
                _ => None,
            })
            .collect()
    }

    pub fn pressed(&self) -> Vec<usize> {
        self.state().pressed().collect()
    }

    pub fn clear_events(&self) {
        self.inner.lock().events.clear();
    }
}

fn apply_button(state: &mut ReportSnapshot, index: usize, pressed: bool) {
    if let Some(bit) = button_bit(index) {
        if pressed {
            state.buttons |= bit;
        } else {
            state.buttons &= !bit;
        }
    }
}

impl HidSink for RecordingSink {
    fn set_axis(&self, index: usize, value: i32) {
        let mut inner = self.inner.lock();
        if index < AXIS_COUNT {
            if let Some(axis) = inner.state.axes.get_mut(index) {
                *axis = value;
            }
        }
        inner.events.push(HidEvent::Axis(index, value));
    }

    fn set_button(&self, index: usize, pressed: bool) {
        let mut inner = self.inner.lock();
        apply_button(&mut inner.state, index, pressed);
        inner.events.push(HidEvent::Button(index, pressed));
    }

    fn set_buttons(&self, updates: &[(usize, bool)]) {
        let mut inner = self.inner.lock();
        for &(index, pressed) in updates {
            apply_button(&mut inner.state, index, pressed);
        }
        inner.events.push(HidEvent::Buttons(updates.to_vec()));
    }

    fn flush(&self) -> HidResult<()> {
        let mut inner = self.inner.lock();
        if inner.fail_flush {
            return Err(HidError::Disconnected);
        }
        let snap = inner.state;
        inner.events.push(HidEvent::Flush(snap));
        Ok(())
    }
}
