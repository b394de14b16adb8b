//! Lock-free joystick report state.

use std::sync::atomic::{AtomicI32, AtomicU32, AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::{HidResult, HidSink};

/// Axes in the joystick report.
pub const AXIS_COUNT: usize = 6;

/// Buttons in the joystick report.
pub const BUTTON_COUNT: usize = 24;

/// Logical range of one axis. Values are clamped into it on write.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AxisRange {
    pub min: i32,
    pub max: i32,
}

impl AxisRange {
    /// `[-32767, 32767]`, used for the wheel angle.
    pub const SIGNED: Self = Self {
        min: -32767,
        max: 32767,
    };

    /// `[0, 32767]`, used for pedals and the handbrake.
    pub const UNSIGNED: Self = Self { min: 0, max: 32767 };

    pub fn clamp(&self, value: i32) -> i32 {
        value.clamp(self.min, self.max)
    }
}

/// Wheel angle on 0 and 5, pedals and handbrake on 1..=4.
pub const STANDARD_LAYOUT: [AxisRange; AXIS_COUNT] = [
    AxisRange::SIGNED,
    AxisRange::UNSIGNED,
    AxisRange::UNSIGNED,
    AxisRange::UNSIGNED,
    AxisRange::UNSIGNED,
    AxisRange::SIGNED,
];

/// Point-in-time copy of the report handed to a [`ReportWriter`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReportSnapshot {
    pub axes: [i32; AXIS_COUNT],
    /// Bit `n` set means button `n` is pressed
    pub buttons: u32,
}

impl ReportSnapshot {
    pub fn axis(&self, index: usize) -> Option<i32> {
        self.axes.get(index).copied()
    }

    pub fn button(&self, index: usize) -> bool {
        button_bit(index).is_some_and(|bit| self.buttons & bit != 0)
    }

    /// Indices of all pressed buttons, ascending.
    pub fn pressed(&self) -> impl Iterator<Item = usize> + '_ {
        (0..BUTTON_COUNT).filter(|&i| self.button(i))
    }
}

/// Encodes and transmits a report to the host.
pub trait ReportWriter: Send {
    fn write(&mut self, report: &ReportSnapshot) -> HidResult<()>;
}

impl<F> ReportWriter for F
where
    F: FnMut(&ReportSnapshot) -> HidResult<()> + Send,
{
    fn write(&mut self, report: &ReportSnapshot) -> HidResult<()> {
        self(report)
    }
}

pub(crate) fn button_bit(index: usize) -> Option<u32> {
    if index < BUTTON_COUNT {
        1u32.checked_shl(u32::try_from(index).ok()?)
    } else {
        None
    }
}

/// Shared joystick report.
///
/// Axes live in individual atomics and all buttons in one atomic bitmask, so
/// setters from the torque thread and the decoder task never contend. Flushes
/// are serialized by the mutex around the writer.
#[derive(Debug)]
pub struct JoystickReport<W> {
    ranges: [AxisRange; AXIS_COUNT],
    axes: [AtomicI32; AXIS_COUNT],
    buttons: AtomicU32,
    flushes: AtomicU64,
    writer: Mutex<W>,
}

impl<W: ReportWriter> JoystickReport<W> {
    /// Report with the [`STANDARD_LAYOUT`].
    pub fn new(writer: W) -> Self {
        Self::with_layout(STANDARD_LAYOUT, writer)
    }

    pub fn with_layout(ranges: [AxisRange; AXIS_COUNT], writer: W) -> Self {
        Self {
            ranges,
            axes: std::array::from_fn(|_| AtomicI32::new(0)),
            buttons: AtomicU32::new(0),
            flushes: AtomicU64::new(0),
            writer: Mutex::new(writer),
        }
    }

    /// Current state without flushing.
    pub fn snapshot(&self) -> ReportSnapshot {
        ReportSnapshot {
            axes: std::array::from_fn(|i| {
                self.axes
                    .get(i)
                    .map_or(0, |axis| axis.load(Ordering::Acquire))
            }),
            buttons: self.buttons.load(Ordering::Acquire),
        }
    }

    /// Successful flushes so far.
    pub fn flush_count(&self) -> u64 {
        self.flushes.load(Ordering::Relaxed)
    }

    /// Hand an earlier snapshot to the writer. Used by the report thread
    /// behind a [`QueuedSink`](crate::QueuedSink).
    ///
    /// # Errors
    ///
    /// The writer's failure.
    pub fn write_snapshot(&self, snapshot: &ReportSnapshot) -> HidResult<()> {
        self.writer.lock().write(snapshot)?;
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    /// Run `f` against the writer, e.g. to inspect a recording writer.
    pub fn with_writer<R>(&self, f: impl FnOnce(&mut W) -> R) -> R {
        f(&mut self.writer.lock())
    }
}

impl<W: ReportWriter> HidSink for JoystickReport<W> {
    fn set_axis(&self, index: usize, value: i32) {
        if let (Some(axis), Some(range)) = (self.axes.get(index), self.ranges.get(index)) {
            axis.store(range.clamp(value), Ordering::Release);
        }
    }

    fn set_button(&self, index: usize, pressed: bool) {
        let Some(bit) = button_bit(index) else {
            return;
        };
        if pressed {
            self.buttons.fetch_or(bit, Ordering::AcqRel);
        } else {
            self.buttons.fetch_and(!bit, Ordering::AcqRel);
        }
    }

    fn set_buttons(&self, updates: &[(usize, bool)]) {
        let (set, clear) = updates
            .iter()
            .fold((0u32, 0u32), |(set, clear), &(index, pressed)| {
                match (button_bit(index), pressed) {
                    (Some(bit), true) => (set | bit, clear & !bit),
                    (Some(bit), false) => (set & !bit, clear | bit),
                    (None, _) => (set, clear),
                }
            });
        // The closure never returns `None`, so the update always applies.
        let _previous = self
            .buttons
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                Some((current & !clear) | set)
            });
    }

    fn flush(&self) -> HidResult<()> {
        let mut writer = self.writer.lock();
        let snapshot = self.snapshot();
        writer.write(&snapshot)?;
        self.flushes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
