//! Auxiliary axis line parsing
//!
//! The host sends one line per sample set: up to [`SAMPLE_COUNT`]
//! comma-separated signed integers. The frame persists across lines, so a
//! short line only updates its leading samples.

use ffbwheel_hid::HidSink;
use serde::{Deserialize, Serialize};

/// Samples in one frame.
pub const SAMPLE_COUNT: usize = 11;

pub const SHIFT_X: usize = 0;
pub const SHIFT_Y: usize = 1;
pub const SEQ_DOWN: usize = 6;
pub const SEQ_UP: usize = 7;
/// Steering sample. Never forwarded; the torque loop owns the angle axes.
pub const STEERING: usize = 9;

/// Most recent value of every host sample.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct AxisFrame {
    samples: [i32; SAMPLE_COUNT],
}

impl AxisFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_samples(samples: [i32; SAMPLE_COUNT]) -> Self {
        Self { samples }
    }

    /// Sample at `index`, zero when out of range.
    pub fn get(&self, index: usize) -> i32 {
        self.samples.get(index).copied().unwrap_or(0)
    }

    pub fn set(&mut self, index: usize, value: i32) {
        if let Some(slot) = self.samples.get_mut(index) {
            *slot = value;
        }
    }

    pub fn samples(&self) -> &[i32; SAMPLE_COUNT] {
        &self.samples
    }

    /// Update from one text line and return how many fields were taken.
    ///
    /// Parsing stops at the first field that is not an `i32`; later fields
    /// and any beyond [`SAMPLE_COUNT`] are ignored.
    ///
    /// ```
    /// use ffbwheel_shifter::AxisFrame;
    ///
    /// let mut frame = AxisFrame::new();
    /// assert_eq!(frame.apply_line("5,-7,9"), 3);
    /// assert_eq!(frame.apply_line("1,x,100"), 1);
    /// assert_eq!(frame.get(0), 1);
    /// assert_eq!(frame.get(1), -7);
    /// assert_eq!(frame.get(2), 9);
    /// ```
    pub fn apply_line(&mut self, line: &str) -> usize {
        let mut taken = 0;
        for (slot, field) in self.samples.iter_mut().zip(line.split(',')) {
            match field.trim().parse::<i32>() {
                Ok(value) => *slot = value,
                Err(_) => break,
            }
            taken += 1;
        }
        taken
    }

    pub fn seq_up(&self) -> bool {
        self.get(SEQ_UP) > 0
    }

    pub fn seq_down(&self) -> bool {
        self.get(SEQ_DOWN) > 0
    }
}

/// Which samples are copied straight to report axes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PassThroughMap {
    /// `(sample, axis)` pairs
    pub routes: Vec<(usize, usize)>,
}

impl PassThroughMap {
    /// Forward every routed sample to its axis.
    pub fn forward(&self, frame: &AxisFrame, sink: &dyn HidSink) {
        for &(sample, axis) in &self.routes {
            sink.set_axis(axis, frame.get(sample));
        }
    }
}

impl Default for PassThroughMap {
    /// Side/handbrake, throttle, brake and clutch onto axes 1, 2, 4 and 3.
    fn default() -> Self {
        Self {
            routes: vec![(2, 1), (3, 2), (4, 4), (5, 3)],
        }
    }
}
