//! Shifter type definitions

use std::fmt;
use std::str::FromStr;

use ffbwheel_hid::BUTTON_COUNT;
use serde::{Deserialize, Serialize};

use crate::{SAMPLE_COUNT, ShifterError, ShifterResult};

pub const MAX_GEARS: u8 = 8;
pub const NEUTRAL_GEAR: u8 = 0;

/// Columns of every shift table: left gate, neutral lane, right gate.
pub const SHIFT_COLUMNS: usize = 3;

const EIGHT_SPEED: [[u8; SHIFT_COLUMNS]; 4] = [[2, 0, 1], [4, 0, 3], [6, 0, 5], [8, 0, 7]];
const SIX_SPEED: [[u8; SHIFT_COLUMNS]; 3] = [[2, 0, 1], [4, 0, 3], [6, 0, 5]];

/// Shape of the H-pattern gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ShiftLayout {
    /// Four lanes, gears 1..=8
    #[default]
    #[serde(rename = "4x3")]
    EightSpeed,
    /// Three lanes, gears 1..=6
    #[serde(rename = "3x3")]
    SixSpeed,
}

impl FromStr for ShiftLayout {
    type Err = ShifterError;

    fn from_str(s: &str) -> ShifterResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "4x3" | "8" | "eight" => Ok(ShiftLayout::EightSpeed),
            "3x3" | "6" | "six" => Ok(ShiftLayout::SixSpeed),
            other => Err(ShifterError::UnknownLayout(other.to_string())),
        }
    }
}

impl fmt::Display for ShiftLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ShiftLayout::EightSpeed => write!(f, "4x3"),
            ShiftLayout::SixSpeed => write!(f, "3x3"),
        }
    }
}

/// Table from `(x_bucket, y_bucket)` to gear. Rows are x buckets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ShiftMap {
    layout: ShiftLayout,
    table: &'static [[u8; SHIFT_COLUMNS]],
}

impl ShiftMap {
    pub fn new(layout: ShiftLayout) -> Self {
        let table: &'static [[u8; SHIFT_COLUMNS]] = match layout {
            ShiftLayout::EightSpeed => &EIGHT_SPEED,
            ShiftLayout::SixSpeed => &SIX_SPEED,
        };
        Self { layout, table }
    }

    pub fn layout(&self) -> ShiftLayout {
        self.layout
    }

    /// Number of x buckets.
    pub fn rows(&self) -> usize {
        self.table.len()
    }

    /// Number of y buckets.
    pub fn columns(&self) -> usize {
        SHIFT_COLUMNS
    }

    /// Gear at the given buckets, neutral for buckets outside the table.
    pub fn gear_at(&self, x_bucket: usize, y_bucket: usize) -> u8 {
        self.table
            .get(x_bucket)
            .and_then(|row| row.get(y_bucket))
            .copied()
            .unwrap_or(NEUTRAL_GEAR)
    }

    /// Highest gear reachable in this gate.
    pub fn top_gear(&self) -> u8 {
        self.table
            .iter()
            .flat_map(|row| row.iter().copied())
            .max()
            .unwrap_or(NEUTRAL_GEAR)
    }
}

impl Default for ShiftMap {
    fn default() -> Self {
        Self::new(ShiftLayout::default())
    }
}

/// A button driven by an analog sample crossing [`ButtonMap::aux_threshold`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuxButton {
    pub button: usize,
    pub sample: usize,
}

/// Where decoded state lands in the joystick report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ButtonMap {
    /// Button for gear 1; gear `g` uses `gear_base + g - 1`
    pub gear_base: usize,
    pub seq_up_button: usize,
    pub seq_down_button: usize,
    /// Paddles, clutch and handbrake buttons, only active in neutral
    pub aux: [AuxButton; 4],
    /// Raw value above which an aux button is pressed
    pub aux_threshold: i32,
}

impl ButtonMap {
    /// Button index for gear `gear` (1-based). `None` for neutral.
    pub fn gear_button(&self, gear: u8) -> Option<usize> {
        if gear == NEUTRAL_GEAR || gear > MAX_GEARS {
            return None;
        }
        self.gear_base.checked_add(usize::from(gear))?.checked_sub(1)
    }

    /// Reject aux mappings that read samples outside the axis frame and
    /// buttons that do not fit in the joystick report.
    ///
    /// # Errors
    ///
    /// The first offending sample or button index.
    pub fn validate(&self) -> ShifterResult<()> {
        if let Some(aux) = self.aux.iter().find(|aux| aux.sample >= SAMPLE_COUNT) {
            return Err(ShifterError::InvalidSample(aux.sample));
        }
        let top_gear = self
            .gear_button(MAX_GEARS)
            .ok_or(ShifterError::InvalidButton(self.gear_base))?;
        [top_gear, self.seq_up_button, self.seq_down_button]
            .into_iter()
            .chain(self.aux.iter().map(|aux| aux.button))
            .find(|&button| button >= BUTTON_COUNT)
            .map_or(Ok(()), |button| Err(ShifterError::InvalidButton(button)))
    }
}

impl Default for ButtonMap {
    fn default() -> Self {
        Self {
            gear_base: 10,
            seq_up_button: 8,
            seq_down_button: 9,
            aux: [
                AuxButton { button: 0, sample: 3 },
                AuxButton { button: 1, sample: 4 },
                AuxButton { button: 2, sample: 5 },
                AuxButton { button: 3, sample: 2 },
            ],
            aux_threshold: 8192,
        }
    }
}

/// Decoder state carried between samples.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct GearState {
    /// Gear selected by the H-pattern, `0` is neutral
    pub current_gear: u8,
    /// Sequential lever active on this sample, or latched
    pub sequential_mode: bool,
    /// Sequential mode stays on for the rest of the session
    pub latched: bool,
}

impl GearState {
    /// Back to neutral with the sequential latch cleared.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_neutral(&self) -> bool {
        self.current_gear == NEUTRAL_GEAR
    }
}
