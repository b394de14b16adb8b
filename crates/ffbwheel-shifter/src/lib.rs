//! Shifter decoding for the ffbwheel controller
//!
//! Host-supplied axis samples are turned into the gear and auxiliary button
//! state of the joystick report. Supports an H-pattern gate (4×3 or 3×3),
//! a sequential lever and four analog-threshold buttons.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod decoder;
pub mod input;
pub mod types;

pub use decoder::*;
pub use input::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ShifterError {
    #[error("Unknown shift layout '{0}' (expected 4x3 or 3x3)")]
    UnknownLayout(String),

    #[error("Sample index {0} is outside the axis frame")]
    InvalidSample(usize),

    #[error("Button {0} is outside the joystick report")]
    InvalidButton(usize),
}

pub type ShifterResult<T> = Result<T, ShifterError>;
