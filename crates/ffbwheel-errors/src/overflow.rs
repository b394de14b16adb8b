//! Arithmetic overflow in the force model.

use core::fmt;

/// Quantity that left its representable range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Quantity {
    /// Normalised wheel angle
    Angle = 0,
    /// Normalised wheel velocity
    Velocity = 1,
    /// Summed torque command
    Torque = 2,
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Quantity::Angle => write!(f, "angle"),
            Quantity::Velocity => write!(f, "velocity"),
            Quantity::Torque => write!(f, "torque"),
        }
    }
}

/// A value was saturated instead of wrapping.
///
/// Never fatal. The force model substitutes the clamped value and the
/// runner counts the event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, thiserror::Error)]
#[error("{quantity} overflow: {raw} saturated to {clamped}")]
pub struct CalibrationOverflow {
    /// Which quantity overflowed
    pub quantity: Quantity,
    /// The wide intermediate value
    pub raw: i64,
    /// The value actually used
    pub clamped: i32,
}

impl CalibrationOverflow {
    /// Saturate `raw` to `i32`, reporting an overflow if it did not fit.
    ///
    /// ```
    /// use ffbwheel_errors::{CalibrationOverflow, Quantity};
    ///
    /// assert_eq!(CalibrationOverflow::saturate(Quantity::Torque, 12), Ok(12));
    /// let err = CalibrationOverflow::saturate(Quantity::Torque, i64::MAX).unwrap_err();
    /// assert_eq!(err.clamped, i32::MAX);
    /// ```
    pub fn saturate(quantity: Quantity, raw: i64) -> Result<i32, CalibrationOverflow> {
        match i32::try_from(raw) {
            Ok(v) => Ok(v),
            Err(_) => Err(CalibrationOverflow {
                quantity,
                raw,
                clamped: if raw < 0 { i32::MIN } else { i32::MAX },
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_saturate_in_range() {
        assert_eq!(CalibrationOverflow::saturate(Quantity::Angle, -5), Ok(-5));
    }

    #[test]
    fn test_saturate_negative() {
        let got = CalibrationOverflow::saturate(Quantity::Velocity, i64::MIN);
        assert_eq!(got.map_err(|e| e.clamped), Err(i32::MIN));
    }

    #[test]
    fn test_overflow_display() {
        let err = CalibrationOverflow {
            quantity: Quantity::Torque,
            raw: 5_000_000_000,
            clamped: i32::MAX,
        };
        assert!(err.to_string().starts_with("torque overflow"));
    }
}
