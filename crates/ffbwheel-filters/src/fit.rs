//! Integer linear maps used to normalise raw motor readings.

use ffbwheel_errors::{CalibrationOverflow, Quantity};

use crate::FULL_SCALE;

/// Numerator of the velocity scale factor.
pub const VELOCITY_SCALE: i64 = 256;

/// Raw velocity reading that corresponds to [`VELOCITY_SCALE`].
pub const RAW_VELOCITY_FULL_SCALE: i64 = 220;

/// Unclamped integer linear map from `[in_min, in_max]` onto `[out_min, out_max]`.
///
/// Inputs outside the source range extrapolate. Division truncates towards
/// zero.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinearFit {
    /// Source range start
    pub in_min: i64,
    /// Source range end
    pub in_max: i64,
    /// Target range start
    pub out_min: i64,
    /// Target range end
    pub out_max: i64,
}

impl LinearFit {
    /// Create a new map.
    pub const fn new(in_min: i64, in_max: i64, out_min: i64, out_max: i64) -> Self {
        Self {
            in_min,
            in_max,
            out_min,
            out_max,
        }
    }

    /// Map `x`. A degenerate source range maps everything to `out_min`.
    ///
    /// ```
    /// use ffbwheel_filters::LinearFit;
    ///
    /// let fit = LinearFit::new(-32767, 32767, 0, 4);
    /// assert_eq!(fit.map(-32767), 0);
    /// assert_eq!(fit.map(0), 2);
    /// assert_eq!(fit.map(32767), 4);
    /// ```
    #[inline]
    pub fn map(&self, x: i64) -> i64 {
        let span = self.in_max.saturating_sub(self.in_min);
        if span == 0 {
            return self.out_min;
        }
        x.saturating_sub(self.in_min)
            .saturating_mul(self.out_max.saturating_sub(self.out_min))
            .checked_div(span)
            .unwrap_or(0)
            .saturating_add(self.out_min)
    }

    /// Map `x` and clamp the result to `[lo, hi]`.
    #[inline]
    pub fn map_clamped(&self, x: i64, lo: i64, hi: i64) -> i64 {
        self.map(x).clamp(lo, hi)
    }
}

/// Angle normalisation for a given lock-to-lock range.
///
/// `±max_raw` encoder counts map onto `±FULL_SCALE`, where
/// `max_raw = 32768 * (lock / 2) / 360 - 1`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AngleFit {
    /// Encoder counts at the end of the lock range
    pub max_raw: i64,
    fit: LinearFit,
}

impl AngleFit {
    /// Build the fit for a lock-to-lock range in degrees.
    ///
    /// ```
    /// use ffbwheel_filters::AngleFit;
    ///
    /// assert_eq!(AngleFit::for_lock(540).max_raw, 24575);
    /// assert_eq!(AngleFit::for_lock(1080).max_raw, 49151);
    /// ```
    pub fn for_lock(lock_to_lock_degrees: u16) -> Self {
        let half = i64::from(lock_to_lock_degrees / 2);
        let max_raw = (32768 * half / 360).saturating_sub(1);
        let full = i64::from(FULL_SCALE);
        Self {
            max_raw,
            fit: LinearFit::new(-max_raw, max_raw, -full, full),
        }
    }

    /// Fitted angle. Unclamped, so readings past the lock exceed
    /// `±FULL_SCALE`.
    ///
    /// # Errors
    ///
    /// [`CalibrationOverflow`] with the saturated angle if the result does
    /// not fit `i32`.
    #[inline]
    pub fn apply(&self, raw_angle: i32) -> Result<i32, CalibrationOverflow> {
        CalibrationOverflow::saturate(Quantity::Angle, self.fit.map(i64::from(raw_angle)))
    }
}

/// Scale a raw velocity reading by `256 / 220`.
///
/// # Errors
///
/// [`CalibrationOverflow`] with the saturated velocity if the result does
/// not fit `i32`.
#[inline]
pub fn normalize_velocity(raw_velocity: i32) -> Result<i32, CalibrationOverflow> {
    let scaled = i64::from(raw_velocity) * VELOCITY_SCALE / RAW_VELOCITY_FULL_SCALE;
    CalibrationOverflow::saturate(Quantity::Velocity, scaled)
}

/// Clamp to the reportable range `[-FULL_SCALE, FULL_SCALE]`.
#[inline]
pub fn clamp_full_scale(value: i32) -> i32 {
    value.clamp(-FULL_SCALE, FULL_SCALE)
}

#[cfg(test)]
#[allow(clippy::assertions_on_result_states)]
mod tests {
    use super::*;

    #[test]
    fn test_angle_fit_endpoints() {
        let fit = AngleFit::for_lock(540);
        assert_eq!(fit.apply(0), Ok(0));
        assert_eq!(fit.apply(24575), Ok(FULL_SCALE));
        assert_eq!(fit.apply(-24575), Ok(-FULL_SCALE));
    }

    #[test]
    fn test_angle_fit_extrapolates_past_lock() {
        let fit = AngleFit::for_lock(180);
        assert_eq!(fit.max_raw, 8191);
        let past = fit.apply(16382);
        assert!(matches!(past, Ok(a) if a > FULL_SCALE));
    }

    #[test]
    fn test_angle_fit_saturates() {
        let fit = AngleFit::for_lock(180);
        let got = fit.apply(i32::MAX);
        assert_eq!(got.map_err(|e| e.clamped), Err(i32::MAX));
    }

    #[test]
    fn test_velocity_scale() {
        assert_eq!(normalize_velocity(220), Ok(256));
        assert_eq!(normalize_velocity(-220), Ok(-256));
        assert_eq!(normalize_velocity(100), Ok(116));
        assert!(normalize_velocity(i32::MAX).is_err());
    }

    #[test]
    fn test_degenerate_fit() {
        let fit = LinearFit::new(5, 5, -1, 1);
        assert_eq!(fit.map(100), -1);
    }

    #[test]
    fn test_clamp_full_scale() {
        assert_eq!(clamp_full_scale(40000), FULL_SCALE);
        assert_eq!(clamp_full_scale(-40000), -FULL_SCALE);
        assert_eq!(clamp_full_scale(12), 12);
    }
}
