//! User settings model.
//!
//! Settings are loaded once at startup, changed by the lock-range selector
//! and persisted immediately. The torque loop only ever sees whole
//! validated snapshots.

use std::fmt;

use ffbwheel_errors::ConfigurationError;
use serde::{Deserialize, Serialize};

/// Settings document version understood by this build.
pub const SCHEMA_VERSION: u32 = 1;

/// Supported lock-to-lock ranges, in ladder order.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(try_from = "u16", into = "u16")]
pub enum LockToLock {
    D180,
    D360,
    #[default]
    D540,
    D720,
    D1080,
}

impl LockToLock {
    /// Every value, smallest first.
    pub const LADDER: [LockToLock; 5] = [
        LockToLock::D180,
        LockToLock::D360,
        LockToLock::D540,
        LockToLock::D720,
        LockToLock::D1080,
    ];

    pub fn degrees(self) -> u16 {
        match self {
            LockToLock::D180 => 180,
            LockToLock::D360 => 360,
            LockToLock::D540 => 540,
            LockToLock::D720 => 720,
            LockToLock::D1080 => 1080,
        }
    }

    /// Position on the ladder, 0 for 180°.
    pub fn index(self) -> usize {
        match self {
            LockToLock::D180 => 0,
            LockToLock::D360 => 1,
            LockToLock::D540 => 2,
            LockToLock::D720 => 3,
            LockToLock::D1080 => 4,
        }
    }

    /// Next wider range, `None` at 1080°.
    pub fn step_up(self) -> Option<Self> {
        Self::LADDER.get(self.index().checked_add(1)?).copied()
    }

    /// Next narrower range, `None` at 180°.
    pub fn step_down(self) -> Option<Self> {
        Self::LADDER.get(self.index().checked_sub(1)?).copied()
    }

    /// Indicator LEDs: ladder index + 1 as three bits, LED0 is bit 0.
    ///
    /// ```
    /// use ffbwheel_engine::LockToLock;
    ///
    /// assert_eq!(LockToLock::D180.indicator_pattern(), [true, false, false]);
    /// assert_eq!(LockToLock::D540.indicator_pattern(), [true, true, false]);
    /// assert_eq!(LockToLock::D1080.indicator_pattern(), [true, false, true]);
    /// ```
    pub fn indicator_pattern(self) -> [bool; 3] {
        let code = self.index().saturating_add(1);
        [code & 0b001 != 0, code & 0b010 != 0, code & 0b100 != 0]
    }
}

impl TryFrom<u16> for LockToLock {
    type Error = ConfigurationError;

    fn try_from(degrees: u16) -> Result<Self, Self::Error> {
        Self::LADDER
            .iter()
            .copied()
            .find(|lock| lock.degrees() == degrees)
            .ok_or(ConfigurationError::UnsupportedLock(i64::from(degrees)))
    }
}

impl From<LockToLock> for u16 {
    fn from(lock: LockToLock) -> Self {
        lock.degrees()
    }
}

impl fmt::Display for LockToLock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}°", self.degrees())
    }
}

/// Tunables for the torque loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub schema_version: u32,
    #[serde(rename = "lock_to_lock_degrees")]
    pub lock_to_lock: LockToLock,
    pub neutral_adjust_degrees: f32,
    pub cogging_cancel_gain: i32,
    pub viscosity_gain: i32,
    pub soft_lock_gain: i32,
    pub max_centering_force: i32,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            lock_to_lock: LockToLock::default(),
            neutral_adjust_degrees: 0.0,
            cogging_cancel_gain: 0,
            viscosity_gain: 0,
            soft_lock_gain: 0,
            max_centering_force: 32767,
        }
    }
}

impl Settings {
    /// Copy with a different lock-to-lock range.
    pub fn with_lock(&self, lock_to_lock: LockToLock) -> Self {
        Self {
            lock_to_lock,
            ..self.clone()
        }
    }

    /// # Errors
    ///
    /// The first rule the settings break.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ConfigurationError::SchemaVersion {
                found: self.schema_version,
                expected: SCHEMA_VERSION,
            });
        }
        if !self.neutral_adjust_degrees.is_finite() {
            return Err(ConfigurationError::NonFinite {
                field: "neutral_adjust_degrees",
            });
        }
        for (field, value) in [
            ("cogging_cancel_gain", self.cogging_cancel_gain),
            ("viscosity_gain", self.viscosity_gain),
            ("soft_lock_gain", self.soft_lock_gain),
            ("max_centering_force", self.max_centering_force),
        ] {
            if value < 0 {
                return Err(ConfigurationError::negative(field, value));
            }
        }
        Ok(())
    }

    /// Parse and validate a JSON document.
    ///
    /// # Errors
    ///
    /// [`ConfigurationError::Malformed`] for undecodable JSON (including a
    /// lock value off the ladder), otherwise the validation failure.
    pub fn from_json(json: &str) -> Result<Self, ConfigurationError> {
        let settings: Settings = serde_json::from_str(json)
            .map_err(|e| ConfigurationError::Malformed(e.to_string()))?;
        settings.validate()?;
        Ok(settings)
    }

    /// # Errors
    ///
    /// [`ConfigurationError::Malformed`] if serialization fails.
    pub fn to_json(&self) -> Result<String, ConfigurationError> {
        serde_json::to_string_pretty(self).map_err(|e| ConfigurationError::Malformed(e.to_string()))
    }
}
