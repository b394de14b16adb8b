//! Settings validation errors.

use crate::common::ErrorSeverity;

/// A settings value was rejected.
///
/// The previous settings stay in effect whenever one of these is returned.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ConfigurationError {
    /// Lock-to-lock value is not on the supported ladder
    #[error("Lock-to-lock {0} degrees is not one of 180, 360, 540, 720, 1080")]
    UnsupportedLock(i64),

    /// A gain or limit that must be non-negative was negative
    #[error("{field} must be >= 0, got {value}")]
    Negative {
        /// Field name
        field: &'static str,
        /// The rejected value
        value: i64,
    },

    /// A floating point field was NaN or infinite
    #[error("{field} must be finite")]
    NonFinite {
        /// Field name
        field: &'static str,
    },

    /// Settings file written by an incompatible version
    #[error("Unsupported settings schema version {found} (expected {expected})")]
    SchemaVersion {
        /// Version in the document
        found: u32,
        /// Version this build understands
        expected: u32,
    },

    /// Document could not be decoded
    #[error("Malformed settings: {0}")]
    Malformed(String),

    /// Settings could not be persisted
    #[error("Failed to persist settings: {0}")]
    Persist(String),
}

impl ConfigurationError {
    /// Shorthand for [`ConfigurationError::Negative`].
    pub fn negative(field: &'static str, value: impl Into<i64>) -> Self {
        ConfigurationError::Negative {
            field,
            value: value.into(),
        }
    }

    /// Severity used for log level selection.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            ConfigurationError::Persist(_) => ErrorSeverity::Error,
            _ => ErrorSeverity::Warning,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unsupported_lock_display() {
        let err = ConfigurationError::UnsupportedLock(900);
        assert!(err.to_string().contains("900"));
    }

    #[test]
    fn test_negative_helper() {
        let err = ConfigurationError::negative("viscosity_gain", -3);
        assert_eq!(
            err,
            ConfigurationError::Negative {
                field: "viscosity_gain",
                value: -3
            }
        );
        assert_eq!(err.to_string(), "viscosity_gain must be >= 0, got -3");
    }

    #[test]
    fn test_persist_is_error_severity() {
        let err = ConfigurationError::Persist("disk full".into());
        assert_eq!(err.severity(), ErrorSeverity::Error);
    }
}
