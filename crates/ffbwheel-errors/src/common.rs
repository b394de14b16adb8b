//! Top-level error type and classification shared by every ffbwheel crate.

use core::fmt;

use crate::{CalibrationOverflow, ConfigurationError, TransportError};

/// Any error the control core can produce.
#[derive(Debug, thiserror::Error)]
pub enum WheelError {
    /// Fieldbus transport errors
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Settings validation and persistence errors
    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Saturated arithmetic in the force model
    #[error("Calibration overflow: {0}")]
    Overflow(#[from] CalibrationOverflow),

    /// I/O errors from settings files or the host channel
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WheelError {
    /// Error category for classification.
    pub fn category(&self) -> ErrorCategory {
        match self {
            WheelError::Transport(_) => ErrorCategory::Transport,
            WheelError::Configuration(_) => ErrorCategory::Configuration,
            WheelError::Overflow(_) => ErrorCategory::Calibration,
            WheelError::Io(_) => ErrorCategory::Io,
        }
    }

    /// Error severity level.
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            WheelError::Transport(e) => e.severity(),
            WheelError::Configuration(e) => e.severity(),
            WheelError::Overflow(_) => ErrorSeverity::Info,
            WheelError::Io(_) => ErrorSeverity::Error,
        }
    }

    /// Nothing in the control core stops the process; only a disconnected
    /// link is classified as critical.
    pub fn is_recoverable(&self) -> bool {
        self.severity() < ErrorSeverity::Critical
    }
}

/// Error category for classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum ErrorCategory {
    /// Motor link errors
    Transport = 0,
    /// Settings errors
    Configuration = 1,
    /// Force model saturation
    Calibration = 2,
    /// I/O errors
    Io = 3,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorCategory::Transport => write!(f, "Transport"),
            ErrorCategory::Configuration => write!(f, "Configuration"),
            ErrorCategory::Calibration => write!(f, "Calibration"),
            ErrorCategory::Io => write!(f, "IO"),
        }
    }
}

/// Error severity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum ErrorSeverity {
    /// Informational, no action required
    Info = 0,
    /// Warning, retried automatically
    Warning = 1,
    /// Error, operation failed
    Error = 2,
    /// Critical, hardware needs attention
    Critical = 3,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorSeverity::Info => write!(f, "INFO"),
            ErrorSeverity::Warning => write!(f, "WARN"),
            ErrorSeverity::Error => write!(f, "ERROR"),
            ErrorSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}
