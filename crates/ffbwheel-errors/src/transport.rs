//! Fieldbus transport errors raised on the torque path.
//!
//! Every variant is `Copy` and carries a stable numeric code so the torque
//! thread can count and forward faults without touching the heap.

use core::fmt;

use crate::common::ErrorSeverity;

/// Failure talking to the motor driver.
///
/// Transport errors are never fatal: the tick that produced one is skipped
/// and the operation is retried on the next tick.
///
/// # Examples
///
/// ```
/// use ffbwheel_errors::{TransportError, ErrorSeverity};
///
/// let err = TransportError::WriteFailed;
/// assert_eq!(err.code(), 2);
/// assert_eq!(err.severity(), ErrorSeverity::Warning);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TransportError {
    /// Reading position/velocity from the driver failed
    ReadFailed = 1,
    /// Writing the torque command failed
    WriteFailed = 2,
    /// The driver rejected a configuration request
    ConfigureRejected = 3,
    /// The bus reported the driver as gone
    Disconnected = 4,
}

impl TransportError {
    /// Numeric error code.
    pub fn code(self) -> u8 {
        self as u8
    }

    /// Severity used for log level selection.
    pub fn severity(self) -> ErrorSeverity {
        match self {
            TransportError::ReadFailed | TransportError::WriteFailed => ErrorSeverity::Warning,
            TransportError::ConfigureRejected => ErrorSeverity::Error,
            TransportError::Disconnected => ErrorSeverity::Critical,
        }
    }

    /// Transport faults are always retried on the next tick.
    pub fn is_recoverable(self) -> bool {
        true
    }

}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportError::ReadFailed => write!(f, "Motor state read failed"),
            TransportError::WriteFailed => write!(f, "Torque write failed"),
            TransportError::ConfigureRejected => write!(f, "Motor configuration rejected"),
            TransportError::Disconnected => write!(f, "Motor link disconnected"),
        }
    }
}

impl std::error::Error for TransportError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_codes_are_distinct() {
        let codes = [
            TransportError::ReadFailed.code(),
            TransportError::WriteFailed.code(),
            TransportError::ConfigureRejected.code(),
            TransportError::Disconnected.code(),
        ];
        assert_eq!(codes, [1, 2, 3, 4]);
    }

    #[test]
    fn test_transport_severity() {
        assert_eq!(
            TransportError::Disconnected.severity(),
            ErrorSeverity::Critical
        );
        assert_eq!(TransportError::ReadFailed.severity(), ErrorSeverity::Warning);
    }

    #[test]
    fn test_transport_display() {
        assert_eq!(
            TransportError::WriteFailed.to_string(),
            "Torque write failed"
        );
    }

    #[test]
    fn test_transport_copy() {
        fn assert_copy<T: Copy>() {}
        assert_copy::<TransportError>();
    }
}
