//! Error types for the ffbwheel control core
//!
//! The control core distinguishes three kinds of failure:
//!
//! - [`TransportError`]: a fieldbus read/write failed. Retried on the next
//!   tick, never fatal. `Copy` with a numeric code so the torque thread can
//!   report it without allocating.
//! - [`ConfigurationError`]: a settings value is outside the allowed ladder
//!   or otherwise malformed. The value is rejected and the previous settings
//!   stay in effect.
//! - [`CalibrationOverflow`]: angle/velocity/torque arithmetic left the
//!   representable range. The value is clamped and the event is counted.
//!
//! [`WheelError`] wraps all of them for code that does not care which one it
//! got.
//!
//! # Example
//!
//! ```
//! use ffbwheel_errors::{TransportError, WheelError, ErrorSeverity};
//!
//! let err: WheelError = TransportError::ReadFailed.into();
//! assert!(err.is_recoverable());
//! assert_eq!(err.severity(), ErrorSeverity::Warning);
//! ```

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod common;
pub mod config;
pub mod overflow;
pub mod transport;

pub use common::{ErrorCategory, ErrorSeverity, WheelError};
pub use config::ConfigurationError;
pub use overflow::{CalibrationOverflow, Quantity};
pub use transport::TransportError;

/// A specialized `Result` type for control-core operations.
pub type Result<T> = std::result::Result<T, WheelError>;

/// A specialized `Result` type for the torque thread.
pub type TransportResult<T = ()> = std::result::Result<T, TransportError>;
