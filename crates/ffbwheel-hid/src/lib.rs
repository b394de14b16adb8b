//! Joystick report state for the ffbwheel controller
//!
//! The torque loop and the shifter decoder both publish into one joystick
//! report: the loop owns the wheel angle axes, the decoder owns the pedal
//! axes and every button. Writers never block each other; only
//! [`HidSink::flush`] is serialized.
//!
//! Encoding the report into HID bytes is the job of a [`ReportWriter`].
//! A [`QueuedSink`] keeps that work on a dedicated report thread so the
//! torque thread only copies a [`ReportSnapshot`] into a bounded queue.

#![deny(unsafe_op_in_unsafe_fn)]
#![deny(clippy::unwrap_used)]

pub mod mock;
pub mod queued;
pub mod report;
pub mod sink;
pub mod tracing_writer;

pub use report::{AXIS_COUNT, AxisRange, BUTTON_COUNT, JoystickReport, ReportSnapshot, ReportWriter};
pub use queued::{DEFAULT_QUEUE_CAPACITY, QueuedSink, ReportThread, spawn_report_thread};
pub use sink::HidSink;
pub use tracing_writer::TracingReportWriter;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HidError {
    #[error("Failed to write report: {0}")]
    WriteFailed(String),

    #[error("Host disconnected")]
    Disconnected,

    #[error("Report queue full, snapshot dropped")]
    QueueFull,

    #[error("Report thread panicked")]
    ReportThreadPanicked,
}

pub type HidResult<T> = Result<T, HidError>;
