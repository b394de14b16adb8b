//! Report writer that logs reports instead of sending them.

use tracing::{debug, trace};

use crate::{HidResult, ReportSnapshot, ReportWriter};

/// Logs every report that differs from the previous one at debug level.
///
/// Stands in for the USB endpoint when the service runs without hardware.
#[derive(Debug, Default)]
pub struct TracingReportWriter {
    last: Option<ReportSnapshot>,
    written: u64,
}

impl TracingReportWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reports accepted so far.
    pub fn written(&self) -> u64 {
        self.written
    }

    pub fn last(&self) -> Option<&ReportSnapshot> {
        self.last.as_ref()
    }
}

impl ReportWriter for TracingReportWriter {
    fn write(&mut self, report: &ReportSnapshot) -> HidResult<()> {
        self.written = self.written.saturating_add(1);
        if self.last.as_ref() == Some(report) {
            trace!(seq = self.written, "Joystick report unchanged");
            return Ok(());
        }
        debug!(
            seq = self.written,
            axes = ?report.axes,
            buttons = format_args!("{:#010x}", report.buttons),
            "Joystick report"
        );
        self.last = Some(*report);
        Ok(())
    }
}
