//! Host axis line channel.
//!
//! Reads sample lines, forwards the pass-through axes and runs the shifter
//! decoder, flushing the report after every line.

use std::sync::Arc;

use ffbwheel_hid::HidSink;
use ffbwheel_shifter::{AxisFrame, PassThroughMap, ShiftDecoder};
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShiftChannelStats {
    pub lines: u64,
    /// Lines without a single leading integer
    pub ignored: u64,
    pub flush_errors: u64,
}

/// Process lines from `reader` until end of input or `shutdown`.
///
/// # Errors
///
/// Reading from `reader` failed, including invalid UTF-8.
pub async fn run_shift_channel<R>(
    reader: R,
    mut decoder: ShiftDecoder,
    pass_through: PassThroughMap,
    hid: Arc<dyn HidSink>,
    mut shutdown: broadcast::Receiver<()>,
) -> std::io::Result<ShiftChannelStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut frame = AxisFrame::new();
    let mut stats = ShiftChannelStats::default();
    info!(layout = %decoder.map().layout(), "Shift channel started");

    loop {
        let line = tokio::select! {
            _ = shutdown.recv() => break,
            line = lines.next_line() => line?,
        };
        let Some(line) = line else {
            info!("Shift channel input closed");
            break;
        };
        stats.lines = stats.lines.saturating_add(1);

        if frame.apply_line(&line) == 0 {
            stats.ignored = stats.ignored.saturating_add(1);
            debug!(line = %line, "Ignoring line without samples");
            continue;
        }

        pass_through.forward(&frame, &*hid);
        decoder.apply(&frame, &*hid);
        if let Err(e) = hid.flush() {
            stats.flush_errors = stats.flush_errors.saturating_add(1);
            warn!(error = %e, "HID report flush failed");
        }
    }

    info!(lines = stats.lines, ignored = stats.ignored, "Shift channel stopped");
    Ok(stats)
}
