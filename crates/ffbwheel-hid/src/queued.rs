//! Moves report writing off the caller's thread.
//!
//! [`QueuedSink::flush`] copies the report into a [`ReportSnapshot`] and
//! offers it to a bounded channel with `try_send`. A dedicated report thread
//! is the only caller of the [`ReportWriter`]. A full queue drops the
//! snapshot and counts it; the next flush carries the newer state anyway.
//!
//! # RT Safety
//!
//! `flush` takes no lock and never blocks. The setters are the same
//! atomic stores as on [`JoystickReport`].

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender, TrySendError};
use tracing::{debug, info, warn};

use crate::{HidError, HidResult, HidSink, JoystickReport, ReportSnapshot, ReportWriter};

/// Default number of snapshots that may wait for the report thread.
pub const DEFAULT_QUEUE_CAPACITY: usize = 16;

const REPORT_POLL: Duration = Duration::from_millis(50);

/// [`HidSink`] that hands flushed snapshots to a report thread.
pub struct QueuedSink<W> {
    report: Arc<JoystickReport<W>>,
    tx: Sender<ReportSnapshot>,
    dropped: Arc<AtomicU64>,
}

impl<W> Clone for QueuedSink<W> {
    fn clone(&self) -> Self {
        Self {
            report: Arc::clone(&self.report),
            tx: self.tx.clone(),
            dropped: Arc::clone(&self.dropped),
        }
    }
}

impl<W> std::fmt::Debug for QueuedSink<W> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueuedSink")
            .field("queued", &self.tx.len())
            .field("dropped", &self.dropped.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl<W: ReportWriter> QueuedSink<W> {
    /// Snapshots discarded because the queue was full.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn report(&self) -> &Arc<JoystickReport<W>> {
        &self.report
    }
}

impl<W: ReportWriter + 'static> HidSink for QueuedSink<W> {
    fn set_axis(&self, index: usize, value: i32) {
        self.report.set_axis(index, value);
    }

    fn set_button(&self, index: usize, pressed: bool) {
        self.report.set_button(index, pressed);
    }

    fn set_buttons(&self, updates: &[(usize, bool)]) {
        self.report.set_buttons(updates);
    }

    fn flush(&self) -> HidResult<()> {
        match self.tx.try_send(self.report.snapshot()) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                Err(HidError::QueueFull)
            }
            Err(TrySendError::Disconnected(_)) => Err(HidError::Disconnected),
        }
    }
}

/// Handle to the thread that owns the [`ReportWriter`].
#[derive(Debug)]
pub struct ReportThread {
    running: Arc<AtomicBool>,
    dropped: Arc<AtomicU64>,
    handle: Option<JoinHandle<()>>,
}

impl ReportThread {
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Drain the queue and join the thread.
    ///
    /// # Errors
    ///
    /// [`HidError::ReportThreadPanicked`] if the writer panicked.
    pub fn join(mut self) -> HidResult<()> {
        self.shutdown()
    }

    fn shutdown(&mut self) -> HidResult<()> {
        self.running.store(false, Ordering::Release);
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        if handle.join().is_err() {
            return Err(HidError::ReportThreadPanicked);
        }
        info!(
            dropped = self.dropped.load(Ordering::Relaxed),
            "Report thread stopped"
        );
        Ok(())
    }
}

impl Drop for ReportThread {
    fn drop(&mut self) {
        if let Err(e) = self.shutdown() {
            warn!(error = %e, "Report thread did not stop cleanly");
        }
    }
}

/// Start the report thread for `report`.
///
/// The thread is named `"{name}-report"`. It exits once [`ReportThread::join`]
/// is called and the queue is empty, or when every [`QueuedSink`] is gone.
///
/// # Errors
///
/// The thread could not be spawned.
pub fn spawn_report_thread<W: ReportWriter + 'static>(
    report: Arc<JoystickReport<W>>,
    name: &str,
    capacity: usize,
) -> std::io::Result<(QueuedSink<W>, ReportThread)> {
    let (tx, rx) = channel::bounded(capacity.max(1));
    let running = Arc::new(AtomicBool::new(true));
    let dropped = Arc::new(AtomicU64::new(0));

    let thread_report = Arc::clone(&report);
    let thread_running = Arc::clone(&running);
    let handle = thread::Builder::new()
        .name(format!("{name}-report"))
        .spawn(move || report_thread_main(&thread_report, &rx, &thread_running))?;

    let sink = QueuedSink {
        report,
        tx,
        dropped: Arc::clone(&dropped),
    };
    let thread = ReportThread {
        running,
        dropped,
        handle: Some(handle),
    };
    Ok((sink, thread))
}

fn report_thread_main<W: ReportWriter>(
    report: &JoystickReport<W>,
    rx: &Receiver<ReportSnapshot>,
    running: &AtomicBool,
) {
    debug!("Report thread started");
    loop {
        match rx.recv_timeout(REPORT_POLL) {
            Ok(snapshot) => {
                if let Err(e) = report.write_snapshot(&snapshot) {
                    warn!(error = %e, "Report write failed");
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if !running.load(Ordering::Acquire) {
                    break;
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
    debug!("Report thread exiting");
}
