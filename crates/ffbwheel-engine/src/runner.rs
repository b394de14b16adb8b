//! Drives a [`TorqueLoop`] on a dedicated thread.
//!
//! The torque thread never logs. Everything worth reporting is pushed as a
//! [`DiagnosticSignal`] into a bounded channel with `try_send`; a second
//! thread drains it and logs. When the channel is full the signal is
//! dropped and counted.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use ffbwheel_errors::{CalibrationOverflow, TransportError};
use ffbwheel_filters::IdleTransition;
use ffbwheel_hid::HidError;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::scheduler::DEFAULT_PERIOD;
use crate::{LoopCounters, TickScheduler, TorqueLoop};

/// Consecutive failed ticks before the motor driver is reinitialised.
pub const DEFAULT_MAX_CONSECUTIVE_FAULTS: u32 = 100;

const DIAGNOSTIC_CAPACITY: usize = 1024;
const DIAGNOSTIC_POLL: Duration = Duration::from_millis(250);

#[derive(Debug, Clone)]
pub struct RunnerConfig {
    pub tick_period: Duration,
    pub max_consecutive_faults: u32,
    /// Thread name prefix
    pub name: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            tick_period: DEFAULT_PERIOD,
            max_consecutive_faults: DEFAULT_MAX_CONSECUTIVE_FAULTS,
            name: "ffbwheel".to_string(),
        }
    }
}

/// Events sent from the torque thread to the diagnostic thread.
#[derive(Debug, Clone, PartialEq)]
pub enum DiagnosticSignal {
    ReadFailed(TransportError),
    WriteFailed(TransportError),
    ConfigureFailed(TransportError),
    FlushFailed(HidError),
    Overflow(CalibrationOverflow),
    EnteredSleep { angle: i32 },
    Woke { angle: i32 },
    Reinitialized { after_faults: u32 },
    ReinitFailed(TransportError),
    MissedTicks(u64),
}

#[derive(Error, Debug)]
pub enum RunnerError {
    #[error("failed to spawn {0} thread: {1}")]
    Spawn(&'static str, #[source] std::io::Error),

    #[error("{0} thread panicked")]
    ThreadPanicked(&'static str),

    #[error("runner is not running")]
    NotRunning,
}

/// Owns the torque and diagnostic threads.
#[derive(Debug)]
pub struct TorqueLoopRunner {
    running: Arc<AtomicBool>,
    counters: Arc<LoopCounters>,
    rt_thread: Option<JoinHandle<TorqueLoop>>,
    diagnostic_thread: Option<JoinHandle<()>>,
}

impl TorqueLoopRunner {
    /// Spawn the threads and start ticking. The loop is initialised on the
    /// torque thread before the first tick.
    ///
    /// # Errors
    ///
    /// A thread could not be spawned.
    pub fn start(torque_loop: TorqueLoop, config: RunnerConfig) -> Result<Self, RunnerError> {
        let running = Arc::new(AtomicBool::new(true));
        let counters = Arc::clone(torque_loop.counters());
        let (diagnostic_tx, diagnostic_rx) = channel::bounded(DIAGNOSTIC_CAPACITY);

        let diagnostic_thread = thread::Builder::new()
            .name(format!("{}-diagnostic", config.name))
            .spawn(move || diagnostic_thread_main(diagnostic_rx))
            .map_err(|e| RunnerError::Spawn("diagnostic", e))?;

        let rt_running = Arc::clone(&running);
        let rt_name = format!("{}-torque", config.name);
        let rt_thread = thread::Builder::new()
            .name(rt_name)
            .spawn(move || rt_thread_main(torque_loop, &config, &rt_running, &diagnostic_tx));
        let rt_thread = match rt_thread {
            Ok(handle) => handle,
            Err(e) => {
                // dropping the sender side in the closure ends the diagnostic thread
                if diagnostic_thread.join().is_err() {
                    error!("Diagnostic thread panicked");
                }
                return Err(RunnerError::Spawn("torque", e));
            }
        };

        info!("Torque loop runner started");
        Ok(Self {
            running,
            counters,
            rt_thread: Some(rt_thread),
            diagnostic_thread: Some(diagnostic_thread),
        })
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn counters(&self) -> &Arc<LoopCounters> {
        &self.counters
    }

    /// Stop ticking, command zero torque and join both threads. Returns the
    /// loop so its final state can be inspected.
    ///
    /// # Errors
    ///
    /// [`RunnerError::NotRunning`] on a second call, or a thread panicked.
    pub fn stop(&mut self) -> Result<TorqueLoop, RunnerError> {
        let Some(rt_thread) = self.rt_thread.take() else {
            return Err(RunnerError::NotRunning);
        };

        info!("Stopping torque loop runner");
        self.running.store(false, Ordering::Release);

        let result = match rt_thread.join() {
            Ok(torque_loop) => {
                info!("Torque thread stopped cleanly");
                Ok(torque_loop)
            }
            Err(_) => {
                error!("Torque thread panicked");
                Err(RunnerError::ThreadPanicked("torque"))
            }
        };

        if let Some(diagnostic_thread) = self.diagnostic_thread.take() {
            match diagnostic_thread.join() {
                Ok(()) => info!("Diagnostic thread stopped cleanly"),
                Err(_) => error!("Diagnostic thread panicked"),
            }
        }

        let snapshot = self.counters.snapshot();
        info!(
            ticks = snapshot.ticks,
            missed = snapshot.missed_ticks,
            transport_errors = snapshot.transport_errors(),
            reinitializations = snapshot.reinitializations,
            "Torque loop runner stopped"
        );
        result
    }
}

impl Drop for TorqueLoopRunner {
    fn drop(&mut self) {
        if self.rt_thread.is_some() {
            warn!("Runner dropped while still running - forcing stop");
            if let Err(e) = self.stop() {
                error!("Forced stop failed: {e}");
            }
        }
    }
}

fn emit(tx: &Sender<DiagnosticSignal>, counters: &LoopCounters, signal: DiagnosticSignal) {
    if tx.try_send(signal).is_err() {
        counters.inc_dropped_diagnostic();
    }
}

fn rt_thread_main(
    mut torque_loop: TorqueLoop,
    config: &RunnerConfig,
    running: &AtomicBool,
    diagnostic_tx: &Sender<DiagnosticSignal>,
) -> TorqueLoop {
    let counters = Arc::clone(torque_loop.counters());
    let signal = |s| emit(diagnostic_tx, &counters, s);

    if let Err(e) = torque_loop.initialize() {
        signal(DiagnosticSignal::ConfigureFailed(e));
    }

    let mut scheduler = TickScheduler::new(config.tick_period);
    let mut consecutive_faults: u32 = 0;

    while running.load(Ordering::Acquire) {
        let tick = scheduler.wait_for_tick();
        if tick.missed > 0 {
            counters.add_missed_ticks(tick.missed);
            signal(DiagnosticSignal::MissedTicks(tick.missed));
        }

        match torque_loop.step(Instant::now()) {
            Ok(report) => {
                match report.write_error {
                    Some(e) => {
                        consecutive_faults = consecutive_faults.saturating_add(1);
                        signal(DiagnosticSignal::WriteFailed(e));
                    }
                    None => consecutive_faults = 0,
                }
                if let Some(e) = report.configure_error {
                    signal(DiagnosticSignal::ConfigureFailed(e));
                }
                if let Some(e) = report.flush_error {
                    signal(DiagnosticSignal::FlushFailed(e));
                }
                if let Some(o) = report.output.overflow {
                    signal(DiagnosticSignal::Overflow(o));
                }
                let angle = report.output.angle;
                match report.transition {
                    Some(IdleTransition::EnteredSleep) => {
                        signal(DiagnosticSignal::EnteredSleep { angle });
                    }
                    Some(IdleTransition::Woke) => signal(DiagnosticSignal::Woke { angle }),
                    None => {}
                }
            }
            Err(e) => {
                consecutive_faults = consecutive_faults.saturating_add(1);
                signal(DiagnosticSignal::ReadFailed(e));
            }
        }

        if consecutive_faults >= config.max_consecutive_faults.max(1) {
            match torque_loop.reinitialize() {
                Ok(()) => signal(DiagnosticSignal::Reinitialized {
                    after_faults: consecutive_faults,
                }),
                Err(e) => signal(DiagnosticSignal::ReinitFailed(e)),
            }
            consecutive_faults = 0;
        }
    }

    if let Err(e) = torque_loop.shutdown() {
        signal(DiagnosticSignal::WriteFailed(e));
    }
    torque_loop
}

/// Drains signals until the torque thread drops its sender.
fn diagnostic_thread_main(diagnostic_rx: Receiver<DiagnosticSignal>) {
    info!("Diagnostic thread started");

    loop {
        match diagnostic_rx.recv_timeout(DIAGNOSTIC_POLL) {
            Ok(signal) => log_signal(&signal),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    info!("Diagnostic thread stopping");
}

fn log_signal(signal: &DiagnosticSignal) {
    match signal {
        DiagnosticSignal::ReadFailed(e) => warn!(code = e.code(), "Motor read failed: {e}"),
        DiagnosticSignal::WriteFailed(e) => warn!(code = e.code(), "Torque write failed: {e}"),
        DiagnosticSignal::ConfigureFailed(e) => {
            warn!(code = e.code(), "Motor configure failed: {e}");
        }
        DiagnosticSignal::FlushFailed(e) => warn!("HID report flush failed: {e}"),
        DiagnosticSignal::Overflow(o) => debug!("{o}"),
        DiagnosticSignal::EnteredSleep { angle } => info!(angle, "Wheel idle, torque off"),
        DiagnosticSignal::Woke { angle } => info!(angle, "Wheel moved, torque on"),
        DiagnosticSignal::Reinitialized { after_faults } => {
            warn!(after_faults, "Motor driver reinitialized");
        }
        DiagnosticSignal::ReinitFailed(e) => error!("Motor driver reinitialization failed: {e}"),
        DiagnosticSignal::MissedTicks(n) => debug!(missed = n, "Torque loop missed ticks"),
    }
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;
    use crate::{LoopConfig, MemorySettingsStore, NoEffects, SettingsStore, SimulatedMotor};
    use ffbwheel_hid::mock::RecordingSink;
    use ffbwheel_hid::{
        HidResult, HidSink, JoystickReport, ReportSnapshot, spawn_report_thread,
    };

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    fn build(motor: &SimulatedMotor, hid: &RecordingSink) -> TorqueLoop {
        build_with(motor, Arc::new(hid.clone()))
    }

    fn build_with(motor: &SimulatedMotor, hid: Arc<dyn HidSink>) -> TorqueLoop {
        let store = MemorySettingsStore::default();
        TorqueLoop::new(
            Box::new(motor.clone()),
            Box::new(NoEffects),
            hid,
            store.subscribe(),
            LoopConfig::default(),
            Instant::now(),
        )
    }

    fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
        let deadline = Instant::now() + timeout;
        while Instant::now() < deadline {
            if cond() {
                return true;
            }
            thread::sleep(Duration::from_millis(2));
        }
        cond()
    }

    #[test]
    fn test_start_tick_stop() -> TestResult {
        let motor = SimulatedMotor::default();
        motor.hold(3000);
        let hid = RecordingSink::new();
        let mut runner = TorqueLoopRunner::start(build(&motor, &hid), RunnerConfig::default())?;
        assert!(runner.is_running());

        let counters = Arc::clone(runner.counters());
        assert!(wait_until(Duration::from_secs(2), || counters.snapshot().ticks >= 20));

        let torque_loop = runner.stop()?;
        assert!(!runner.is_running());
        assert!(torque_loop.state().tick_count >= 20);
        assert!(motor.is_configured());
        assert_eq!(motor.last_torque(), 0);
        assert!(!hid.flushed().is_empty());
        assert!(matches!(runner.stop(), Err(RunnerError::NotRunning)));
        Ok(())
    }

    #[test]
    fn test_persistent_faults_trigger_reinit() -> TestResult {
        let motor = SimulatedMotor::default();
        motor.hold(0);
        motor.fail_reads(u32::MAX);
        let hid = RecordingSink::new();
        let config = RunnerConfig {
            max_consecutive_faults: 5,
            ..RunnerConfig::default()
        };
        let mut runner = TorqueLoopRunner::start(build(&motor, &hid), config)?;

        let counters = Arc::clone(runner.counters());
        assert!(wait_until(Duration::from_secs(2), || {
            counters.snapshot().reinitializations >= 2
        }));
        let torque_loop = runner.stop()?;

        let snapshot = counters.snapshot();
        assert!(snapshot.read_errors >= 10);
        assert_eq!(snapshot.ticks, 0);
        assert_eq!(torque_loop.state().tick_count, 0);
        // initial configure plus one per reinitialisation
        assert!(motor.configure_calls() > snapshot.reinitializations);
        Ok(())
    }

    #[test]
    fn test_drop_stops_threads() -> TestResult {
        let motor = SimulatedMotor::default();
        motor.hold(0);
        let hid = RecordingSink::new();
        {
            let runner = TorqueLoopRunner::start(build(&motor, &hid), RunnerConfig::default())?;
            let counters = Arc::clone(runner.counters());
            assert!(wait_until(Duration::from_secs(2), || counters.snapshot().ticks > 0));
        }
        let writes = motor.writes();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(motor.writes(), writes);
        Ok(())
    }

    #[test]
    fn test_report_writer_stays_off_torque_thread() -> TestResult {
        let names = Arc::new(parking_lot::Mutex::new(Vec::new()));
        let seen = Arc::clone(&names);
        let report = Arc::new(JoystickReport::new(
            move |_: &ReportSnapshot| -> HidResult<()> {
                let name = thread::current().name().map(str::to_string);
                seen.lock().push(name);
                Ok(())
            },
        ));
        let (sink, report_thread) = spawn_report_thread(Arc::clone(&report), "wheel", 8)?;

        let motor = SimulatedMotor::default();
        motor.hold(1500);
        let config = RunnerConfig {
            name: "wheel".to_string(),
            ..RunnerConfig::default()
        };
        let mut runner = TorqueLoopRunner::start(build_with(&motor, Arc::new(sink)), config)?;
        let counters = Arc::clone(runner.counters());
        assert!(wait_until(Duration::from_secs(2), || {
            counters.snapshot().reports_sent >= 3
        }));
        drop(runner.stop()?);
        report_thread.join()?;

        let names = names.lock();
        assert!(!names.is_empty());
        for name in names.iter() {
            assert_eq!(name.as_deref(), Some("wheel-report"));
            assert!(!name.as_deref().unwrap_or("").ends_with("-torque"));
        }
        assert_eq!(report.flush_count(), names.len() as u64);
        Ok(())
    }
}
