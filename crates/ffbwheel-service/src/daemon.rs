//! Task wiring.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::Context;
use ffbwheel_engine::selector::SELECTOR_PERIOD;
use ffbwheel_engine::{
    ConstantForce, CounterSnapshot, FileSettingsStore, ForceEffectEngine, NoEffects,
    SettingsStore, SharedSwitches, ShiftChannelStats, SimulatedMotor, TorqueLoop,
    TorqueLoopRunner, TracingIndicator, run_selector, run_shift_channel,
};
use ffbwheel_hid::{
    DEFAULT_QUEUE_CAPACITY, HidSink, JoystickReport, TracingReportWriter, spawn_report_thread,
};
use ffbwheel_shifter::{ButtonMap, PassThroughMap, ShiftDecoder, ShiftMap};
use tokio::io::AsyncBufRead;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::Args;

/// What the daemon did before it stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonSummary {
    pub counters: CounterSnapshot,
    /// `None` if the shift channel task failed
    pub shift: Option<ShiftChannelStats>,
    /// Reports handed to the writer by the report thread
    pub reports_flushed: u64,
    /// Snapshots dropped because the report queue was full
    pub reports_dropped: u64,
}

/// Read a [`ButtonMap`] from a JSON file, or the default map without one.
///
/// # Errors
///
/// The file could not be read or parsed, or places a button outside the
/// joystick report.
pub async fn load_button_map(path: Option<&Path>) -> anyhow::Result<ButtonMap> {
    let Some(path) = path else {
        return Ok(ButtonMap::default());
    };
    let data = tokio::fs::read(path)
        .await
        .with_context(|| format!("reading button map {}", path.display()))?;
    let map: ButtonMap = serde_json::from_slice(&data)
        .with_context(|| format!("parsing button map {}", path.display()))?;
    map.validate()
        .with_context(|| format!("invalid button map {}", path.display()))?;
    info!(path = %path.display(), gear_base = map.gear_base, "Button map loaded");
    Ok(map)
}

/// Run the controller until `shutdown` completes, reading host axis lines
/// from `input`.
///
/// # Errors
///
/// The settings or button map file could not be loaded, or the torque loop
/// or report threads could not be started or joined.
pub async fn run<R, F>(args: &Args, input: R, shutdown: F) -> anyhow::Result<DaemonSummary>
where
    R: AsyncBufRead + Unpin + Send + 'static,
    F: Future<Output = ()>,
{
    let store = Arc::new(
        FileSettingsStore::open(&args.settings)
            .await
            .with_context(|| format!("opening settings {}", args.settings.display()))?,
    );
    let settings = store.current();
    info!(
        lock = %settings.lock_to_lock,
        neutral = settings.neutral_adjust_degrees,
        "Settings loaded"
    );

    let buttons = load_button_map(args.button_map.as_deref()).await?;

    let runner_config = args.runner_config();
    let report = Arc::new(JoystickReport::new(TracingReportWriter::new()));
    let (queued, report_thread) =
        spawn_report_thread(Arc::clone(&report), &runner_config.name, DEFAULT_QUEUE_CAPACITY)
            .context("starting report thread")?;
    let hid: Arc<dyn HidSink> = Arc::new(queued.clone());

    let effects: Box<dyn ForceEffectEngine> = match args.constant_force {
        Some(level) => Box::new(ConstantForce::new(level)),
        None => Box::new(NoEffects),
    };
    let torque_loop = TorqueLoop::new(
        Box::new(SimulatedMotor::default()),
        effects,
        Arc::clone(&hid),
        store.subscribe(),
        args.loop_config(),
        Instant::now(),
    );
    let mut runner = TorqueLoopRunner::start(torque_loop, runner_config)?;

    let (shutdown_tx, _) = broadcast::channel(1);
    let dyn_store: Arc<dyn SettingsStore> = store.clone();
    let selector = tokio::spawn(run_selector(
        dyn_store,
        SharedSwitches::new(),
        TracingIndicator::new(),
        SELECTOR_PERIOD,
        shutdown_tx.subscribe(),
    ));

    let decoder = ShiftDecoder::new(ShiftMap::new(args.shift_map), buttons)
        .with_latch_sequential(args.latch_sequential);
    let shift = tokio::spawn(run_shift_channel(
        input,
        decoder,
        PassThroughMap::default(),
        Arc::clone(&hid),
        shutdown_tx.subscribe(),
    ));

    info!("ffbwheel controller running");
    shutdown.await;
    info!("Shutting down");

    if shutdown_tx.send(()).is_err() {
        debug!("Tasks already finished");
    }
    if let Err(e) = selector.await {
        warn!(error = %e, "Selector task failed");
    }
    let shift = match shift.await {
        Ok(Ok(stats)) => Some(stats),
        Ok(Err(e)) => {
            warn!(error = %e, "Shift channel read failed");
            None
        }
        Err(e) => {
            warn!(error = %e, "Shift channel task failed");
            None
        }
    };

    // joining the torque thread blocks until its current tick finishes
    let torque_loop = tokio::task::spawn_blocking(move || runner.stop())
        .await
        .context("joining torque loop runner")??;
    let counters = torque_loop.counters().snapshot();
    drop(torque_loop);
    drop(hid);
    tokio::task::spawn_blocking(move || report_thread.join())
        .await
        .context("joining report thread")??;

    let summary = DaemonSummary {
        counters,
        shift,
        reports_flushed: report.flush_count(),
        reports_dropped: queued.dropped(),
    };
    info!(
        ticks = summary.counters.ticks,
        transport_errors = summary.counters.transport_errors(),
        reports = summary.reports_flushed,
        dropped_reports = summary.reports_dropped,
        "ffbwheel controller stopped"
    );
    Ok(summary)
}
