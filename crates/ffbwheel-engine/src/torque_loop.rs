//! Real-time torque control loop.
//!
//! One [`TorqueLoop::step`] is one tick: read the motor, compute the torque
//! from the force model and the host effects, ramp and gate it, send it,
//! update the idle machine and publish the wheel angle.
//!
//! # RT Safety
//!
//! `step` allocates nothing on the success path and never blocks except
//! inside the [`MotorLink`]. Give it a [`QueuedSink`](ffbwheel_hid::QueuedSink)
//! so a flush only copies the report into a bounded queue and the report
//! writer runs on its own thread.

use std::sync::Arc;
use std::time::Instant;

use ffbwheel_errors::{CalibrationOverflow, TransportError, TransportResult};
use ffbwheel_filters::{
    AngleFit, CenteringState, CoggingState, ForceFrame, ForceModel, IdleConfig, IdleMonitor,
    IdleTransition, RampState, SoftLockState, ViscosityState, clamp_full_scale,
    host_effect_filter, normalize_velocity, ramp_filter,
};
use ffbwheel_hid::{HidError, HidSink};
use tokio::sync::watch;

use crate::{ForceEffectEngine, LockToLock, LoopCounters, MotorLink, MotorState, Settings};

/// HID axes that carry the wheel angle.
pub const ANGLE_AXES: [usize; 2] = [0, 5];

/// Ticks between report flushes.
pub const DEFAULT_REPORT_EVERY: u64 = 10;

/// Loop parameters that do not come from user settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopConfig {
    pub ramp: RampState,
    pub idle: IdleConfig,
    /// Flush the HID report every this many ticks. Zero disables flushing.
    pub report_every: u64,
}

impl Default for LoopConfig {
    fn default() -> Self {
        Self {
            ramp: RampState::default(),
            idle: IdleConfig::default(),
            report_every: DEFAULT_REPORT_EVERY,
        }
    }
}

/// Everything the tick needs from one settings snapshot, precomputed.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DerivedConfig {
    pub lock: LockToLock,
    pub fit: AngleFit,
    pub model: ForceModel,
    pub neutral_offset_degrees: f32,
}

impl DerivedConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            lock: settings.lock_to_lock,
            fit: AngleFit::for_lock(settings.lock_to_lock.degrees()),
            model: ForceModel {
                centering: CenteringState::new(settings.max_centering_force),
                cogging: CoggingState::new(settings.cogging_cancel_gain),
                viscosity: ViscosityState::new(settings.viscosity_gain),
                soft_lock: SoftLockState::new(settings.soft_lock_gain),
            },
            neutral_offset_degrees: settings.neutral_adjust_degrees,
        }
    }
}

/// State carried from tick to tick.
#[derive(Debug, Clone, Copy)]
pub struct TorqueLoopState {
    /// Ticks since the last (re)initialisation; drives the startup ramp
    pub tick_count: u64,
    pub idle: IdleMonitor,
}

impl TorqueLoopState {
    pub fn sleeping(&self) -> bool {
        self.idle.is_sleeping()
    }

    pub fn last_active_angle(&self) -> i32 {
        self.idle.last_active_angle()
    }

    pub fn last_active_time(&self) -> Instant {
        self.idle.last_active_time()
    }
}

/// Result of [`TorqueLoop::compute`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputeOutput {
    /// Fitted angle, may exceed full scale past the lock
    pub angle: i32,
    /// Angle as reported to the host, clamped to full scale
    pub reported_angle: i32,
    pub velocity: i32,
    /// Torque before ramp, sleep gating and final clamp
    pub torque: i32,
    /// Last saturation hit while computing, if any
    pub overflow: Option<CalibrationOverflow>,
}

/// What happened during one successful tick.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// `tick_count` after this tick
    pub tick: u64,
    pub output: ComputeOutput,
    /// Torque actually commanded
    pub command: i16,
    pub transition: Option<IdleTransition>,
    /// The torque write failed; the tick still completed
    pub write_error: Option<TransportError>,
    /// A new settings snapshot was applied but the driver rejected it
    pub configure_error: Option<TransportError>,
    pub flushed: bool,
    pub flush_error: Option<HidError>,
}

/// The torque control loop.
pub struct TorqueLoop {
    motor: Box<dyn MotorLink>,
    effects: Box<dyn ForceEffectEngine>,
    hid: Arc<dyn HidSink>,
    settings: watch::Receiver<Settings>,
    derived: DerivedConfig,
    state: TorqueLoopState,
    config: LoopConfig,
    counters: Arc<LoopCounters>,
}

impl std::fmt::Debug for TorqueLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TorqueLoop")
            .field("derived", &self.derived)
            .field("state", &self.state)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl TorqueLoop {
    /// Build the loop from the current settings snapshot. Does not touch the
    /// motor; call [`initialize`](Self::initialize) before the first tick.
    pub fn new(
        motor: Box<dyn MotorLink>,
        effects: Box<dyn ForceEffectEngine>,
        hid: Arc<dyn HidSink>,
        mut settings: watch::Receiver<Settings>,
        config: LoopConfig,
        now: Instant,
    ) -> Self {
        let derived = DerivedConfig::from_settings(&settings.borrow_and_update());
        Self {
            motor,
            effects,
            hid,
            settings,
            derived,
            state: TorqueLoopState {
                tick_count: 0,
                idle: IdleMonitor::new(config.idle, now),
            },
            config,
            counters: Arc::new(LoopCounters::new()),
        }
    }

    /// Share `counters` instead of the loop's own.
    pub fn with_counters(mut self, counters: Arc<LoopCounters>) -> Self {
        self.counters = counters;
        self
    }

    pub fn state(&self) -> &TorqueLoopState {
        &self.state
    }

    pub fn derived(&self) -> &DerivedConfig {
        &self.derived
    }

    pub fn config(&self) -> &LoopConfig {
        &self.config
    }

    pub fn counters(&self) -> &Arc<LoopCounters> {
        &self.counters
    }

    /// Configure the motor driver and restart the ramp.
    ///
    /// # Errors
    ///
    /// The driver's rejection. The ramp is restarted regardless.
    pub fn initialize(&mut self) -> TransportResult {
        self.state.tick_count = 0;
        self.motor
            .configure(self.derived.neutral_offset_degrees)
            .inspect_err(|_| self.counters.inc_configure_error())
    }

    /// [`initialize`](Self::initialize) after repeated link faults. Idle
    /// state is kept.
    ///
    /// # Errors
    ///
    /// The driver's rejection.
    pub fn reinitialize(&mut self) -> TransportResult {
        self.counters.inc_reinitialization();
        self.initialize()
    }

    /// Unramped torque for `sample` under the current settings. Does not
    /// touch any state.
    pub fn compute(&self, sample: MotorState, host_force: i32) -> ComputeOutput {
        let mut overflow = None;
        let mut saturated = |r: Result<i32, CalibrationOverflow>| match r {
            Ok(v) => v,
            Err(e) => {
                overflow = Some(e);
                e.clamped
            }
        };

        let angle = saturated(self.derived.fit.apply(sample.angle));
        let velocity = saturated(normalize_velocity(sample.velocity));
        let mut frame = ForceFrame::new(angle, velocity);
        self.derived.model.apply(&mut frame);
        host_effect_filter(&mut frame, host_force);
        let torque = saturated(frame.output());

        ComputeOutput {
            angle,
            reported_angle: clamp_full_scale(angle),
            velocity,
            torque,
            overflow,
        }
    }

    /// Run one tick at time `now`.
    ///
    /// # Errors
    ///
    /// A failed motor read. The tick is abandoned and no state changes.
    /// A failed torque write is reported in [`TickReport::write_error`]
    /// instead, because the rest of the tick still runs.
    pub fn step(&mut self, now: Instant) -> Result<TickReport, TransportError> {
        let configure_error = self.apply_pending_settings();

        let sample = self
            .motor
            .read_state()
            .inspect_err(|_| self.counters.inc_read_error())?;

        let host_force = self.effects.compute();
        let output = self.compute(sample, host_force);
        if output.overflow.is_some() {
            self.counters.inc_overflow();
        }

        self.state.tick_count = self.state.tick_count.saturating_add(1);
        let tick = self.state.tick_count;
        let ramped = ramp_filter(output.torque, tick, &self.config.ramp);
        let gated = if self.state.idle.is_sleeping() { 0 } else { ramped };
        let command = i16::try_from(clamp_full_scale(gated)).unwrap_or(0);

        let write_error = self.motor.write_torque(command).err();
        if write_error.is_some() {
            self.counters.inc_write_error();
        }

        let transition = self.state.idle.update(output.angle, now);
        match transition {
            Some(IdleTransition::EnteredSleep) => self.counters.inc_sleep_entry(),
            Some(IdleTransition::Woke) => self.counters.inc_wakeup(),
            None => {}
        }

        for axis in ANGLE_AXES {
            self.hid.set_axis(axis, output.reported_angle);
        }
        let (flushed, flush_error) = self.flush_if_due(tick);

        self.counters.inc_tick();
        Ok(TickReport {
            tick,
            output,
            command,
            transition,
            write_error,
            configure_error,
            flushed,
            flush_error,
        })
    }

    /// Command zero torque, e.g. before shutting down.
    ///
    /// # Errors
    ///
    /// The write failure.
    pub fn shutdown(&mut self) -> TransportResult {
        self.motor.write_torque(0)
    }

    fn apply_pending_settings(&mut self) -> Option<TransportError> {
        // A closed channel keeps the last snapshot in effect.
        if !self.settings.has_changed().unwrap_or(false) {
            return None;
        }
        self.derived = DerivedConfig::from_settings(&self.settings.borrow_and_update());
        self.motor
            .configure(self.derived.neutral_offset_degrees)
            .inspect_err(|_| self.counters.inc_configure_error())
            .err()
    }

    fn flush_if_due(&self, tick: u64) -> (bool, Option<HidError>) {
        let due = tick
            .checked_rem(self.config.report_every)
            .is_some_and(|r| r == 0);
        if !due {
            return (false, None);
        }
        match self.hid.flush() {
            Ok(()) => {
                self.counters.inc_report_sent();
                (true, None)
            }
            Err(e) => {
                self.counters.inc_hid_flush_error();
                (false, Some(e))
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic_in_result_fn)]
mod tests {
    use super::*;
    use crate::{MemorySettingsStore, NoEffects, SettingsStore, SimulatedMotor};
    use ffbwheel_filters::FULL_SCALE;
    use ffbwheel_hid::mock::RecordingSink;
    use std::time::Duration;

    type TestResult = Result<(), Box<dyn std::error::Error>>;

    struct Rig {
        motor: SimulatedMotor,
        hid: RecordingSink,
        store: MemorySettingsStore,
        torque_loop: TorqueLoop,
        start: Instant,
    }

    fn rig(settings: Settings) -> Rig {
        let motor = SimulatedMotor::default();
        let hid = RecordingSink::new();
        let store = MemorySettingsStore::new(settings);
        let start = Instant::now();
        let torque_loop = TorqueLoop::new(
            Box::new(motor.clone()),
            Box::new(NoEffects),
            Arc::new(hid.clone()),
            store.subscribe(),
            LoopConfig::default(),
            start,
        );
        Rig {
            motor,
            hid,
            store,
            torque_loop,
            start,
        }
    }

    fn ms(start: Instant, ms: u64) -> Instant {
        start + Duration::from_millis(ms)
    }

    #[test]
    fn test_read_failure_leaves_state_untouched() -> TestResult {
        let mut r = rig(Settings::default());
        r.torque_loop.initialize()?;
        r.motor.hold(1000);
        r.torque_loop.step(ms(r.start, 1))?;
        let before = *r.torque_loop.state();

        r.motor.fail_reads(1);
        assert_eq!(
            r.torque_loop.step(ms(r.start, 20_000)),
            Err(TransportError::ReadFailed)
        );
        let after = r.torque_loop.state();
        assert_eq!(after.tick_count, before.tick_count);
        assert_eq!(after.sleeping(), before.sleeping());
        assert_eq!(after.last_active_time(), before.last_active_time());
        assert_eq!(r.motor.writes(), 1);
        assert_eq!(r.torque_loop.counters().snapshot().read_errors, 1);
        Ok(())
    }

    #[test]
    fn test_write_failure_is_reported_and_tick_completes() -> TestResult {
        let mut r = rig(Settings::default());
        r.torque_loop.initialize()?;
        r.motor.hold(0);
        r.motor.fail_writes(1);
        let report = r.torque_loop.step(ms(r.start, 1))?;
        assert_eq!(report.write_error, Some(TransportError::WriteFailed));
        assert_eq!(report.tick, 1);
        assert_eq!(r.hid.state().axis(0), Some(0));
        assert_eq!(r.torque_loop.counters().snapshot().write_errors, 1);
        Ok(())
    }

    #[test]
    fn test_reported_angle_is_mirrored_and_clamped() -> TestResult {
        let mut r = rig(Settings::default().with_lock(LockToLock::D180));
        r.torque_loop.initialize()?;
        r.motor.hold(-20_000);
        let report = r.torque_loop.step(ms(r.start, 1))?;
        assert!(report.output.angle < -FULL_SCALE);
        let state = r.hid.state();
        assert_eq!(state.axis(0), Some(-FULL_SCALE));
        assert_eq!(state.axis(5), Some(-FULL_SCALE));
        Ok(())
    }

    #[tokio::test]
    async fn test_settings_change_reconfigures_without_reset() -> TestResult {
        let mut r = rig(Settings::default());
        r.torque_loop.initialize()?;
        r.motor.hold(0);
        for i in 1..=5 {
            r.torque_loop.step(ms(r.start, i))?;
        }
        let settings = Settings {
            neutral_adjust_degrees: 2.5,
            ..Settings::default().with_lock(LockToLock::D1080)
        };
        r.store.save(settings).await?;

        let report = r.torque_loop.step(ms(r.start, 6))?;
        assert_eq!(report.tick, 6);
        assert_eq!(report.configure_error, None);
        assert_eq!(r.torque_loop.derived().lock, LockToLock::D1080);
        assert_eq!(r.motor.configure_calls(), 2);
        Ok(())
    }

    #[tokio::test]
    async fn test_rejected_configure_is_reported() -> TestResult {
        let mut r = rig(Settings::default());
        r.torque_loop.initialize()?;
        r.motor.hold(0);
        r.motor.reject_configures(1);
        r.store
            .save(Settings::default().with_lock(LockToLock::D360))
            .await?;
        let report = r.torque_loop.step(ms(r.start, 1))?;
        assert_eq!(report.configure_error, Some(TransportError::ConfigureRejected));
        // the simulated driver refuses torque until configured again
        assert_eq!(report.write_error, Some(TransportError::Disconnected));
        assert_eq!(r.torque_loop.derived().lock, LockToLock::D360);
        assert_eq!(r.torque_loop.counters().snapshot().configure_errors, 1);
        Ok(())
    }

    #[test]
    fn test_flush_every_tenth_tick() -> TestResult {
        let mut r = rig(Settings::default());
        r.torque_loop.initialize()?;
        r.motor.hold(0);
        let mut flushed = Vec::new();
        for i in 1..=30 {
            if r.torque_loop.step(ms(r.start, i))?.flushed {
                flushed.push(i);
            }
        }
        assert_eq!(flushed, vec![10, 20, 30]);
        assert_eq!(r.hid.flushed().len(), 3);
        Ok(())
    }

    #[test]
    fn test_flush_error_does_not_abort_tick() -> TestResult {
        let mut r = rig(Settings::default());
        r.torque_loop.initialize()?;
        r.motor.hold(0);
        r.hid.fail_flushes(true);
        for i in 1..=10 {
            let report = r.torque_loop.step(ms(r.start, i))?;
            if i == 10 {
                assert!(report.flush_error.is_some());
            }
        }
        assert_eq!(r.torque_loop.counters().snapshot().hid_flush_errors, 1);
        Ok(())
    }

    #[test]
    fn test_reinitialize_restarts_ramp() -> TestResult {
        let mut r = rig(Settings::default());
        r.torque_loop.initialize()?;
        r.motor.hold(5000);
        for i in 1..=400 {
            r.torque_loop.step(ms(r.start, i))?;
        }
        let full = r.motor.last_torque();
        r.torque_loop.reinitialize()?;
        let report = r.torque_loop.step(ms(r.start, 401))?;
        assert_eq!(report.tick, 1);
        assert!(i32::from(report.command).abs() < i32::from(full).abs());
        assert_eq!(r.torque_loop.counters().snapshot().reinitializations, 1);
        Ok(())
    }

    #[test]
    fn test_shutdown_writes_zero() -> TestResult {
        let mut r = rig(Settings::default());
        r.torque_loop.initialize()?;
        r.motor.hold(5000);
        for i in 1..=400 {
            r.torque_loop.step(ms(r.start, i))?;
        }
        assert_ne!(r.motor.last_torque(), 0);
        r.torque_loop.shutdown()?;
        assert_eq!(r.motor.last_torque(), 0);
        Ok(())
    }
}
