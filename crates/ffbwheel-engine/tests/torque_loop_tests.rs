//! End-to-end behaviour of the torque loop against the simulated motor.

#![allow(clippy::panic_in_result_fn)]

use std::sync::Arc;
use std::time::{Duration, Instant};

use ffbwheel_engine::prelude::*;
use ffbwheel_filters::{FULL_SCALE, IdleTransition};
use ffbwheel_hid::mock::RecordingSink;
use proptest::prelude::*;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Rig {
    motor: SimulatedMotor,
    hid: RecordingSink,
    store: Arc<MemorySettingsStore>,
    torque_loop: TorqueLoop,
    start: Instant,
}

impl Rig {
    fn new(settings: Settings) -> Result<Self, Box<dyn std::error::Error>> {
        let motor = SimulatedMotor::default();
        let hid = RecordingSink::new();
        let store = Arc::new(MemorySettingsStore::new(settings));
        let start = Instant::now();
        let mut torque_loop = TorqueLoop::new(
            Box::new(motor.clone()),
            Box::new(NoEffects),
            Arc::new(hid.clone()),
            store.subscribe(),
            LoopConfig::default(),
            start,
        );
        torque_loop.initialize()?;
        Ok(Self {
            motor,
            hid,
            store,
            torque_loop,
            start,
        })
    }

    fn at(&self, ms: u64) -> Instant {
        self.start + Duration::from_millis(ms)
    }
}

#[test]
fn test_startup_ramp_is_monotone_and_reaches_unramped() -> TestResult {
    let mut rig = Rig::new(Settings::default())?;
    rig.motor.hold(5000);

    let mut last = 0;
    for tick in 1..=300u64 {
        let report = rig.torque_loop.step(rig.at(tick))?;
        let magnitude = i32::from(report.command).abs();
        assert!(magnitude >= last, "tick {tick}: {magnitude} < {last}");
        last = magnitude;
    }

    let unramped = rig
        .torque_loop
        .compute(MotorState { angle: 5000, velocity: 0 }, 0)
        .torque;
    assert_ne!(unramped, 0);
    assert_eq!(i32::from(rig.motor.last_torque()), unramped);

    let report = rig.torque_loop.step(rig.at(301))?;
    assert_eq!(i32::from(report.command), unramped);
    Ok(())
}

#[test]
fn test_centred_wheel_at_1080_commands_zero() -> TestResult {
    let mut rig = Rig::new(Settings::default().with_lock(LockToLock::D1080))?;
    rig.motor.hold(0);
    for tick in 1..=300 {
        let report = rig.torque_loop.step(rig.at(tick))?;
        assert_eq!(report.command, 0);
    }
    assert_eq!(rig.torque_loop.state().tick_count, 300);
    assert_eq!(rig.motor.last_torque(), 0);
    Ok(())
}

#[test]
fn test_idle_wheel_sleeps_then_wakes() -> TestResult {
    let mut rig = Rig::new(Settings::default())?;
    rig.motor.hold(1000);

    let first = rig.torque_loop.step(rig.at(1))?;
    assert_eq!(first.transition, None);
    assert_eq!(rig.torque_loop.state().last_active_time(), rig.at(1));

    // still inside the timeout
    let report = rig.torque_loop.step(rig.at(10_001))?;
    assert_eq!(report.transition, None);

    let report = rig.torque_loop.step(rig.at(10_002))?;
    assert_eq!(report.transition, Some(IdleTransition::EnteredSleep));
    assert!(rig.torque_loop.state().sleeping());
    assert_eq!(rig.torque_loop.state().last_active_time(), rig.at(10_002));
    // the entering tick still used the awake state
    assert_ne!(report.command, 0);

    let report = rig.torque_loop.step(rig.at(10_003))?;
    assert_eq!(report.command, 0);
    assert_eq!(rig.motor.last_torque(), 0);

    // small movement stays asleep
    rig.motor.hold(1300);
    let report = rig.torque_loop.step(rig.at(10_004))?;
    assert_eq!(report.transition, None);
    assert_eq!(report.command, 0);

    rig.motor.hold(1700);
    let report = rig.torque_loop.step(rig.at(10_005))?;
    assert_eq!(report.transition, Some(IdleTransition::Woke));
    assert!(!rig.torque_loop.state().sleeping());

    let report = rig.torque_loop.step(rig.at(10_006))?;
    assert_ne!(report.command, 0);

    let counters = rig.torque_loop.counters().snapshot();
    assert_eq!(counters.sleep_entries, 1);
    assert_eq!(counters.wakeups, 1);
    Ok(())
}

#[test]
fn test_reports_keep_flowing_while_asleep() -> TestResult {
    let mut rig = Rig::new(Settings::default())?;
    rig.motor.hold(0);
    rig.torque_loop.step(rig.at(1))?;
    let asleep = rig.torque_loop.step(rig.at(10_500))?;
    assert_eq!(asleep.transition, Some(IdleTransition::EnteredSleep));

    let before = rig.hid.flushed().len();
    for tick in 0..20 {
        rig.torque_loop.step(rig.at(10_501 + tick))?;
    }
    assert_eq!(rig.hid.flushed().len(), before + 2);
    Ok(())
}

#[tokio::test]
async fn test_saved_settings_reach_the_next_tick() -> TestResult {
    let mut rig = Rig::new(Settings::default())?;
    rig.motor.hold(12_000);
    let narrow = rig.torque_loop.step(rig.at(1))?.output.reported_angle;

    rig.store
        .save(Settings::default().with_lock(LockToLock::D1080))
        .await?;
    let wide = rig.torque_loop.step(rig.at(2))?.output.reported_angle;

    assert!(wide < narrow);
    assert_eq!(rig.torque_loop.derived().lock, LockToLock::D1080);
    assert_eq!(rig.torque_loop.state().tick_count, 2);
    Ok(())
}

#[test]
fn test_host_effect_is_subtracted() -> TestResult {
    let motor = SimulatedMotor::default();
    motor.hold(0);
    let hid = RecordingSink::new();
    let store = MemorySettingsStore::default();
    let force = ConstantForce::new(1200);
    let mut torque_loop = TorqueLoop::new(
        Box::new(motor.clone()),
        Box::new(force.clone()),
        Arc::new(hid),
        store.subscribe(),
        LoopConfig::default(),
        Instant::now(),
    );
    torque_loop.initialize()?;
    let output = torque_loop.compute(MotorState::default(), force.level());
    assert_eq!(output.torque, -1200);
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn prop_reported_angle_is_clamped(raw in any::<i32>(), lock in 0usize..5) {
        let ladder = LockToLock::LADDER;
        let lock = *ladder.get(lock).ok_or_else(|| TestCaseError::fail("lock index"))?;
        let mut rig = Rig::new(Settings::default().with_lock(lock))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        rig.motor.hold(raw);
        let report = rig.torque_loop.step(rig.at(1))
            .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let shown = rig.hid.state().axis(0).unwrap_or(i32::MIN);
        prop_assert!((-FULL_SCALE..=FULL_SCALE).contains(&shown));
        prop_assert_eq!(shown, report.output.angle.clamp(-FULL_SCALE, FULL_SCALE));
        prop_assert_eq!(rig.hid.state().axis(5), Some(shown));
    }

    #[test]
    fn prop_compute_is_pure(
        angle in -100_000i32..100_000,
        velocity in -2_000i32..2_000,
        host in -40_000i32..40_000,
    ) {
        let rig = Rig::new(Settings {
            cogging_cancel_gain: 40,
            viscosity_gain: 12,
            soft_lock_gain: 8,
            ..Settings::default()
        })
        .map_err(|e| TestCaseError::fail(e.to_string()))?;
        let sample = MotorState { angle, velocity };
        let first = rig.torque_loop.compute(sample, host);
        let second = rig.torque_loop.compute(sample, host);
        prop_assert_eq!(first, second);
        prop_assert_eq!(rig.torque_loop.state().tick_count, 0);
        prop_assert_eq!(rig.motor.writes(), 0);
    }
}
