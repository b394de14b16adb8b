//! Motor driver link.
//!
//! The torque loop talks to the motor driver through [`MotorLink`]. The
//! fieldbus framing lives behind the trait; [`SimulatedMotor`] provides a
//! small inertia/friction model with fault injection for running and testing
//! without hardware.

use std::collections::VecDeque;
use std::sync::Arc;

use ffbwheel_errors::{TransportError, TransportResult};
use parking_lot::Mutex;

/// One encoder sample from the motor driver.
#[repr(C)]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MotorState {
    /// Raw encoder position, 32768 counts per revolution
    pub angle: i32,
    /// Raw encoder rate
    pub velocity: i32,
}

/// Encoder counts per revolution.
pub const COUNTS_PER_REV: f64 = 32768.0;

/// Capability interface to the motor driver.
///
/// All methods must return promptly; they run on the torque thread.
pub trait MotorLink: Send {
    /// (Re)initialise the driver with the neutral offset in degrees.
    fn configure(&mut self, neutral_offset_degrees: f32) -> TransportResult;

    fn read_state(&mut self) -> TransportResult<MotorState>;

    fn write_torque(&mut self, torque: i16) -> TransportResult;
}

impl<T: MotorLink + ?Sized> MotorLink for Box<T> {
    fn configure(&mut self, neutral_offset_degrees: f32) -> TransportResult {
        (**self).configure(neutral_offset_degrees)
    }

    fn read_state(&mut self) -> TransportResult<MotorState> {
        (**self).read_state()
    }

    fn write_torque(&mut self, torque: i16) -> TransportResult {
        (**self).write_torque(torque)
    }
}

/// Physical parameters of the simulated wheel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedMotorConfig {
    /// Torque units per count/tick² of acceleration
    pub inertia: f64,
    /// Fraction of velocity lost per tick
    pub friction: f64,
    /// Raw velocity reported per count/tick
    pub velocity_scale: f64,
}

impl Default for SimulatedMotorConfig {
    fn default() -> Self {
        Self {
            inertia: 20_000.0,
            friction: 0.02,
            velocity_scale: 10.0,
        }
    }
}

const HISTORY_LEN: usize = 4096;

#[derive(Debug)]
struct SimState {
    config: SimulatedMotorConfig,
    position: f64,
    velocity: f64,
    neutral_counts: f64,
    torque: i16,
    held: bool,
    configured: bool,
    configure_calls: u64,
    writes: u64,
    history: VecDeque<i16>,
    fail_reads: u32,
    fail_writes: u32,
    reject_configures: u32,
}

/// In-process stand-in for the motor driver.
///
/// Clones share the same simulated wheel, so a test can keep one clone
/// while the torque loop owns another.
#[derive(Debug, Clone)]
pub struct SimulatedMotor {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedMotor {
    pub fn new(config: SimulatedMotorConfig) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SimState {
                config,
                position: 0.0,
                velocity: 0.0,
                neutral_counts: 0.0,
                torque: 0,
                held: false,
                configured: false,
                configure_calls: 0,
                writes: 0,
                history: VecDeque::with_capacity(HISTORY_LEN),
                fail_reads: 0,
                fail_writes: 0,
                reject_configures: 0,
            })),
        }
    }

    /// Pin the wheel at `angle` raw counts, as if held by hand. Torque no
    /// longer moves it until [`release`](Self::release).
    pub fn hold(&self, angle: i32) {
        let mut s = self.inner.lock();
        s.position = f64::from(angle) + s.neutral_counts;
        s.velocity = 0.0;
        s.held = true;
    }

    pub fn release(&self) {
        self.inner.lock().held = false;
    }

    /// Fail the next `n` reads.
    pub fn fail_reads(&self, n: u32) {
        self.inner.lock().fail_reads = n;
    }

    /// Fail the next `n` torque writes.
    pub fn fail_writes(&self, n: u32) {
        self.inner.lock().fail_writes = n;
    }

    /// Reject the next `n` configure calls.
    pub fn reject_configures(&self, n: u32) {
        self.inner.lock().reject_configures = n;
    }

    /// Most recent accepted torque command.
    pub fn last_torque(&self) -> i16 {
        self.inner.lock().torque
    }

    /// Accepted torque writes so far.
    pub fn writes(&self) -> u64 {
        self.inner.lock().writes
    }

    /// Most recent accepted torque commands, oldest first.
    pub fn torque_history(&self) -> Vec<i16> {
        self.inner.lock().history.iter().copied().collect()
    }

    pub fn configure_calls(&self) -> u64 {
        self.inner.lock().configure_calls
    }

    pub fn is_configured(&self) -> bool {
        self.inner.lock().configured
    }
}

impl Default for SimulatedMotor {
    fn default() -> Self {
        Self::new(SimulatedMotorConfig::default())
    }
}

fn saturate_i32(v: f64) -> i32 {
    if v.is_nan() {
        return 0;
    }
    // `as` saturates for out of range floats
    #[allow(clippy::cast_possible_truncation)]
    let out = v.round() as i32;
    out
}

impl MotorLink for SimulatedMotor {
    fn configure(&mut self, neutral_offset_degrees: f32) -> TransportResult {
        let mut s = self.inner.lock();
        s.configure_calls = s.configure_calls.saturating_add(1);
        if s.reject_configures > 0 {
            s.reject_configures -= 1;
            s.configured = false;
            return Err(TransportError::ConfigureRejected);
        }
        s.neutral_counts = f64::from(neutral_offset_degrees) * COUNTS_PER_REV / 360.0;
        s.configured = true;
        Ok(())
    }

    fn read_state(&mut self) -> TransportResult<MotorState> {
        let mut s = self.inner.lock();
        if s.fail_reads > 0 {
            s.fail_reads -= 1;
            return Err(TransportError::ReadFailed);
        }
        if !s.held {
            let accel = f64::from(s.torque) / s.config.inertia;
            s.velocity = s.velocity * (1.0 - s.config.friction) + accel;
            s.position += s.velocity;
        }
        Ok(MotorState {
            angle: saturate_i32(s.position - s.neutral_counts),
            velocity: saturate_i32(s.velocity * s.config.velocity_scale),
        })
    }

    fn write_torque(&mut self, torque: i16) -> TransportResult {
        let mut s = self.inner.lock();
        if s.fail_writes > 0 {
            s.fail_writes -= 1;
            return Err(TransportError::WriteFailed);
        }
        if !s.configured {
            return Err(TransportError::Disconnected);
        }
        s.torque = torque;
        s.writes = s.writes.saturating_add(1);
        if s.history.len() == HISTORY_LEN {
            s.history.pop_front();
        }
        s.history.push_back(torque);
        Ok(())
    }
}
