//! Control core of the ffbwheel force-feedback steering wheel
//!
//! # Architecture
//!
//! - [`torque_loop`]: per-tick torque computation, idle gating and angle
//!   reporting. Pure with respect to time; the caller passes `now`.
//! - [`runner`]: drives a [`TorqueLoop`] on a dedicated thread at a fixed
//!   period and forwards faults to a diagnostic thread.
//! - [`selector`]: lock-to-lock selection from two push buttons.
//! - [`shift_task`]: host axis line channel feeding the shifter decoder.
//! - [`store`]: settings persistence and change notification.
//!
//! Collaborators that touch hardware are narrow traits ([`MotorLink`],
//! [`ForceEffectEngine`], [`SwitchBank`], [`Indicator`]) with simulated
//! implementations for running without a wheel.
//!
//! # RT Safety
//!
//! The torque tick performs no allocation and no blocking I/O beyond the
//! motor link itself. Logging from the torque thread goes through a bounded
//! channel drained by the diagnostic thread, and report flushes go through
//! [`ffbwheel_hid::QueuedSink`] to a separate report thread.

#![deny(unsafe_op_in_unsafe_fn, clippy::unwrap_used)]
#![deny(unused_must_use)]

pub mod counters;
pub mod effects;
pub mod motor;
pub mod prelude;
pub mod runner;
pub mod scheduler;
pub mod selector;
pub mod settings;
pub mod shift_task;
pub mod store;
pub mod torque_loop;

pub use counters::{CounterSnapshot, LoopCounters};
pub use effects::{ConstantForce, ForceEffectEngine, NoEffects};
pub use motor::{MotorLink, MotorState, SimulatedMotor, SimulatedMotorConfig};
pub use runner::{DiagnosticSignal, RunnerConfig, RunnerError, TorqueLoopRunner};
pub use scheduler::{Tick, TickScheduler};
pub use selector::{
    Indicator, LockRangeSelector, SharedSwitches, SwitchBank, TracingIndicator, run_selector,
};
pub use settings::{LockToLock, SCHEMA_VERSION, Settings};
pub use shift_task::{ShiftChannelStats, run_shift_channel};
pub use store::{FileSettingsStore, MemorySettingsStore, SettingsStore};
pub use torque_loop::{
    ComputeOutput, DerivedConfig, LoopConfig, TickReport, TorqueLoop, TorqueLoopState,
};
