//! Prelude for wiring a controller.

pub use crate::{
    ConstantForce, ForceEffectEngine, Indicator, LockRangeSelector, LockToLock, LoopConfig,
    LoopCounters, MemorySettingsStore, MotorLink, MotorState, NoEffects, RunnerConfig, Settings,
    SettingsStore, SimulatedMotor, SwitchBank, TorqueLoop, TorqueLoopRunner, run_selector,
    run_shift_channel,
};
