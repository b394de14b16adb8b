//! Host force effects.
//!
//! The host-side effect engine (constant force, periodic, condition effects
//! driven by the game) is summarised into one torque contribution per tick.

use std::sync::Arc;
use std::sync::atomic::{AtomicI32, Ordering};

/// Source of the host's force-effect contribution.
///
/// Called once per tick on the torque thread; must not block.
pub trait ForceEffectEngine: Send {
    fn compute(&mut self) -> i32;
}

impl<F> ForceEffectEngine for F
where
    F: FnMut() -> i32 + Send,
{
    fn compute(&mut self) -> i32 {
        self()
    }
}

/// No host effects.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoEffects;

impl ForceEffectEngine for NoEffects {
    fn compute(&mut self) -> i32 {
        0
    }
}

/// A constant force that can be changed from any thread.
#[derive(Debug, Clone, Default)]
pub struct ConstantForce {
    level: Arc<AtomicI32>,
}

impl ConstantForce {
    pub fn new(level: i32) -> Self {
        Self {
            level: Arc::new(AtomicI32::new(level)),
        }
    }

    pub fn set(&self, level: i32) {
        self.level.store(level, Ordering::Relaxed);
    }

    pub fn level(&self) -> i32 {
        self.level.load(Ordering::Relaxed)
    }
}

impl ForceEffectEngine for ConstantForce {
    fn compute(&mut self) -> i32 {
        self.level()
    }
}
