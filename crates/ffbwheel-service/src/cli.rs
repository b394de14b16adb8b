//! Command line.

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use ffbwheel_engine::{LoopConfig, RunnerConfig};
use ffbwheel_shifter::ShiftLayout;

#[derive(Parser, Debug, Clone)]
#[command(name = "ffbwheeld")]
#[command(about = "Force-feedback steering wheel controller")]
#[command(version)]
pub struct Args {
    /// Settings file, created on the first lock-to-lock change
    #[arg(long, env = "FFBWHEEL_SETTINGS", default_value = "ffbwheel-settings.json")]
    pub settings: PathBuf,

    /// Torque loop period in microseconds
    #[arg(long, default_value_t = 1000, value_parser = clap::value_parser!(u64).range(100..=100_000))]
    pub tick_us: u64,

    /// Flush the joystick report every N torque ticks
    #[arg(long, default_value_t = 10, value_parser = clap::value_parser!(u64).range(1..))]
    pub report_every: u64,

    /// H-pattern gate: 4x3 (8 speed) or 3x3 (6 speed)
    #[arg(long, default_value = "4x3")]
    pub shift_map: ShiftLayout,

    /// JSON file placing gear, sequential and aux buttons in the report.
    /// Missing fields keep their defaults.
    #[arg(long, env = "FFBWHEEL_BUTTON_MAP")]
    pub button_map: Option<PathBuf>,

    /// Disable H-pattern gears for the session once the sequential lever is used
    #[arg(long)]
    pub latch_sequential: bool,

    /// Consecutive failed ticks before the motor driver is reinitialized
    #[arg(long, default_value_t = 100, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_consecutive_faults: u32,

    /// Simulated constant host force
    #[arg(long, allow_hyphen_values = true)]
    pub constant_force: Option<i32>,

    /// Verbose logging
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    pub fn tick_period(&self) -> Duration {
        Duration::from_micros(self.tick_us)
    }

    pub fn loop_config(&self) -> LoopConfig {
        LoopConfig {
            report_every: self.report_every,
            ..LoopConfig::default()
        }
    }

    pub fn runner_config(&self) -> RunnerConfig {
        RunnerConfig {
            tick_period: self.tick_period(),
            max_consecutive_faults: self.max_consecutive_faults,
            ..RunnerConfig::default()
        }
    }

    /// Default log filter when `RUST_LOG` is unset.
    pub fn log_filter(&self) -> String {
        let level = match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        };
        format!("ffbwheel={level}")
    }
}
