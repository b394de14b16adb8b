//! ffbwheel controller daemon
//!
//! Wires the torque loop runner, the lock-range selector and the host axis
//! channel around one settings store and one joystick report.

#![deny(unused_must_use)]
#![deny(clippy::unwrap_used)]

pub mod cli;
pub mod daemon;

pub use cli::Args;
pub use daemon::{DaemonSummary, load_button_map, run};
