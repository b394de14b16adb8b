//! Lock-free counters shared between the torque thread and observers.
//!
//! # RT Safety
//!
//! Every `inc_*` method is a single relaxed atomic add.

use std::sync::atomic::{AtomicU64, Ordering};

/// Point-in-time copy of [`LoopCounters`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterSnapshot {
    pub ticks: u64,
    pub missed_ticks: u64,
    pub read_errors: u64,
    pub write_errors: u64,
    pub configure_errors: u64,
    pub overflows: u64,
    pub hid_flush_errors: u64,
    pub reports_sent: u64,
    pub reinitializations: u64,
    pub sleep_entries: u64,
    pub wakeups: u64,
    /// Signals dropped because the diagnostic channel was full
    pub dropped_diagnostics: u64,
}

impl CounterSnapshot {
    /// All transport faults of any kind.
    pub fn transport_errors(&self) -> u64 {
        self.read_errors
            .saturating_add(self.write_errors)
            .saturating_add(self.configure_errors)
    }
}

macro_rules! counters {
    (
        $($field:ident => $inc:ident),* $(,)?;
        batched: $($batched:ident),* $(,)?
    ) => {
        /// Torque loop health counters.
        #[derive(Debug, Default)]
        pub struct LoopCounters {
            $($field: AtomicU64,)*
            $($batched: AtomicU64,)*
        }

        impl LoopCounters {
            #[must_use]
            pub const fn new() -> Self {
                Self {
                    $($field: AtomicU64::new(0),)*
                    $($batched: AtomicU64::new(0),)*
                }
            }

            $(
                #[inline]
                pub fn $inc(&self) {
                    self.$field.fetch_add(1, Ordering::Relaxed);
                }
            )*

            pub fn snapshot(&self) -> CounterSnapshot {
                CounterSnapshot {
                    $($field: self.$field.load(Ordering::Relaxed),)*
                    $($batched: self.$batched.load(Ordering::Relaxed),)*
                }
            }
        }
    };
}

counters! {
    ticks => inc_tick,
    read_errors => inc_read_error,
    write_errors => inc_write_error,
    configure_errors => inc_configure_error,
    overflows => inc_overflow,
    hid_flush_errors => inc_hid_flush_error,
    reports_sent => inc_report_sent,
    reinitializations => inc_reinitialization,
    sleep_entries => inc_sleep_entry,
    wakeups => inc_wakeup,
    dropped_diagnostics => inc_dropped_diagnostic;
    batched: missed_ticks,
}

impl LoopCounters {
    /// Add `n` missed ticks at once.
    #[inline]
    pub fn add_missed_ticks(&self, n: u64) {
        self.missed_ticks.fetch_add(n, Ordering::Relaxed);
    }
}
