//! Concurrency and property tests for the joystick report.

#![allow(clippy::panic_in_result_fn)]

use std::sync::Arc;
use std::thread;

use ffbwheel_hid::{BUTTON_COUNT, HidResult, HidSink, JoystickReport, ReportSnapshot};
use parking_lot::Mutex;
use proptest::prelude::*;

type Log = Arc<Mutex<Vec<ReportSnapshot>>>;

fn recording_report() -> (Arc<JoystickReport<impl ffbwheel_hid::ReportWriter>>, Log) {
    let log: Log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);
    let report = JoystickReport::new(move |snap: &ReportSnapshot| -> HidResult<()> {
        sink.lock().push(*snap);
        Ok(())
    });
    (Arc::new(report), log)
}

#[test]
fn group_updates_are_never_torn() -> Result<(), Box<dyn std::error::Error>> {
    let (report, log) = recording_report();
    report.set_buttons(&[(10, true)]);

    let writer = {
        let report = Arc::clone(&report);
        thread::spawn(move || {
            for i in 0..2_000usize {
                let (from, to) = if i % 2 == 0 { (10, 11) } else { (11, 10) };
                report.set_buttons(&[(from, false), (to, true)]);
            }
        })
    };

    for _ in 0..500 {
        report.flush()?;
    }
    writer.join().map_err(|_| "writer thread panicked")?;

    for snap in log.lock().iter() {
        let gears = [10, 11].iter().filter(|&&b| snap.button(b)).count();
        assert_eq!(gears, 1, "torn update in {snap:?}");
    }
    Ok(())
}

#[test]
fn axis_writers_do_not_disturb_buttons() -> Result<(), Box<dyn std::error::Error>> {
    let (report, _log) = recording_report();
    report.set_button(3, true);

    let axis_thread = {
        let report = Arc::clone(&report);
        thread::spawn(move || {
            for v in -1000..1000 {
                report.set_axis(0, v);
                report.set_axis(5, v);
            }
        })
    };
    for _ in 0..1000 {
        report.set_button(4, true);
        report.set_button(4, false);
    }
    axis_thread.join().map_err(|_| "axis thread panicked")?;

    let snap = report.snapshot();
    assert!(snap.button(3));
    assert!(!snap.button(4));
    assert_eq!(snap.axis(0), Some(999));
    assert_eq!(snap.axis(0), snap.axis(5));
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(200))]

    #[test]
    fn group_update_matches_sequential_updates(
        initial in any::<u32>(),
        updates in prop::collection::vec((0usize..32, any::<bool>()), 0..12),
    ) {
        let (grouped, _) = recording_report();
        let (sequential, _) = recording_report();
        for i in 0..BUTTON_COUNT {
            let pressed = initial & (1 << i) != 0;
            grouped.set_button(i, pressed);
            sequential.set_button(i, pressed);
        }

        grouped.set_buttons(&updates);
        for &(index, pressed) in &updates {
            sequential.set_button(index, pressed);
        }

        prop_assert_eq!(grouped.snapshot().buttons, sequential.snapshot().buttons);
    }
}
