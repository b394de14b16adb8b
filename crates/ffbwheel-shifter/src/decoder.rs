//! Gear decoding
//!
//! Each sample set is reduced to one atomic button update: the H-pattern
//! gear buttons, the two sequential buttons and the four aux buttons are
//! written together so the host never sees two gears at once.

use ffbwheel_filters::{FULL_SCALE, LinearFit};
use ffbwheel_hid::HidSink;
use tracing::{debug, info};

use crate::{AxisFrame, ButtonMap, GearState, MAX_GEARS, SHIFT_X, SHIFT_Y, ShiftMap};

/// Bucket index for `raw` on an axis split into `buckets` parts.
///
/// Maps `[-FULL_SCALE, FULL_SCALE]` onto `[0, buckets]` and clamps into
/// `0..buckets`, so the top edge lands in the last bucket.
///
/// ```
/// use ffbwheel_shifter::quantize;
///
/// assert_eq!(quantize(-32767, 4), 0);
/// assert_eq!(quantize(0, 4), 2);
/// assert_eq!(quantize(32767, 4), 3);
/// assert_eq!(quantize(i32::MIN, 3), 0);
/// ```
pub fn quantize(raw: i32, buckets: usize) -> usize {
    let Some(last) = buckets.checked_sub(1) else {
        return 0;
    };
    let full = i64::from(FULL_SCALE);
    let top = i64::try_from(buckets).unwrap_or(i64::MAX);
    let bucket = LinearFit::new(-full, full, 0, top).map_clamped(
        i64::from(raw),
        0,
        i64::try_from(last).unwrap_or(0),
    );
    usize::try_from(bucket).unwrap_or(0)
}

/// Button changes produced by one sample set.
pub type ButtonUpdates = Vec<(usize, bool)>;

/// Stateful shifter decoder.
#[derive(Debug, Clone)]
pub struct ShiftDecoder {
    map: ShiftMap,
    buttons: ButtonMap,
    latch_sequential: bool,
    state: GearState,
}

impl ShiftDecoder {
    pub fn new(map: ShiftMap, buttons: ButtonMap) -> Self {
        Self {
            map,
            buttons,
            latch_sequential: false,
            state: GearState::default(),
        }
    }

    /// Once the sequential lever is used, keep H-pattern gears released for
    /// the rest of the session.
    pub fn with_latch_sequential(mut self, latch: bool) -> Self {
        self.latch_sequential = latch;
        self
    }

    pub fn state(&self) -> &GearState {
        &self.state
    }

    pub fn map(&self) -> &ShiftMap {
        &self.map
    }

    pub fn button_map(&self) -> &ButtonMap {
        &self.buttons
    }

    /// Clear gear and latch.
    pub fn reset(&mut self) {
        self.state.reset();
    }

    /// Gear selected by the H-pattern for this frame.
    pub fn gear_for(&self, frame: &AxisFrame) -> u8 {
        let x = quantize(frame.get(SHIFT_X), self.map.rows());
        let y = quantize(frame.get(SHIFT_Y), self.map.columns());
        self.map.gear_at(x, y)
    }

    /// Update the gear state from `frame` and return the full set of button
    /// levels the decoder owns.
    pub fn decode(&mut self, frame: &AxisFrame) -> ButtonUpdates {
        let gear = self.gear_for(frame);
        if gear != self.state.current_gear {
            debug!(from = self.state.current_gear, to = gear, "Gear changed");
        }
        self.state.current_gear = gear;

        let seq_up = frame.seq_up();
        let seq_down = frame.seq_down() && !seq_up;
        let seq_active = seq_up || seq_down;
        if seq_active && self.latch_sequential && !self.state.latched {
            info!("Sequential shifting latched, H-pattern gears disabled");
            self.state.latched = true;
        }
        self.state.sequential_mode = seq_active || self.state.latched;

        let show_h_gear = !self.state.sequential_mode;
        let mut updates = ButtonUpdates::with_capacity(usize::from(MAX_GEARS) + 6);
        updates.push((self.buttons.seq_up_button, seq_up));
        updates.push((self.buttons.seq_down_button, seq_down));
        for g in 1..=MAX_GEARS {
            if let Some(button) = self.buttons.gear_button(g) {
                updates.push((button, show_h_gear && gear == g));
            }
        }

        let neutral = self.state.is_neutral();
        for aux in &self.buttons.aux {
            let pressed = neutral && frame.get(aux.sample) > self.buttons.aux_threshold;
            updates.push((aux.button, pressed));
        }
        updates
    }

    /// Decode `frame` and publish the result as one atomic update.
    pub fn apply(&mut self, frame: &AxisFrame, sink: &dyn HidSink) {
        let updates = self.decode(frame);
        sink.set_buttons(&updates);
    }
}

impl Default for ShiftDecoder {
    fn default() -> Self {
        Self::new(ShiftMap::default(), ButtonMap::default())
    }
}
