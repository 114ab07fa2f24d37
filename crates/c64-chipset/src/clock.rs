//! Master clock sequencer.
//!
//! An 8 MHz master tick is divided by eight into the two 1 MHz phase
//! pulses that pace the chips. The VIC-II owns the shared bus during the
//! half-cycle that ends in `ph1`, the CPU during the half ending in
//! `ph2`.

use chipset_core::Phases;

/// Divide-by-eight phase generator and bus-half tracker.
pub struct ClockSequencer {
    /// 3-bit divider. The reset value puts `ph1` three ticks out; bus
    /// ownership settles into its steady alternation one cycle later.
    cntr: u8,
    /// True for the ticks of the video half of the current bus cycle.
    vic_half: bool,
}

impl ClockSequencer {
    #[must_use]
    pub fn new() -> Self {
        Self {
            cntr: 0b101,
            vic_half: false,
        }
    }

    /// Phase pulses for the current tick.
    #[must_use]
    pub fn phases(&self) -> Phases {
        Phases {
            ph1: self.cntr == 0,
            ph2: self.cntr == 4,
        }
    }

    /// Whether the video chip owns the shared bus this tick.
    #[must_use]
    pub fn vic_half(&self) -> bool {
        self.vic_half
    }

    /// Advance one master tick.
    pub fn tick(&mut self) {
        let Phases { ph1, ph2 } = self.phases();
        self.cntr = (self.cntr + 1) & 7;
        // Ownership flips on the tick after each phase pulse.
        if ph1 {
            self.vic_half = false;
        } else if ph2 {
            self.vic_half = true;
        }
    }
}

impl Default for ClockSequencer {
    fn default() -> Self {
        Self::new()
    }
}
