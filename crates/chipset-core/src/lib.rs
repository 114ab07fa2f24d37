//! Shared plumbing for the C64 chipset crates.
//!
//! The chipset is a lock-step discrete-time simulation: a high-frequency
//! master tick from which two alternating low-frequency phase pulses are
//! derived. Components receive the phase pulses each tick and commit their
//! registered state once per tick; everything combinational is computed
//! from last-committed state before any commit.

mod regs;

pub use regs::RegisterFile;

/// Low-frequency phase pulses derived from the master tick.
///
/// At most one of `ph1`/`ph2` is asserted per tick; both are clear on the
/// six ticks in between. The video chip owns the shared bus during its
/// half-cycle (the window ending in `ph1`), the CPU during the other.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Phases {
    pub ph1: bool,
    pub ph2: bool,
}

impl Phases {
    /// Either phase pulse is asserted this tick.
    #[must_use]
    pub fn any(self) -> bool {
        self.ph1 || self.ph2
    }
}
