//! C64 board-level glue around the chip crates.
//!
//! Wires the VIC-II and the two CIAs to shared memory through the
//! board's bus arbiter: the clock sequencer splits each bus cycle into a
//! video half and a CPU half, the PLA bank decoder routes CPU addresses
//! to RAM, ROM or I/O, and the arbiter lets the video chip take the
//! whole cycle when it needs extra fetch bandwidth.
//!
//! The CPU itself is external: callers present its pins to
//! [`Chipset::tick`] each master tick and read the returned bus data,
//! ready line and interrupt outputs.

mod bus;
mod clock;
mod keyboard;
mod memory;
mod palette;
mod system;

pub use bus::{decode, IoDevice, Target};
pub use clock::ClockSequencer;
pub use keyboard::KeyboardMatrix;
pub use memory::{Memory, RomError};
pub use palette::PALETTE;
pub use system::{Chipset, CpuPins, TickOutputs};
