//! MOS 6526 CIA (Complex Interface Adapter).
//!
//! Models the subset of the chip the system wiring depends on: timer A
//! with its 16-bit latch, start and run-mode control, force-load strobe,
//! the port A output register, a pass-through port B input, and the
//! underflow interrupt latch with its read-to-clear acknowledge.
//!
//! The timer decrements once per phase pulse while started. Reaching
//! zero raises the interrupt latch; in continuous mode the counter then
//! reloads from the latch, in one-shot mode it free-runs until software
//! intervenes.

use bitflags::bitflags;
use chipset_core::RegisterFile;

bitflags! {
    /// Control register A bits (`$DC0E`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u8 {
        /// Timer counts while set.
        const START = 0b0000_0001;
        /// One-shot: suppress the automatic reload at zero.
        const RUNMODE = 0b0000_1000;
        /// Strobe: load the timer from the latch immediately.
        const FORCE_LOAD = 0b0001_0000;
    }
}

/// Register keys for the 16-byte register window.
#[derive(Debug, Clone, Copy)]
enum CiaReg {
    PortA,
    PortB,
    TimerLow,
    TimerHigh,
    InterruptControl,
    ControlA,
}

/// Per-tick input sample for the chip.
#[derive(Debug, Clone, Copy, Default)]
pub struct CiaInput {
    /// Register chip-select from the address decoder.
    pub cs: bool,
    /// Register address (low 4 bits of the shared bus address).
    pub addr: u8,
    /// Shared-bus write enable.
    pub we: bool,
    /// Shared-bus write data.
    pub data: u8,
}

/// MOS 6526 chip state.
pub struct Cia {
    regs: RegisterFile<CiaReg>,
    /// Port A output register.
    port_a: u8,
    /// Timer A counter.
    timer: u16,
    /// Timer A reload latch.
    latch_lo: u8,
    latch_hi: u8,
    control: Control,
    /// Timer underflow interrupt latch.
    irq: bool,
}

impl Cia {
    #[must_use]
    pub fn new() -> Self {
        let mut regs = RegisterFile::new(0x00);
        regs.add(0x0, CiaReg::PortA);
        regs.add(0x1, CiaReg::PortB);
        regs.add(0x4, CiaReg::TimerLow);
        regs.add(0x5, CiaReg::TimerHigh);
        regs.add(0xD, CiaReg::InterruptControl);
        regs.add(0xE, CiaReg::ControlA);

        Self {
            regs,
            port_a: 0,
            timer: 0,
            latch_lo: 0,
            latch_hi: 0,
            control: Control::empty(),
            irq: false,
        }
    }

    /// Combinational register readback. `port_b_in` is the value on the
    /// port B pins this tick.
    #[must_use]
    pub fn read(&self, addr: u8, port_b_in: u8) -> u8 {
        self.regs.read(u16::from(addr & 0x0F), |key| match key {
            // Port A pins read back high regardless of the output register.
            CiaReg::PortA => 0xFF,
            CiaReg::PortB => port_b_in,
            CiaReg::TimerLow => (self.timer & 0xFF) as u8,
            CiaReg::TimerHigh => (self.timer >> 8) as u8,
            CiaReg::InterruptControl => u8::from(self.irq) | (u8::from(self.irq) << 7),
            CiaReg::ControlA => self.control.bits(),
        })
    }

    /// Advance the chip by one tick. `phase` is the chip's clock-enable
    /// pulse; the timer and interrupt latch only move on a pulse.
    pub fn tick(&mut self, phase: bool, input: CiaInput) {
        let old_timer = self.timer;
        let old_latch = u16::from(self.latch_lo) | u16::from(self.latch_hi) << 8;
        let write = phase && input.cs && input.we;

        // A reload happens on a force-load strobe, or automatically when
        // the counter has reached zero in continuous run mode.
        let force = write
            && input.addr & 0x0F == 0xE
            && Control::from_bits_truncate(input.data).contains(Control::FORCE_LOAD);
        let reload = force || (!self.control.contains(Control::RUNMODE) && old_timer == 0);

        if phase {
            if reload {
                self.timer = old_latch;
            } else if self.control.contains(Control::START) {
                self.timer = old_timer.wrapping_sub(1);
            }

            if old_timer == 0 {
                self.irq = true;
            } else if input.cs && input.addr & 0x0F == 0xD && !input.we {
                // Reading the interrupt control register acknowledges.
                self.irq = false;
            }
        }

        if write {
            self.regs.write(u16::from(input.addr & 0x0F), |key| match key {
                CiaReg::PortA => self.port_a = input.data,
                CiaReg::TimerLow => self.latch_lo = input.data,
                CiaReg::TimerHigh => self.latch_hi = input.data,
                CiaReg::ControlA => {
                    // FORCE_LOAD is a strobe, not a stored bit.
                    self.control = Control::from_bits_truncate(input.data)
                        .difference(Control::FORCE_LOAD);
                }
                CiaReg::PortB | CiaReg::InterruptControl => {}
            });
        }
    }

    /// Port A output register, as driven onto the pins.
    #[must_use]
    pub fn port_a(&self) -> u8 {
        self.port_a
    }

    /// Interrupt output.
    #[must_use]
    pub fn irq_active(&self) -> bool {
        self.irq
    }

    /// Debug: current timer A count.
    #[must_use]
    pub fn timer(&self) -> u16 {
        self.timer
    }
}

impl Default for Cia {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write(cia: &mut Cia, addr: u8, data: u8) {
        cia.tick(
            true,
            CiaInput {
                cs: true,
                addr,
                we: true,
                data,
            },
        );
    }

    fn idle_ticks(cia: &mut Cia, n: u32) {
        for _ in 0..n {
            cia.tick(true, CiaInput::default());
        }
    }

    #[test]
    fn timer_loads_latch_on_force_load() {
        let mut cia = Cia::new();
        // One-shot first: in continuous mode the power-on counter of 0
        // reloads from the latch on every pulse.
        write(&mut cia, 0xE, 0x08);
        write(&mut cia, 0x4, 0x34);
        write(&mut cia, 0x5, 0x12);
        assert_eq!(cia.timer(), 0);

        write(&mut cia, 0xE, 0x18);
        assert_eq!(cia.timer(), 0x1234);
        // The strobe bit is not stored.
        assert_eq!(cia.read(0xE, 0xFF) & 0x10, 0);
    }

    #[test]
    fn timer_decrements_only_while_started() {
        let mut cia = Cia::new();
        write(&mut cia, 0x4, 0x10);
        write(&mut cia, 0x5, 0x00);
        write(&mut cia, 0xE, 0x10);
        assert_eq!(cia.timer(), 0x10);

        idle_ticks(&mut cia, 4);
        assert_eq!(cia.timer(), 0x10);

        write(&mut cia, 0xE, 0x01);
        idle_ticks(&mut cia, 4);
        assert_eq!(cia.timer(), 0x0C);
    }

    #[test]
    fn timer_reloads_from_latch_at_zero() {
        let mut cia = Cia::new();
        write(&mut cia, 0x4, 0x03);
        write(&mut cia, 0x5, 0x00);
        write(&mut cia, 0xE, 0x11);
        assert_eq!(cia.timer(), 3);

        idle_ticks(&mut cia, 3);
        assert_eq!(cia.timer(), 0);
        idle_ticks(&mut cia, 1);
        assert_eq!(cia.timer(), 3);
    }

    /// Acknowledge tick: a selected, non-write access to reg 0xD.
    fn ack_irq(cia: &mut Cia) {
        cia.tick(
            true,
            CiaInput {
                cs: true,
                addr: 0xD,
                we: false,
                data: 0,
            },
        );
    }

    #[test]
    fn underflow_raises_irq_read_acknowledges() {
        let mut cia = Cia::new();
        write(&mut cia, 0x4, 0x02);
        write(&mut cia, 0x5, 0x00);
        write(&mut cia, 0xE, 0x11);
        // The counter powers on at zero, so the latch is already set;
        // clear it now that the counter is nonzero.
        ack_irq(&mut cia);
        assert!(!cia.irq_active());

        idle_ticks(&mut cia, 3);
        assert!(cia.irq_active());
        assert_eq!(cia.read(0xD, 0xFF), 0x81);

        // The acknowledge is the read access itself, sampled on a pulse.
        ack_irq(&mut cia);
        assert!(!cia.irq_active());
        assert_eq!(cia.read(0xD, 0xFF), 0x00);
    }

    #[test]
    fn power_on_latch_holds_while_counter_is_zero() {
        let mut cia = Cia::new();
        idle_ticks(&mut cia, 1);
        assert!(cia.irq_active());
        // While the counter sits at zero the set wins over the
        // acknowledge every pulse.
        ack_irq(&mut cia);
        assert!(cia.irq_active());

        // Park the counter on a nonzero value; now the acknowledge
        // sticks.
        write(&mut cia, 0x4, 0xFF);
        write(&mut cia, 0xE, 0x10);
        ack_irq(&mut cia);
        assert!(!cia.irq_active());
        assert_eq!(cia.timer(), 0x00FF);
    }

    #[test]
    fn one_shot_reload_is_suppressed() {
        let mut cia = Cia::new();
        write(&mut cia, 0x4, 0x02);
        write(&mut cia, 0x5, 0x00);
        write(&mut cia, 0xE, 0x19); // one-shot, force load, start
        assert_eq!(cia.timer(), 2);

        idle_ticks(&mut cia, 3);
        // In one-shot mode the counter wraps instead of reloading.
        assert_eq!(cia.timer(), 0xFFFF);
        assert!(cia.irq_active());
    }

    #[test]
    fn nothing_moves_without_a_phase_pulse() {
        let mut cia = Cia::new();
        write(&mut cia, 0x4, 0x05);
        write(&mut cia, 0xE, 0x11);
        let before = cia.timer();
        for _ in 0..8 {
            cia.tick(false, CiaInput::default());
        }
        assert_eq!(cia.timer(), before);
    }

    #[test]
    fn port_registers_and_passthrough() {
        let mut cia = Cia::new();
        write(&mut cia, 0x0, 0xFD);
        assert_eq!(cia.port_a(), 0xFD);
        // Port A pins read high; port B reflects the pin input.
        assert_eq!(cia.read(0x0, 0xFF), 0xFF);
        assert_eq!(cia.read(0x1, 0x7E), 0x7E);
    }

    #[test]
    fn unmapped_registers_read_zero() {
        let cia = Cia::new();
        assert_eq!(cia.read(0x2, 0xFF), 0x00);
        assert_eq!(cia.read(0xF, 0xFF), 0x00);
    }
}
