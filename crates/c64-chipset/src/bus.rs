//! PLA bank decoder.
//!
//! The low three bits of the CPU's on-chip port (LORAM, HIRAM, CHAREN)
//! select which of RAM, the ROMs and the I/O window respond in the
//! `$A000-$BFFF`, `$D000-$DFFF` and `$E000-$FFFF` regions. Everything
//! below `$A000` and `$C000-$CFFF` is always RAM.

/// Devices within the `$D000-$DFFF` I/O window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoDevice {
    Vic,
    Sid,
    ColorRam,
    Cia1,
    Cia2,
}

/// What a CPU address resolves to under the current banking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Ram,
    BasicRom,
    KernalRom,
    CharRom,
    Io(IoDevice),
    /// Expansion-port space with nothing plugged in.
    Open,
}

/// Resolve a CPU address. `port` is the CPU's on-chip I/O port; only the
/// low three bits participate.
#[must_use]
pub fn decode(addr: u16, port: u8) -> Target {
    let bank = port & 0b111;
    match addr {
        0xA000..=0xBFFF => match bank {
            0b111 | 0b011 => Target::BasicRom,
            _ => Target::Ram,
        },
        0xD000..=0xDFFF => match bank {
            0b111 | 0b110 | 0b101 => match addr {
                0xD000..=0xD3FF => Target::Io(IoDevice::Vic),
                0xD400..=0xD7FF => Target::Io(IoDevice::Sid),
                0xD800..=0xDBFF => Target::Io(IoDevice::ColorRam),
                0xDC00..=0xDCFF => Target::Io(IoDevice::Cia1),
                0xDD00..=0xDDFF => Target::Io(IoDevice::Cia2),
                _ => Target::Open,
            },
            0b011 | 0b010 | 0b001 => Target::CharRom,
            _ => Target::Ram,
        },
        0xE000..=0xFFFF => match bank {
            0b111 | 0b110 | 0b011 | 0b010 => Target::KernalRom,
            _ => Target::Ram,
        },
        _ => Target::Ram,
    }
}
