//! Board memory: 64 KiB of RAM, the three mask ROMs, and the 1 KiB
//! color nybble RAM that feeds the video chip's upper data bits.

use thiserror::Error;

/// KERNAL and BASIC ROM size.
const ROM_8K: usize = 8192;
/// Character generator ROM size.
const ROM_4K: usize = 4096;

#[derive(Debug, Error)]
pub enum RomError {
    #[error("KERNAL ROM must be {ROM_8K} bytes, got {0}")]
    KernalSize(usize),
    #[error("BASIC ROM must be {ROM_8K} bytes, got {0}")]
    BasicSize(usize),
    #[error("character ROM must be {ROM_4K} bytes, got {0}")]
    CharSize(usize),
}

pub struct Memory {
    ram: Box<[u8; 0x10000]>,
    kernal_rom: Vec<u8>,
    basic_rom: Vec<u8>,
    char_rom: Vec<u8>,
    color_ram: [u8; 1024],
}

impl Memory {
    /// Build board memory from ROM images. RAM and color RAM start
    /// zeroed.
    pub fn new(kernal: Vec<u8>, basic: Vec<u8>, chargen: Vec<u8>) -> Result<Self, RomError> {
        if kernal.len() != ROM_8K {
            return Err(RomError::KernalSize(kernal.len()));
        }
        if basic.len() != ROM_8K {
            return Err(RomError::BasicSize(basic.len()));
        }
        if chargen.len() != ROM_4K {
            return Err(RomError::CharSize(chargen.len()));
        }
        Ok(Self {
            ram: Box::new([0; 0x10000]),
            kernal_rom: kernal,
            basic_rom: basic,
            char_rom: chargen,
            color_ram: [0; 1024],
        })
    }

    #[must_use]
    pub fn ram(&self, addr: u16) -> u8 {
        self.ram[usize::from(addr)]
    }

    pub fn write_ram(&mut self, addr: u16, value: u8) {
        self.ram[usize::from(addr)] = value;
    }

    /// KERNAL ROM byte; the ROM occupies an 8 KiB window.
    #[must_use]
    pub fn kernal(&self, addr: u16) -> u8 {
        self.kernal_rom[usize::from(addr) & (ROM_8K - 1)]
    }

    /// BASIC ROM byte; the ROM occupies an 8 KiB window.
    #[must_use]
    pub fn basic(&self, addr: u16) -> u8 {
        self.basic_rom[usize::from(addr) & (ROM_8K - 1)]
    }

    /// Character ROM byte; the ROM occupies a 4 KiB window.
    #[must_use]
    pub fn chargen(&self, addr: u16) -> u8 {
        self.char_rom[usize::from(addr) & (ROM_4K - 1)]
    }

    /// Color RAM nybble. Only the low 10 address bits decode; only the
    /// low 4 data bits exist.
    #[must_use]
    pub fn color(&self, addr: u16) -> u8 {
        self.color_ram[usize::from(addr) & 0x3FF]
    }

    pub fn write_color(&mut self, addr: u16, value: u8) {
        self.color_ram[usize::from(addr) & 0x3FF] = value & 0x0F;
    }
}
