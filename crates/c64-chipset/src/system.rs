//! Whole-board wiring: chips, memory and the shared-bus arbiter.

use mos_cia_6526::{Cia, CiaInput};
use mos_vic_ii::{Vic, VicInput};

use crate::bus::{decode, IoDevice, Target};
use crate::clock::ClockSequencer;
use crate::keyboard::KeyboardMatrix;
use crate::memory::{Memory, RomError};
use crate::palette::PALETTE;

/// CPU pin state presented to the board for one master tick.
#[derive(Debug, Clone, Copy, Default)]
pub struct CpuPins {
    pub addr: u16,
    pub data: u8,
    /// Write enable (inverse of the R/W pin).
    pub we: bool,
    /// On-chip I/O port; the low three bits drive the bank decoder.
    pub port: u8,
}

/// Board outputs sampled combinationally before the tick commits.
#[derive(Debug, Clone, Copy, Default)]
pub struct TickOutputs {
    /// Bus read data as seen by the CPU.
    pub data: u8,
    /// CPU may advance this tick; deasserted while the video chip has
    /// the whole cycle.
    pub rdy: bool,
    pub irq: bool,
    pub nmi: bool,
    /// 4-bit color index from the video chip.
    pub color: u8,
    /// Palette-expanded pixel, `0x00RRGGBB`.
    pub rgb: u32,
    pub hsync: bool,
    pub vsync: bool,
    pub visible: bool,
    pub ph1: bool,
    pub ph2: bool,
}

/// The C64 chipset: everything on the board except the CPU.
pub struct Chipset {
    clock: ClockSequencer,
    vic: Vic,
    cia1: Cia,
    cia2: Cia,
    memory: Memory,
    keyboard: KeyboardMatrix,
}

impl Chipset {
    /// Build the board from the three ROM images.
    pub fn new(kernal: Vec<u8>, basic: Vec<u8>, chargen: Vec<u8>) -> Result<Self, RomError> {
        Ok(Self {
            clock: ClockSequencer::new(),
            vic: Vic::new(),
            cia1: Cia::new(),
            cia2: Cia::new(),
            memory: Memory::new(kernal, basic, chargen)?,
            keyboard: KeyboardMatrix::new(),
        })
    }

    /// Advance the board by one master tick.
    ///
    /// Outputs are computed from pre-tick state; all chip state commits
    /// afterwards, so every component observes the same bus sample.
    pub fn tick(&mut self, cpu: CpuPins) -> TickOutputs {
        let phases = self.clock.phases();
        let vic_req = self.vic.bus_request();
        // The video chip owns its half of every cycle and claims the
        // CPU half too while stealing.
        let vic_drives = self.clock.vic_half() || vic_req.steal;

        // CIA 2 port A supplies the inverted top two address bits of the
        // video chip's 16 KiB bank window.
        let vic_bank = u16::from(!self.cia2.port_a() & 0x03) << 14;
        let bus_addr = if vic_drives {
            vic_req.addr | vic_bank
        } else {
            cpu.addr
        };
        let bus_we = cpu.we && !vic_req.steal && !self.clock.vic_half();

        let target = decode(cpu.addr, cpu.port);

        // The video chip sees the character ROM in two fixed windows of
        // its address space, RAM everywhere else, with the color nybble
        // on its four extra data bits.
        let graphics = match bus_addr {
            0x1000..=0x1FFF | 0x9000..=0x9FFF => self.memory.chargen(bus_addr),
            _ => self.memory.ram(bus_addr),
        };
        let vic_data = u16::from(self.memory.color(bus_addr)) << 8 | u16::from(graphics);

        let cia1_port_b = self.keyboard.scan(self.cia1.port_a());

        let io_addr = (cpu.addr & 0x0F) as u8;
        let data = match target {
            Target::Ram => self.memory.ram(bus_addr),
            Target::BasicRom => self.memory.basic(bus_addr),
            Target::KernalRom => self.memory.kernal(bus_addr),
            Target::CharRom => self.memory.chargen(bus_addr),
            Target::Io(IoDevice::Vic) => self.vic.reg_read((cpu.addr & 0x3F) as u8),
            // The sound chip is not modeled; its window reads zero, as
            // does unpopulated expansion space.
            Target::Io(IoDevice::Sid) | Target::Open => 0x00,
            Target::Io(IoDevice::ColorRam) => self.memory.color(cpu.addr),
            Target::Io(IoDevice::Cia1) => self.cia1.read(io_addr, cia1_port_b),
            // CIA 2 port B (the user port) floats high.
            Target::Io(IoDevice::Cia2) => self.cia2.read(io_addr, 0xFF),
        };

        let video = self.vic.output();
        let outputs = TickOutputs {
            data,
            rdy: phases.ph1 && !vic_req.steal,
            irq: self.cia1.irq_active() || self.vic.irq_active(),
            nmi: self.cia2.irq_active(),
            color: video.color,
            rgb: PALETTE[usize::from(video.color)],
            hsync: video.hsync,
            vsync: video.vsync,
            visible: video.visible,
            ph1: phases.ph1,
            ph2: phases.ph2,
        };

        // Commit phase. Memory writes land on the CPU's phase pulse.
        if phases.ph2 && bus_we {
            match target {
                Target::Ram => self.memory.write_ram(bus_addr, cpu.data),
                Target::Io(IoDevice::ColorRam) => self.memory.write_color(cpu.addr, cpu.data),
                _ => {}
            }
        }

        self.vic.tick(
            phases,
            VicInput {
                data: vic_data,
                reg_cs: target == Target::Io(IoDevice::Vic),
                reg_we: bus_we,
                reg_addr: (cpu.addr & 0x3F) as u8,
                reg_data: cpu.data,
            },
        );
        self.cia1.tick(
            phases.ph2,
            CiaInput {
                cs: target == Target::Io(IoDevice::Cia1),
                addr: io_addr,
                we: bus_we,
                data: cpu.data,
            },
        );
        self.cia2.tick(
            phases.ph2,
            CiaInput {
                cs: target == Target::Io(IoDevice::Cia2),
                addr: io_addr,
                we: bus_we,
                data: cpu.data,
            },
        );
        self.clock.tick();

        outputs
    }

    pub fn keyboard_mut(&mut self) -> &mut KeyboardMatrix {
        &mut self.keyboard
    }

    #[must_use]
    pub fn memory(&self) -> &Memory {
        &self.memory
    }

    pub fn memory_mut(&mut self) -> &mut Memory {
        &mut self.memory
    }

    /// Debug: the video chip, for raster position inspection.
    #[must_use]
    pub fn vic(&self) -> &Vic {
        &self.vic
    }
}
