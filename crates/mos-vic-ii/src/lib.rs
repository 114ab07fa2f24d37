//! VIC-II 6569 (PAL) video chip.
//!
//! Models the chip's internal timing state machine at the pixel-clock
//! rate: raster counters, bad-line detection, the video-matrix line
//! buffer, sprite DMA fetch sequencing, the pixel shift registers and
//! color multiplexer, and raster-interrupt generation.
//!
//! # Timing (PAL)
//!
//! - 312 raster lines per frame (0-311)
//! - 504 pixel-clock ticks per line (x wraps at $1F7)
//! - 63 bus cycles per line, counted by a 6-bit cycle counter that
//!   resynchronizes to 1 at the line boundary ($190)
//!
//! # Bus protocol
//!
//! The chip drives a 14-bit address and reads 12 bits back (8 bits of
//! graphics data plus the 4-bit color nybble). It owns the shared bus
//! during its half of every cycle; during bad lines and sprite data
//! fetches it additionally claims the CPU half by asserting the steal
//! line in its [`BusRequest`].

use bitflags::bitflags;
use chipset_core::{Phases, RegisterFile};

/// Last value of the horizontal pixel counter before wrap.
const X_LAST: u16 = 0x1F7;

/// Pixel position where hsync fires, `y` increments, and the cycle
/// counter resynchronizes.
const X_RASTER_LAST: u16 = 0x190;

/// Last raster line of a PAL frame.
const LAST_LINE: u16 = 311;

/// Bytes in one sprite block (21 lines x 3 bytes).
const SPRITE_BYTES: u8 = 63;

bitflags! {
    /// Interrupt source bits as latched in `$D019` / enabled via `$D01A`.
    ///
    /// Only `RASTER` is generated by this engine; the other sources exist
    /// as latch bits so the write-1-to-clear protocol covers the full
    /// register.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Interrupt: u8 {
        const RASTER = 0b0001;
        const SPRITE_BACKGROUND = 0b0010;
        const SPRITE_SPRITE = 0b0100;
        const LIGHT_PEN = 0b1000;
    }
}

/// Per-tick input sample for the chip.
#[derive(Debug, Clone, Copy, Default)]
pub struct VicInput {
    /// 12-bit bus read data: bits 0-7 graphics/matrix byte, bits 8-11
    /// the color-RAM nybble.
    pub data: u16,
    /// Register chip-select from the address decoder.
    pub reg_cs: bool,
    /// Shared-bus write enable.
    pub reg_we: bool,
    /// Register address (low 6 bits of the shared bus address).
    pub reg_addr: u8,
    /// Shared-bus write data.
    pub reg_data: u8,
}

/// Combinational bus request: the address the chip wants to fetch from
/// this tick, and whether it claims the CPU half of the cycle for it.
#[derive(Debug, Clone, Copy, Default)]
pub struct BusRequest {
    /// 14-bit address within the chip's bank window.
    pub addr: u16,
    /// Claim the bus from the CPU (bad-line and sprite-data fetches).
    pub steal: bool,
}

/// Per-tick video output sample.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VideoOutput {
    /// 4-bit color index.
    pub color: u8,
    pub hsync: bool,
    pub vsync: bool,
    /// Display-enable: inside the blanking-free region.
    pub visible: bool,
}

/// Per-line fetch sequencer state.
///
/// One full pass per raster line: sprite pointer and data fetches for
/// all 8 sprites, 5 DRAM refresh cycles, then 40 interleaved matrix
/// (c-access) and graphics (g-access) fetches, and an end-of-line step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FetchState {
    Idle,
    PAccess,
    SAccess0,
    SAccess1,
    SAccess2,
    Refresh,
    CAccess,
    GAccess,
    Eol,
}

/// Register keys for the memory-mapped interface.
#[derive(Debug, Clone, Copy)]
enum VicReg {
    SpriteX(usize),
    SpriteY(usize),
    SpriteXMsb,
    Control1,
    RasterCompare,
    SpriteEnable,
    Control2,
    SpriteYExpand,
    MemorySetup,
    InterruptStatus,
    InterruptEnable,
    Border,
    Background(usize),
    SpriteColor(usize),
}

/// VIC-II 6569 chip state.
pub struct Vic {
    regs: RegisterFile<VicReg>,

    /// Horizontal pixel counter (0-$1F7).
    x: u16,
    /// Raster line (0-311).
    y: u16,
    /// Per-line bus-cycle counter, resynchronized to 1 at `x == $190`.
    cycle: u8,

    /// Working video counter and its per-line base.
    vc: u16,
    vcbase: u16,
    /// Row counter within a character cell (0-7).
    rc: u8,
    /// Video matrix line buffer: 40 entries of character code (bits 0-7)
    /// plus color nybble (bits 8-11).
    vml: [u16; 40],
    /// Index into the line buffer (0-39).
    vmli: usize,

    state: FetchState,
    sprite_idx: usize,
    refresh_idx: u8,
    /// Latched sprite pointer byte from the most recent p-access.
    sprite_ptr: u8,
    /// Per-sprite DMA enable bits.
    sprite_dma_on: u8,
    /// Per-sprite shifter enable bits.
    sprite_shift_on: u8,
    /// Per-sprite data counters (byte offset within the sprite block).
    mc: [u8; 8],
    /// Per-sprite 24-bit pixel shift registers.
    sprite_shift: [u32; 8],

    /// Graphics shift register; bit 7 is the current pixel.
    pixshift: u8,
    /// Bit pair held for two ticks in multicolor modes.
    pixpair: u8,
    /// Matrix entry latched one phase after the c-access that fetched it.
    fgcolor: u16,

    /// Inside the horizontal display window (set by the fetch FSM).
    display_window_x: bool,
    /// Display ("not idle") latch: graphics data is being shifted out.
    display_not_idle: bool,

    // Registers.
    /// `$D011` bits 0-6: Y-scroll, RSEL, bitmap and extended-color mode.
    control1: u8,
    /// 9-bit raster interrupt compare (`$D012` + `$D011` bit 7).
    raster_compare: u16,
    irq: Interrupt,
    irq_enable: Interrupt,
    /// `$D018` memory setup: video matrix and character/bitmap bases.
    memory_setup: u8,
    /// `$D016` bit 4: multicolor mode.
    control2: u8,
    border: u8,
    background: [u8; 4],
    sprite_x: [u8; 8],
    sprite_x_msb: u8,
    sprite_y: [u8; 8],
    sprite_enable: u8,
    sprite_y_expand: u8,
    sprite_color: [u8; 8],
}

impl Vic {
    #[must_use]
    pub fn new() -> Self {
        let mut regs = RegisterFile::new(0xFF);
        for i in 0..8 {
            regs.add(0xD000 + 2 * i as u16, VicReg::SpriteX(i));
            regs.add(0xD001 + 2 * i as u16, VicReg::SpriteY(i));
        }
        regs.add(0xD010, VicReg::SpriteXMsb);
        regs.add(0xD011, VicReg::Control1);
        regs.add(0xD012, VicReg::RasterCompare);
        regs.add(0xD015, VicReg::SpriteEnable);
        regs.add(0xD016, VicReg::Control2);
        regs.add(0xD017, VicReg::SpriteYExpand);
        regs.add(0xD018, VicReg::MemorySetup);
        regs.add(0xD019, VicReg::InterruptStatus);
        regs.add(0xD01A, VicReg::InterruptEnable);
        regs.add(0xD020, VicReg::Border);
        for i in 0..4 {
            regs.add(0xD021 + i as u16, VicReg::Background(i));
        }
        for i in 0..8 {
            regs.add(0xD027 + i as u16, VicReg::SpriteColor(i));
        }

        Self {
            regs,
            x: 0,
            y: 0,
            cycle: 0,
            vc: 0,
            vcbase: 0,
            rc: 0,
            vml: [0; 40],
            vmli: 0,
            state: FetchState::Idle,
            sprite_idx: 0,
            refresh_idx: 0,
            sprite_ptr: 0,
            sprite_dma_on: 0,
            sprite_shift_on: 0,
            mc: [0; 8],
            sprite_shift: [0; 8],
            pixshift: 0,
            pixpair: 0,
            fgcolor: 0,
            display_window_x: false,
            display_not_idle: false,
            control1: 0,
            raster_compare: 0,
            irq: Interrupt::empty(),
            irq_enable: Interrupt::empty(),
            memory_setup: 0,
            control2: 0,
            border: 0,
            background: [0; 4],
            sprite_x: [0; 8],
            sprite_x_msb: 0,
            sprite_y: [0; 8],
            sprite_enable: 0,
            sprite_y_expand: 0,
            sprite_color: [0; 8],
        }
    }

    /// Advance the chip by one pixel-clock tick.
    ///
    /// All decisions below are made from pre-tick state; values that are
    /// both read and written this tick are snapshotted first, so the
    /// commit is atomic with respect to the tick's inputs.
    pub fn tick(&mut self, phases: Phases, input: VicInput) {
        let Phases { ph1, ph2 } = phases;

        let x = self.x;
        let y = self.y;
        let cycle = self.cycle;
        let rc = self.rc;
        let vmli = self.vmli;
        let matrix_entry = self.vml[vmli];
        let pixshift = self.pixshift;
        let not_idle = self.display_not_idle;
        let irq_before = self.irq;
        let bad_line = self.bad_line_condition();

        // X and Y counters with wrap logic.
        self.x = if x == X_LAST { 0 } else { x + 1 };
        if x == X_RASTER_LAST {
            self.y = if y == LAST_LINE { 0 } else { y + 1 };
        }

        // The cycle counter is six bits wide; it counts 1..=63 and passes
        // through 0 briefly at the end of every line before resync.
        if x == X_RASTER_LAST {
            self.cycle = 1;
        } else if ph1 {
            self.cycle = (cycle + 1) & 0x3F;
        }

        // Row counter and display latch.
        if ph2 {
            if cycle == 14 && bad_line {
                self.rc = 0;
                self.display_not_idle = true;
            } else if cycle == 58 {
                self.rc = (rc + 1) & 7;
                if rc == 7 {
                    self.display_not_idle = false;
                }
            }
        }

        // Raster interrupt latch at the start of the compare line.
        if cycle == 0 && y == self.raster_compare {
            self.irq |= Interrupt::RASTER;
        }

        // Foreground color trails the matrix entry by one phase.
        if ph1 {
            self.fgcolor = matrix_entry;
        }

        // Multicolor bit pair, held for two ticks.
        if x & 1 == 0 {
            self.pixpair = (pixshift >> 6) & 0x03;
        }

        // Sprite shifters arm when the raster X matches the sprite position.
        for idx in 0..8 {
            if self.sprite_x_position(idx) == x {
                self.sprite_shift_on |= 1 << idx;
            }
        }

        // Shift the pixel pipelines. Fetch states below overwrite the
        // loaded lanes, which matches the hardware's assignment priority.
        self.pixshift = pixshift << 1;
        for idx in 0..8 {
            if self.sprite_shift_on & (1 << idx) != 0 {
                self.sprite_shift[idx] = (self.sprite_shift[idx] << 1) & 0x00FF_FFFF;
            }
        }

        self.step_fetch(phases, input.data, bad_line, y, cycle, vmli, rc, not_idle);

        // Register writes land on either phase pulse.
        if (ph1 || ph2) && input.reg_cs && input.reg_we {
            self.reg_write(input.reg_addr, input.reg_data, irq_before);
        }
    }

    /// One step of the per-line fetch sequencer.
    ///
    /// `y`, `cycle`, `vmli`, `rc` and `not_idle` are the pre-tick values.
    #[allow(clippy::too_many_arguments)]
    fn step_fetch(
        &mut self,
        phases: Phases,
        data: u16,
        bad_line: bool,
        y: u16,
        cycle: u8,
        vmli: usize,
        rc: u8,
        not_idle: bool,
    ) {
        let Phases { ph1, ph2 } = phases;
        match self.state {
            FetchState::Idle => {
                if ph2 {
                    self.sprite_idx = 0;
                    self.refresh_idx = 0;
                    self.vmli = 0;
                    if y == 0 {
                        self.vcbase = 0;
                    }
                    if cycle == 58 {
                        // Disable all sprite shifters, then arm DMA for
                        // every enabled sprite whose Y matches this line.
                        self.sprite_shift_on = 0;
                        for idx in 0..8 {
                            if self.sprite_enable & (1 << idx) != 0
                                && u16::from(self.sprite_y[idx]) == y
                            {
                                self.sprite_dma_on |= 1 << idx;
                                self.mc[idx] = 0;
                            }
                        }
                        self.state = FetchState::PAccess;
                    }
                }
            }
            FetchState::PAccess => {
                if ph1 {
                    self.sprite_ptr = (data & 0xFF) as u8;
                    self.state = FetchState::SAccess0;
                }
            }
            FetchState::SAccess0 => {
                if ph2 {
                    if self.sprite_dma_on & (1 << self.sprite_idx) != 0 {
                        let i = self.sprite_idx;
                        self.sprite_shift[i] =
                            (self.sprite_shift[i] & 0x0000_FFFF) | u32::from(data & 0xFF) << 16;
                        self.mc[i] = (self.mc[i] + 1) & 0x3F;
                    }
                    self.state = FetchState::SAccess1;
                }
            }
            FetchState::SAccess1 => {
                if ph1 {
                    if self.sprite_dma_on & (1 << self.sprite_idx) != 0 {
                        let i = self.sprite_idx;
                        self.sprite_shift[i] =
                            (self.sprite_shift[i] & 0x00FF_00FF) | u32::from(data & 0xFF) << 8;
                        self.mc[i] = (self.mc[i] + 1) & 0x3F;
                    }
                    self.state = FetchState::SAccess2;
                }
            }
            FetchState::SAccess2 => {
                if ph2 {
                    if self.sprite_dma_on & (1 << self.sprite_idx) != 0 {
                        let i = self.sprite_idx;
                        self.sprite_shift[i] =
                            (self.sprite_shift[i] & 0x00FF_FF00) | u32::from(data & 0xFF);
                        let count = self.mc[i];
                        self.mc[i] = (count + 1) & 0x3F;
                        // The last byte of the block ends this sprite's DMA.
                        if count == SPRITE_BYTES - 1 {
                            self.sprite_dma_on &= !(1 << i);
                        }
                    }
                    if self.sprite_idx == 7 {
                        self.state = FetchState::Refresh;
                    } else {
                        self.sprite_idx += 1;
                        self.state = FetchState::PAccess;
                    }
                }
            }
            FetchState::Refresh => {
                if ph1 {
                    if self.refresh_idx == 4 {
                        self.vc = self.vcbase;
                        self.state = FetchState::CAccess;
                    } else {
                        self.refresh_idx += 1;
                    }
                }
            }
            FetchState::CAccess => {
                if ph2 {
                    if bad_line {
                        self.vml[vmli] = data & 0x0FFF;
                    }
                    self.state = FetchState::GAccess;
                }
            }
            FetchState::GAccess => {
                if ph1 {
                    self.pixshift = if not_idle { (data & 0xFF) as u8 } else { 0 };
                    self.vc = (self.vc + 1) & 0x3FF;
                    if vmli == 39 {
                        self.state = FetchState::Eol;
                    } else {
                        self.display_window_x = true;
                        self.vmli = vmli + 1;
                        self.state = FetchState::CAccess;
                    }
                }
            }
            FetchState::Eol => {
                if ph1 {
                    if not_idle && rc == 7 {
                        self.vcbase = self.vc;
                    }
                    self.display_window_x = false;
                    self.state = FetchState::Idle;
                }
            }
        }
    }

    /// The address the chip drives this tick, and whether it claims the
    /// CPU half of the cycle. Pure function of current state.
    #[must_use]
    pub fn bus_request(&self) -> BusRequest {
        match self.state {
            FetchState::PAccess => BusRequest {
                // Sprite pointers live in the last 8 bytes of the matrix.
                addr: self.video_matrix_base() << 10 | 0x3F8 | self.sprite_idx as u16,
                steal: false,
            },
            FetchState::SAccess0 | FetchState::SAccess1 | FetchState::SAccess2 => {
                if self.sprite_dma_on & (1 << self.sprite_idx) != 0 {
                    BusRequest {
                        addr: u16::from(self.sprite_ptr) << 6
                            | u16::from(self.mc[self.sprite_idx]),
                        steal: true,
                    }
                } else {
                    BusRequest::default()
                }
            }
            FetchState::CAccess => BusRequest {
                addr: self.video_matrix_base() << 10 | self.vc,
                steal: self.bad_line_condition(),
            },
            FetchState::GAccess => {
                let addr = if self.control1 & 0x20 != 0 {
                    // Bitmap: raster-offset-indexed within the bitmap base.
                    u16::from(self.memory_setup >> 3 & 1) << 13
                        | (self.vc & 0x3FF) << 3
                        | u16::from(self.rc)
                } else {
                    // Text: glyph row indexed by the fetched character code.
                    u16::from(self.memory_setup >> 1 & 7) << 11
                        | (self.vml[self.vmli] & 0xFF) << 3
                        | u16::from(self.rc)
                };
                BusRequest {
                    addr,
                    steal: self.bad_line_condition(),
                }
            }
            _ => BusRequest::default(),
        }
    }

    /// Per-tick video output. Pure function of current state.
    #[must_use]
    pub fn output(&self) -> VideoOutput {
        VideoOutput {
            color: self.color(),
            hsync: self.x == X_RASTER_LAST,
            vsync: self.y == 0 && self.x == X_RASTER_LAST - 3,
            visible: (13..61).contains(&self.cycle) && (0x10..=0x117).contains(&self.y),
        }
    }

    /// Color multiplexer.
    ///
    /// Sprites win in index order. Sprite-to-sprite and
    /// sprite-to-background priority are not modeled yet, and the
    /// extended-color combinations render black.
    fn color(&self) -> u8 {
        if !(self.display_window_x && self.display_window_y()) {
            return self.border;
        }

        for idx in 0..8 {
            if self.sprite_shift_on & (1 << idx) != 0
                && self.sprite_shift[idx] & 0x0080_0000 != 0
            {
                return self.sprite_color[idx];
            }
        }

        let ecm = self.control1 & 0x40 != 0;
        let bmm = self.control1 & 0x20 != 0;
        let mcm = self.control2 & 0x10 != 0;
        let fg = self.fgcolor;
        let bit = self.pixshift & 0x80 != 0;
        // Bit pairs advance every other tick: the live bits on even X,
        // the held pair on odd X.
        let pair = if self.x & 1 == 1 {
            self.pixpair
        } else {
            (self.pixshift >> 6) & 0x03
        };

        match (ecm, bmm, mcm) {
            // Standard text.
            (false, false, false) => {
                if bit {
                    (fg >> 8) as u8 & 0x0F
                } else {
                    self.background[0]
                }
            }
            // Multicolor text: color nybble bit 3 selects per character.
            (false, false, true) => {
                if fg & 0x0800 != 0 {
                    match pair {
                        0b00 => self.background[0],
                        0b01 => self.background[1],
                        0b10 => self.background[2],
                        _ => (fg >> 8) as u8 & 0x07,
                    }
                } else if bit {
                    (fg >> 8) as u8 & 0x0F
                } else {
                    self.background[0]
                }
            }
            // Standard bitmap: colors from the matrix entry's nybbles.
            (false, true, false) => {
                if bit {
                    (fg >> 4) as u8 & 0x0F
                } else {
                    fg as u8 & 0x0F
                }
            }
            // Multicolor bitmap.
            (false, true, true) => match pair {
                0b00 => self.background[0],
                0b01 => (fg >> 4) as u8 & 0x0F,
                0b10 => fg as u8 & 0x0F,
                _ => (fg >> 8) as u8 & 0x0F,
            },
            // ECM combinations are not implemented; black.
            (true, _, _) => 0,
        }
    }

    /// Combinational register readback.
    #[must_use]
    pub fn reg_read(&self, addr: u8) -> u8 {
        self.regs
            .read(0xD000 | u16::from(addr & 0x3F), |key| match key {
                VicReg::SpriteX(i) => self.sprite_x[i],
                VicReg::SpriteY(i) => self.sprite_y[i],
                VicReg::SpriteXMsb => self.sprite_x_msb,
                // Bit 7 is the live raster counter's ninth bit.
                VicReg::Control1 => (self.control1 & 0x7F) | ((self.y >> 1) & 0x80) as u8,
                VicReg::RasterCompare => (self.y & 0xFF) as u8,
                VicReg::SpriteEnable => self.sprite_enable,
                VicReg::Control2 => self.control2,
                VicReg::SpriteYExpand => self.sprite_y_expand,
                VicReg::MemorySetup => self.memory_setup,
                VicReg::InterruptStatus => self.irq.bits(),
                VicReg::InterruptEnable => self.irq_enable.bits(),
                VicReg::Border => self.border,
                VicReg::Background(i) => self.background[i],
                VicReg::SpriteColor(i) => self.sprite_color[i],
            })
    }

    /// Apply a register write. `irq_before` is the interrupt latch as of
    /// the start of the tick: a write-1-to-clear must not cancel a bit
    /// latched in the same tick it was not yet visible in.
    fn reg_write(&mut self, addr: u8, value: u8, irq_before: Interrupt) {
        self.regs.write(0xD000 | u16::from(addr & 0x3F), |key| match key {
            VicReg::SpriteX(i) => self.sprite_x[i] = value,
            VicReg::SpriteY(i) => self.sprite_y[i] = value,
            VicReg::SpriteXMsb => self.sprite_x_msb = value,
            VicReg::Control1 => {
                self.control1 = value & 0x7F;
                self.raster_compare =
                    (self.raster_compare & 0x00FF) | u16::from(value & 0x80) << 1;
            }
            VicReg::RasterCompare => {
                self.raster_compare = (self.raster_compare & 0x0100) | u16::from(value);
            }
            VicReg::SpriteEnable => self.sprite_enable = value,
            VicReg::Control2 => self.control2 = value,
            VicReg::SpriteYExpand => self.sprite_y_expand = value,
            VicReg::MemorySetup => self.memory_setup = value,
            VicReg::InterruptStatus => {
                // Write-1-to-clear.
                self.irq = irq_before.difference(Interrupt::from_bits_truncate(value));
            }
            VicReg::InterruptEnable => {
                self.irq_enable = Interrupt::from_bits_truncate(value);
            }
            VicReg::Border => self.border = value & 0x0F,
            VicReg::Background(i) => self.background[i] = value & 0x0F,
            VicReg::SpriteColor(i) => self.sprite_color[i] = value & 0x0F,
        });
    }

    /// Interrupt output: any latched source that is also enabled.
    #[must_use]
    pub fn irq_active(&self) -> bool {
        !(self.irq & self.irq_enable).is_empty()
    }

    /// Bad-line condition: the line buffer must be refilled this line.
    #[must_use]
    pub fn bad_line_condition(&self) -> bool {
        (0x30..=0xF7).contains(&self.y) && (self.y & 7) as u8 == self.control1 & 7
    }

    fn display_window_y(&self) -> bool {
        if self.control1 & 0x08 != 0 {
            (0x33..=0xFA).contains(&self.y)
        } else {
            (0x37..=0xF6).contains(&self.y)
        }
    }

    /// 9-bit sprite X position (low byte plus MSB register bit).
    fn sprite_x_position(&self, idx: usize) -> u16 {
        u16::from(self.sprite_x[idx]) | u16::from(self.sprite_x_msb >> idx & 1) << 8
    }

    /// Video matrix base within the bank (from `$D018` bits 4-7).
    fn video_matrix_base(&self) -> u16 {
        u16::from(self.memory_setup >> 4)
    }

    /// Current horizontal pixel position.
    #[must_use]
    pub fn raster_x(&self) -> u16 {
        self.x
    }

    /// Current raster line.
    #[must_use]
    pub fn raster_line(&self) -> u16 {
        self.y
    }

    /// Current per-line cycle counter.
    #[must_use]
    pub fn cycle(&self) -> u8 {
        self.cycle
    }

    /// Debug: a sprite's data counter.
    #[must_use]
    pub fn sprite_data_counter(&self, idx: usize) -> u8 {
        self.mc[idx]
    }

    /// Debug: whether a sprite's DMA is active.
    #[must_use]
    pub fn sprite_dma_active(&self, idx: usize) -> bool {
        self.sprite_dma_on & (1 << idx) != 0
    }

    /// Debug: a sprite's 24-bit shift register.
    #[must_use]
    pub fn sprite_shift_register(&self, idx: usize) -> u32 {
        self.sprite_shift[idx]
    }
}

impl Default for Vic {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Replicates the system clock sequencer: 3-bit counter reset to
    /// 0b101 so ph1 is the first pulse after reset.
    struct TestClock {
        cntr: u8,
    }

    impl TestClock {
        fn new() -> Self {
            Self { cntr: 0b101 }
        }

        fn next(&mut self) -> Phases {
            let phases = Phases {
                ph1: self.cntr == 0,
                ph2: self.cntr == 4,
            };
            self.cntr = (self.cntr + 1) & 7;
            phases
        }
    }

    const TICKS_PER_LINE: u32 = 0x1F8;

    fn run_ticks(vic: &mut Vic, clock: &mut TestClock, ticks: u32, data: u16) {
        for _ in 0..ticks {
            let phases = clock.next();
            vic.tick(
                phases,
                VicInput {
                    data,
                    ..VicInput::default()
                },
            );
        }
    }

    /// Hold a register write on the bus until one phase pulse has passed.
    fn write_reg(vic: &mut Vic, clock: &mut TestClock, addr: u8, value: u8) {
        loop {
            let phases = clock.next();
            let strobed = phases.any();
            vic.tick(
                phases,
                VicInput {
                    data: 0,
                    reg_cs: true,
                    reg_we: true,
                    reg_addr: addr,
                    reg_data: value,
                },
            );
            if strobed {
                break;
            }
        }
    }

    #[test]
    fn raster_counters_advance_and_wrap() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();

        run_ticks(&mut vic, &mut clock, TICKS_PER_LINE, 0);
        assert_eq!(vic.raster_line(), 1);

        run_ticks(&mut vic, &mut clock, TICKS_PER_LINE, 0);
        assert_eq!(vic.raster_line(), 2);

        // X stays in range across a whole frame, and y wraps to 0.
        for _ in 0..(310 * TICKS_PER_LINE) {
            let phases = clock.next();
            vic.tick(phases, VicInput::default());
            assert!(vic.raster_x() <= 0x1F7);
            assert!(vic.raster_line() <= 311);
        }
        assert_eq!(vic.raster_line(), 0);
    }

    #[test]
    fn bad_line_requires_scroll_match_and_display_range() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        write_reg(&mut vic, &mut clock, 0x11, 0x03); // Y-scroll = 3

        // Line 43 matches the scroll bits but is above the display range.
        while vic.raster_line() != 43 {
            run_ticks(&mut vic, &mut clock, 1, 0);
        }
        assert!(!vic.bad_line_condition());

        // Line $33 = 51: in range, 51 & 7 == 3.
        while vic.raster_line() != 51 {
            run_ticks(&mut vic, &mut clock, 1, 0);
        }
        assert!(vic.bad_line_condition());

        while vic.raster_line() != 52 {
            run_ticks(&mut vic, &mut clock, 1, 0);
        }
        assert!(!vic.bad_line_condition());
    }

    #[test]
    fn sprite_dma_fetches_exactly_63_bytes() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();

        // Sprite 0 at a Y that will match, X parked beyond the visible
        // range so the shifter never arms.
        write_reg(&mut vic, &mut clock, 0x15, 0x01);
        write_reg(&mut vic, &mut clock, 0x01, 60);
        write_reg(&mut vic, &mut clock, 0x00, 0xFF);
        write_reg(&mut vic, &mut clock, 0x10, 0x01);

        // Run past line 60 plus the 21 DMA lines.
        while vic.raster_line() != 100 {
            run_ticks(&mut vic, &mut clock, 1, 0x00AB);
        }

        assert!(!vic.sprite_dma_active(0));
        assert_eq!(vic.sprite_data_counter(0), 63);
        assert_eq!(vic.sprite_shift_register(0), 0x00AB_ABAB);

        // Further lines fetch nothing: the shift register is untouched.
        run_ticks(&mut vic, &mut clock, 2 * TICKS_PER_LINE, 0x0055);
        assert_eq!(vic.sprite_shift_register(0), 0x00AB_ABAB);
        assert_eq!(vic.sprite_data_counter(0), 63);
    }

    #[test]
    fn disabled_sprite_never_fetches() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        write_reg(&mut vic, &mut clock, 0x01, 60); // Y matches, but not enabled
        write_reg(&mut vic, &mut clock, 0x00, 0xFF);
        write_reg(&mut vic, &mut clock, 0x10, 0x01);

        while vic.raster_line() != 100 {
            run_ticks(&mut vic, &mut clock, 1, 0x00AB);
        }
        assert_eq!(vic.sprite_data_counter(0), 0);
        assert_eq!(vic.sprite_shift_register(0), 0);
    }

    #[test]
    fn raster_interrupt_latches_and_acknowledges() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        write_reg(&mut vic, &mut clock, 0x12, 100);
        // The compare register resets to 0 and matches line 0 before the
        // first write lands, so clear the stale latch before enabling.
        write_reg(&mut vic, &mut clock, 0x19, 0xFF);
        write_reg(&mut vic, &mut clock, 0x1A, 0x01);

        // Not asserted before the compare line.
        while vic.raster_line() != 99 {
            run_ticks(&mut vic, &mut clock, 1, 0);
            assert!(!vic.irq_active());
        }

        // By the time line 101 starts, the latch must have fired.
        while vic.raster_line() != 101 {
            run_ticks(&mut vic, &mut clock, 1, 0);
        }
        assert!(vic.irq_active());
        assert_eq!(vic.reg_read(0x19) & 0x01, 0x01);

        // Write-1-to-clear acknowledges and deasserts the output.
        write_reg(&mut vic, &mut clock, 0x19, 0x01);
        assert!(!vic.irq_active());
        assert_eq!(vic.reg_read(0x19) & 0x01, 0x00);
    }

    #[test]
    fn interrupt_masked_by_enable_register() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        write_reg(&mut vic, &mut clock, 0x12, 100);

        while vic.raster_line() != 101 {
            run_ticks(&mut vic, &mut clock, 1, 0);
        }
        // Latched but not enabled.
        assert_eq!(vic.reg_read(0x19) & 0x01, 0x01);
        assert!(!vic.irq_active());

        write_reg(&mut vic, &mut clock, 0x1A, 0x01);
        assert!(vic.irq_active());
    }

    #[test]
    fn high_raster_compare_bit_via_control1() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        write_reg(&mut vic, &mut clock, 0x12, 0x2C); // 300 = $12C
        write_reg(&mut vic, &mut clock, 0x11, 0x80);
        write_reg(&mut vic, &mut clock, 0x1A, 0x01);

        while vic.raster_line() != 301 {
            run_ticks(&mut vic, &mut clock, 1, 0);
        }
        assert!(vic.irq_active());
    }

    #[test]
    fn raster_readback_tracks_counters() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        while vic.raster_line() != 260 {
            run_ticks(&mut vic, &mut clock, 1, 0);
        }
        // $D012 returns the low 8 bits, $D011 bit 7 the ninth bit.
        assert_eq!(vic.reg_read(0x12), (260u16 & 0xFF) as u8);
        assert_eq!(vic.reg_read(0x11) & 0x80, 0x80);
    }

    #[test]
    fn unmapped_register_reads_all_ones() {
        let vic = Vic::new();
        assert_eq!(vic.reg_read(0x13), 0xFF);
        assert_eq!(vic.reg_read(0x3F), 0xFF);
    }

    #[test]
    fn register_read_write_round_trip() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        write_reg(&mut vic, &mut clock, 0x20, 0x06);
        write_reg(&mut vic, &mut clock, 0x21, 0x0E);
        write_reg(&mut vic, &mut clock, 0x27, 0x05);
        assert_eq!(vic.reg_read(0x20), 0x06);
        assert_eq!(vic.reg_read(0x21), 0x0E);
        assert_eq!(vic.reg_read(0x27), 0x05);
        // Color registers are four bits wide.
        write_reg(&mut vic, &mut clock, 0x20, 0xF7);
        assert_eq!(vic.reg_read(0x20), 0x07);
    }

    #[test]
    fn border_color_outside_display_window() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        write_reg(&mut vic, &mut clock, 0x20, 0x0E);
        assert_eq!(vic.output().color, 0x0E);
    }

    #[test]
    fn color_output_is_pure() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        write_reg(&mut vic, &mut clock, 0x20, 0x06);
        run_ticks(&mut vic, &mut clock, 10_000, 0x05AA);

        let first = vic.output();
        let second = vic.output();
        assert_eq!(first, second);
    }

    #[test]
    fn hsync_once_per_line_vsync_once_per_frame() {
        let mut vic = Vic::new();
        let mut clock = TestClock::new();
        let mut hsyncs = 0u32;
        let mut vsyncs = 0u32;
        for _ in 0..(312 * TICKS_PER_LINE) {
            let out = vic.output();
            if out.hsync {
                hsyncs += 1;
            }
            if out.vsync {
                vsyncs += 1;
            }
            let phases = clock.next();
            vic.tick(phases, VicInput::default());
        }
        assert_eq!(hsyncs, 312);
        assert_eq!(vsyncs, 1);
    }
}
