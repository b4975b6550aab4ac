mod fetcher;
mod registers;

pub use registers::{Lcdc, Mode, Stat};

use crate::config::DmgShade;
use crate::gb::bus::GbBus;
use crate::gb::interrupt::Interrupt;
use crate::gb::io::IoRegistry;
use crate::{EmulationError, SystemControl};

use self::fetcher::{FetchParams, Fetcher, PixelFifo};

pub const DISPLAY_WIDTH: usize = 160;
pub const DISPLAY_HEIGHT: usize = 144;

const FRAME_BYTES: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT * 3;

pub const VRAM_START: u16 = 0x8000;
pub const VRAM_END: u16 = 0x9FFF;
pub const OAM_START: u16 = 0xFE00;
pub const OAM_END: u16 = 0xFE9F;

const VRAM_SIZE: usize = 0x2000;
const OAM_SIZE: usize = 0xA0;

pub const LCDC_REG: u16 = 0xFF40;
pub const STAT_REG: u16 = 0xFF41;
pub const SCY_REG: u16 = 0xFF42;
pub const SCX_REG: u16 = 0xFF43;
pub const LY_REG: u16 = 0xFF44;
pub const LYC_REG: u16 = 0xFF45;
pub const BGP_REG: u16 = 0xFF47;
pub const OBP0_REG: u16 = 0xFF48;
pub const OBP1_REG: u16 = 0xFF49;
pub const WY_REG: u16 = 0xFF4A;
pub const WX_REG: u16 = 0xFF4B;

const DOTS_PER_LINE: u16 = 456;
const OAM_SCAN_DOTS: u16 = 80;

/// First line of vertical blank
const L_VBLANK_START: u8 = 144;

/// Lines per frame, including vertical blank
const L_FRAME_END: u8 = 154;

const SPRITES_PER_LINE: usize = 10;

/// A sprite selected during OAM scan, with its row of pattern data already fetched
/// (and mirrored when the sprite is flipped horizontally).
#[derive(Clone, Copy, Debug)]
struct LineSprite {
    x: u8,
    pattern_lo: u8,
    pattern_hi: u8,
    use_obp1: bool,
    behind_bg: bool,
}

impl LineSprite {
    /// Colour index at screen column `x`. OAM X is the right edge plus one, offset by 8.
    #[inline]
    fn pixel_at(&self, x: u8) -> u8 {
        let dx = (x as u16 + 8).wrapping_sub(self.x as u16);
        if dx >= 8 {
            return 0;
        }

        let bit = 7 - dx;
        (((self.pattern_hi >> bit) & 0x01) << 1) | ((self.pattern_lo >> bit) & 0x01)
    }
}

/// The DMG picture processor. Each line runs OAM scan (80 dots), then drawing through
/// the tile fetcher and pixel FIFO, then horizontal blank up to dot 456.
pub struct Ppu {
    vram: Vec<u8>,
    oam: [u8; OAM_SIZE],
    frame: Vec<u8>,
    shades: [DmgShade; 4],

    lcdc: Lcdc,
    stat: Stat,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,

    mode: Mode,
    dot: u16,
    stat_line: bool,

    fetcher: Fetcher,
    fifo: PixelFifo,
    line_sprites: Vec<LineSprite>,
    lcd_x: u8,
    discard: u8,
    window_y_triggered: bool,
    window_line: u8,
    window_drawn: bool,

    frame_complete: bool,
    total_dots: u64,
    frame_start_dot: u64,
    last_frame_dots: u64,
}

impl SystemControl for Ppu {
    fn reset(&mut self) {
        self.vram.fill(0);
        self.oam = [0; OAM_SIZE];
        self.frame.fill(0);

        self.lcdc = Lcdc::empty();
        self.stat = Stat::empty();
        self.scy = 0;
        self.scx = 0;
        self.ly = 0;
        self.lyc = 0;
        self.bgp = 0;
        self.obp0 = 0;
        self.obp1 = 0;
        self.wy = 0;
        self.wx = 0;

        self.mode = Mode::HBlank;
        self.dot = 0;
        self.stat_line = false;

        self.fetcher.start_line();
        self.fifo.clear();
        self.line_sprites.clear();
        self.lcd_x = 0;
        self.discard = 0;
        self.window_y_triggered = false;
        self.window_line = 0;
        self.window_drawn = false;

        self.frame_complete = false;
        self.frame_start_dot = self.total_dots;
    }
}

impl Ppu {
    pub fn new(shades: [DmgShade; 4]) -> Self {
        Self {
            vram: vec![0; VRAM_SIZE],
            oam: [0; OAM_SIZE],
            frame: vec![0; FRAME_BYTES],
            shades,

            lcdc: Lcdc::empty(),
            stat: Stat::empty(),
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,

            mode: Mode::HBlank,
            dot: 0,
            stat_line: false,

            fetcher: Fetcher::new(),
            fifo: PixelFifo::new(),
            line_sprites: Vec::with_capacity(SPRITES_PER_LINE),
            lcd_x: 0,
            discard: 0,
            window_y_triggered: false,
            window_line: 0,
            window_drawn: false,

            frame_complete: false,
            total_dots: 0,
            frame_start_dot: 0,
            last_frame_dots: 0,
        }
    }

    /// Loads the register state the DMG boot ROM leaves behind: LCD on, starting a frame.
    pub fn skip_boot(&mut self) {
        self.lcdc = Lcdc::from_bits_truncate(0x91);
        self.stat = Stat::LYC_EQUAL;
        self.bgp = 0xFC;
        self.obp0 = 0xFF;
        self.obp1 = 0xFF;
        self.mode = Mode::OamScan;
        self.dot = 0;
        self.ly = 0;
        self.frame_start_dot = self.total_dots;
    }

    /// Advances the PPU by one dot.
    pub fn tick(&mut self, interrupts: &mut Interrupt) {
        self.total_dots += 1;

        if !self.lcdc.lcd_enabled() {
            return;
        }

        match self.mode {
            Mode::OamScan => {
                if self.dot == OAM_SCAN_DOTS - 1 {
                    self.scan_oam();
                    self.start_drawing();
                }
            }
            Mode::Drawing => {
                self.step_pipeline();
                if self.lcd_x as usize == DISPLAY_WIDTH {
                    if self.window_drawn {
                        self.window_line = self.window_line.wrapping_add(1);
                    }
                    self.mode = Mode::HBlank;
                }
            }
            Mode::HBlank | Mode::VBlank => {}
        }

        self.dot += 1;
        if self.dot == DOTS_PER_LINE {
            self.dot = 0;
            self.next_line(interrupts);
        }

        self.update_stat_line(interrupts);
    }

    fn next_line(&mut self, interrupts: &mut Interrupt) {
        self.ly += 1;

        if self.ly < L_VBLANK_START {
            self.mode = Mode::OamScan;
        } else if self.ly == L_VBLANK_START {
            self.mode = Mode::VBlank;
            interrupts.insert(Interrupt::VBLANK);

            self.frame_complete = true;
            self.last_frame_dots = self.total_dots - self.frame_start_dot;
            self.frame_start_dot = self.total_dots;
        } else if self.ly == L_FRAME_END {
            self.ly = 0;
            self.mode = Mode::OamScan;
            self.window_line = 0;
            self.window_y_triggered = false;
        }
    }

    /// STAT interrupt requests are the rising edges of the OR of every enabled source.
    fn update_stat_line(&mut self, interrupts: &mut Interrupt) {
        let lyc_equal = self.ly == self.lyc;
        self.stat.set(Stat::LYC_EQUAL, lyc_equal);

        let line = (self.stat.contains(Stat::LYC_INT) && lyc_equal)
            || (self.stat.contains(Stat::HBLANK_INT) && self.mode == Mode::HBlank)
            || (self.stat.contains(Stat::VBLANK_INT) && self.mode == Mode::VBlank)
            || (self.stat.contains(Stat::OAM_INT) && self.mode == Mode::OamScan);

        if line && !self.stat_line {
            interrupts.insert(Interrupt::LCD_STAT);
        }
        self.stat_line = line;
    }

    /// Picks up to 10 sprites overlapping this line, in OAM order, then orders them by X.
    fn scan_oam(&mut self) {
        self.line_sprites.clear();
        let height = self.lcdc.obj_height();

        for entry in self.oam.chunks_exact(4) {
            if self.line_sprites.len() == SPRITES_PER_LINE {
                break;
            }

            let (y, x, tile, attributes) = (entry[0], entry[1], entry[2], entry[3]);
            let row = (self.ly as u16 + 16).wrapping_sub(y as u16);
            if row >= height as u16 {
                continue;
            }

            let mut row = row as u8;
            if attributes & 0b01000000 != 0 {
                row = height - 1 - row;
            }

            let tile = if height == 16 { tile & 0xFE } else { tile };
            let addr = tile as usize * 16 + row as usize * 2;
            let (mut pattern_lo, mut pattern_hi) = (self.vram[addr], self.vram[addr + 1]);

            if attributes & 0b00100000 != 0 {
                pattern_lo = pattern_lo.reverse_bits();
                pattern_hi = pattern_hi.reverse_bits();
            }

            self.line_sprites.push(LineSprite {
                x,
                pattern_lo,
                pattern_hi,
                use_obp1: attributes & 0b00010000 != 0,
                behind_bg: attributes & 0b10000000 != 0,
            });
        }

        // stable, so equal X keeps OAM order
        self.line_sprites.sort_by_key(|sprite| sprite.x);
    }

    fn start_drawing(&mut self) {
        self.mode = Mode::Drawing;
        self.fetcher.start_line();
        self.fifo.clear();
        self.lcd_x = 0;
        self.discard = self.scx & 0x07;
        self.window_drawn = false;

        if self.ly == self.wy {
            self.window_y_triggered = true;
        }
    }

    fn step_pipeline(&mut self) {
        if !self.fetcher.in_window() && self.window_starts_at(self.lcd_x) {
            self.fetcher.start_window();
            self.fifo.clear();
            self.discard = 0;
            self.window_drawn = true;
        }

        let params = FetchParams {
            lcdc: self.lcdc,
            scx: self.scx,
            scy: self.scy,
            ly: self.ly,
            window_line: self.window_line,
        };
        self.fetcher.tick(&self.vram, &params, &mut self.fifo);

        if !self.fifo.can_output() {
            return;
        }

        let Some(colour) = self.fifo.pop() else {
            return;
        };

        if self.discard > 0 {
            self.discard -= 1;
            return;
        }

        self.output_pixel(colour);
        self.lcd_x += 1;
    }

    #[inline]
    fn window_starts_at(&self, x: u8) -> bool {
        self.lcdc.contains(Lcdc::WINDOW_ENABLE)
            && self.window_y_triggered
            && x as u16 + 7 >= self.wx as u16
    }

    fn output_pixel(&mut self, bg_colour: u8) {
        let bg_colour = if self.lcdc.contains(Lcdc::BG_WINDOW_ENABLE) { bg_colour } else { 0 };
        let mut shade = palette_shade(self.bgp, bg_colour);

        if self.lcdc.contains(Lcdc::OBJ_ENABLE) {
            let x = self.lcd_x;
            let sprite_pixel = self.line_sprites.iter()
                .map(|sprite| (sprite, sprite.pixel_at(x)))
                .find(|&(_, colour)| colour != 0);

            if let Some((sprite, colour)) = sprite_pixel {
                if !(sprite.behind_bg && bg_colour != 0) {
                    let palette = if sprite.use_obp1 { self.obp1 } else { self.obp0 };
                    shade = palette_shade(palette, colour);
                }
            }
        }

        let (b, g, r) = self.shades[shade as usize];
        let offset = (self.ly as usize * DISPLAY_WIDTH + self.lcd_x as usize) * 3;
        self.frame[offset..offset + 3].copy_from_slice(&[b, g, r]);
    }

    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    /// The last completed picture, packed B,G,R.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn ly(&self) -> u8 {
        self.ly
    }

    pub fn total_dots(&self) -> u64 {
        self.total_dots
    }

    /// Dots between the two most recent VBlank entries.
    pub fn last_frame_dots(&self) -> u64 {
        self.last_frame_dots
    }

    #[inline]
    fn vram_blocked(&self) -> bool {
        self.lcdc.lcd_enabled() && self.mode == Mode::Drawing
    }

    #[inline]
    fn oam_blocked(&self) -> bool {
        self.lcdc.lcd_enabled() && matches!(self.mode, Mode::OamScan | Mode::Drawing)
    }

    pub fn read_vram(&self, addr: u16) -> u8 {
        if self.vram_blocked() {
            tracing::trace!("VRAM read at {:04X} during drawing", addr);
            return 0xFF;
        }
        self.vram[(addr - VRAM_START) as usize]
    }

    pub fn write_vram(&mut self, addr: u16, byte: u8) {
        if self.vram_blocked() {
            tracing::trace!("dropped VRAM write {:02X} at {:04X}", byte, addr);
            return;
        }
        self.vram[(addr - VRAM_START) as usize] = byte;
    }

    pub fn read_oam(&self, addr: u16) -> u8 {
        if self.oam_blocked() {
            tracing::trace!("OAM read at {:04X} during mode {:?}", addr, self.mode);
            return 0xFF;
        }
        self.oam[(addr - OAM_START) as usize]
    }

    pub fn write_oam(&mut self, addr: u16, byte: u8) {
        if self.oam_blocked() {
            tracing::trace!("dropped OAM write {:02X} at {:04X}", byte, addr);
            return;
        }
        self.oam[(addr - OAM_START) as usize] = byte;
    }

    /// OAM DMA writes bypass mode blocking.
    #[inline]
    pub fn write_oam_direct(&mut self, index: u8, byte: u8) {
        if let Some(slot) = self.oam.get_mut(index as usize) {
            *slot = byte;
        }
    }

    #[inline]
    pub fn oam_byte(&self, index: u8) -> u8 {
        self.oam.get(index as usize).copied().unwrap_or(0xFF)
    }

    pub fn read_lcdc(&self) -> u8 {
        self.lcdc.bits()
    }

    pub fn write_lcdc(&mut self, byte: u8) {
        let was_enabled = self.lcdc.lcd_enabled();
        self.lcdc = Lcdc::from_bits_truncate(byte);

        if was_enabled && !self.lcdc.lcd_enabled() {
            // the LCD stops at line 0 in mode 0
            self.ly = 0;
            self.dot = 0;
            self.mode = Mode::HBlank;
            self.stat_line = false;
            tracing::debug!("LCD off");
        } else if !was_enabled && self.lcdc.lcd_enabled() {
            self.ly = 0;
            self.dot = 0;
            self.mode = Mode::OamScan;
            self.window_line = 0;
            self.window_y_triggered = false;
            self.frame_start_dot = self.total_dots;
            tracing::debug!("LCD on");
        }
    }

    pub fn read_stat(&self) -> u8 {
        let mode = if self.lcdc.lcd_enabled() { self.mode as u8 } else { 0 };
        0b10000000 | self.stat.bits() | mode
    }

    pub fn write_stat(&mut self, byte: u8) {
        let lyc_equal = self.stat & Stat::LYC_EQUAL;
        self.stat = Stat::from_bits_truncate(byte & Stat::WRITABLE) | lyc_equal;
    }

    pub fn register_io(registry: &mut IoRegistry) -> Result<(), EmulationError> {
        registry.register(LCDC_REG,
            |bus: &GbBus, _| bus.ppu.read_lcdc(),
            |bus: &mut GbBus, _, byte| bus.ppu.write_lcdc(byte))?;
        registry.register(STAT_REG,
            |bus: &GbBus, _| bus.ppu.read_stat(),
            |bus: &mut GbBus, _, byte| bus.ppu.write_stat(byte))?;
        registry.register(SCY_REG,
            |bus: &GbBus, _| bus.ppu.scy,
            |bus: &mut GbBus, _, byte| bus.ppu.scy = byte)?;
        registry.register(SCX_REG,
            |bus: &GbBus, _| bus.ppu.scx,
            |bus: &mut GbBus, _, byte| bus.ppu.scx = byte)?;
        registry.register(LY_REG,
            |bus: &GbBus, _| bus.ppu.ly,
            |_: &mut GbBus, _, byte| tracing::trace!("dropped LY write {:02X}", byte))?;
        registry.register(LYC_REG,
            |bus: &GbBus, _| bus.ppu.lyc,
            |bus: &mut GbBus, _, byte| bus.ppu.lyc = byte)?;
        registry.register(BGP_REG,
            |bus: &GbBus, _| bus.ppu.bgp,
            |bus: &mut GbBus, _, byte| bus.ppu.bgp = byte)?;
        registry.register(OBP0_REG,
            |bus: &GbBus, _| bus.ppu.obp0,
            |bus: &mut GbBus, _, byte| bus.ppu.obp0 = byte)?;
        registry.register(OBP1_REG,
            |bus: &GbBus, _| bus.ppu.obp1,
            |bus: &mut GbBus, _, byte| bus.ppu.obp1 = byte)?;
        registry.register(WY_REG,
            |bus: &GbBus, _| bus.ppu.wy,
            |bus: &mut GbBus, _, byte| bus.ppu.wy = byte)?;
        registry.register(WX_REG,
            |bus: &GbBus, _| bus.ppu.wx,
            |bus: &mut GbBus, _, byte| bus.ppu.wx = byte)?;
        Ok(())
    }
}

/// Two bits of a BGP/OBP register per colour index.
#[inline]
fn palette_shade(palette: u8, colour: u8) -> u8 {
    (palette >> (colour * 2)) & 0x03
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EmulatorConfig;

    const WHITE: [u8; 3] = [0xFF, 0xFF, 0xFF];
    const BLACK: [u8; 3] = [0x00, 0x00, 0x00];
    const LIGHT: [u8; 3] = [0xAA, 0xAA, 0xAA];

    fn new_ppu() -> Ppu {
        let mut ppu = Ppu::new(EmulatorConfig::default().dmg_palette);
        ppu.bgp = 0b11_10_01_00;
        ppu.obp0 = 0b11_10_01_00;
        ppu.obp1 = 0b00_00_11_00;
        ppu
    }

    fn run_dots(ppu: &mut Ppu, interrupts: &mut Interrupt, dots: u32) {
        for _ in 0..dots {
            ppu.tick(interrupts);
        }
    }

    fn run_frame(ppu: &mut Ppu, interrupts: &mut Interrupt) {
        while !ppu.take_frame_complete() {
            ppu.tick(interrupts);
        }
    }

    fn pixel(ppu: &Ppu, x: usize, y: usize) -> [u8; 3] {
        let offset = (y * DISPLAY_WIDTH + x) * 3;
        [ppu.frame[offset], ppu.frame[offset + 1], ppu.frame[offset + 2]]
    }

    /// Tile 1 solid colour 3, tile 2 solid colour 1.
    fn load_solid_tiles(ppu: &mut Ppu) {
        for row in 0..8 {
            ppu.vram[0x10 + row * 2] = 0xFF;
            ppu.vram[0x10 + row * 2 + 1] = 0xFF;
            ppu.vram[0x20 + row * 2] = 0xFF;
        }
    }

    #[test]
    fn test_frame_is_70224_dots() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        ppu.write_lcdc(0x91);

        run_frame(&mut ppu, &mut interrupts);
        run_frame(&mut ppu, &mut interrupts);
        assert_eq!(ppu.last_frame_dots(), 70224);
        assert!(interrupts.contains(Interrupt::VBLANK));
        assert_eq!(ppu.ly(), 144);
        assert_eq!(ppu.mode(), Mode::VBlank);
    }

    #[test]
    fn test_line_mode_sequence() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        ppu.write_lcdc(0x91);

        assert_eq!(ppu.mode(), Mode::OamScan);
        run_dots(&mut ppu, &mut interrupts, 80);
        assert_eq!(ppu.mode(), Mode::Drawing);
        run_dots(&mut ppu, &mut interrupts, 172);
        assert_eq!(ppu.mode(), Mode::Drawing);
        run_dots(&mut ppu, &mut interrupts, 20);
        assert_eq!(ppu.mode(), Mode::HBlank);
        run_dots(&mut ppu, &mut interrupts, 456 - 272);
        assert_eq!(ppu.ly(), 1);
        assert_eq!(ppu.mode(), Mode::OamScan);
    }

    #[test]
    fn test_lcd_off_resets_line() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        ppu.write_lcdc(0x91);
        run_dots(&mut ppu, &mut interrupts, 456 * 3 + 100);
        assert_eq!(ppu.ly(), 3);

        ppu.write_lcdc(0x11);
        assert_eq!(ppu.ly(), 0);
        assert_eq!(ppu.read_stat() & 0x03, 0);
        run_dots(&mut ppu, &mut interrupts, 1000);
        assert_eq!(ppu.ly(), 0);
    }

    #[test]
    fn test_vram_and_oam_blocking() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        ppu.write_vram(0x8000, 0x12);
        ppu.write_oam(0xFE00, 0x34);

        ppu.write_lcdc(0x91);
        assert_eq!(ppu.read_oam(0xFE00), 0xFF);
        assert_eq!(ppu.read_vram(0x8000), 0x12);

        run_dots(&mut ppu, &mut interrupts, 100);
        assert_eq!(ppu.mode(), Mode::Drawing);
        assert_eq!(ppu.read_vram(0x8000), 0xFF);
        ppu.write_vram(0x8000, 0x99);

        run_dots(&mut ppu, &mut interrupts, 300);
        assert_eq!(ppu.mode(), Mode::HBlank);
        assert_eq!(ppu.read_vram(0x8000), 0x12);
        assert_eq!(ppu.read_oam(0xFE00), 0x34);
    }

    #[test]
    fn test_stat_interrupt_edges() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        ppu.lyc = 2;
        ppu.write_stat(0x40);
        ppu.write_lcdc(0x91);

        run_dots(&mut ppu, &mut interrupts, 456 * 2 - 1);
        assert!(!interrupts.contains(Interrupt::LCD_STAT));
        run_dots(&mut ppu, &mut interrupts, 1);
        assert!(interrupts.contains(Interrupt::LCD_STAT));
        assert_eq!(ppu.read_stat() & 0x04, 0x04);

        // the line stays high for the rest of LY=2, so no second request
        interrupts = Interrupt::empty();
        run_dots(&mut ppu, &mut interrupts, 400);
        assert!(!interrupts.contains(Interrupt::LCD_STAT));
    }

    #[test]
    fn test_background_with_fine_scroll() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        load_solid_tiles(&mut ppu);
        // map column 1 is tile 1, everything else tile 0
        ppu.vram[0x1801] = 0x01;
        ppu.scx = 3;
        ppu.write_lcdc(0x91);

        run_frame(&mut ppu, &mut interrupts);
        assert_eq!(pixel(&ppu, 4, 0), WHITE);
        assert_eq!(pixel(&ppu, 5, 0), BLACK);
        assert_eq!(pixel(&ppu, 12, 0), BLACK);
        assert_eq!(pixel(&ppu, 13, 0), WHITE);
    }

    #[test]
    fn test_window_covers_background() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        load_solid_tiles(&mut ppu);
        // background map all tile 0, window map (0x9C00) all tile 1
        ppu.vram[0x1C00..0x2000].fill(0x01);
        ppu.wy = 10;
        ppu.wx = 7 + 80;
        ppu.write_lcdc(0x91 | 0x20 | 0x40);

        run_frame(&mut ppu, &mut interrupts);
        assert_eq!(pixel(&ppu, 100, 9), WHITE);
        assert_eq!(pixel(&ppu, 79, 10), WHITE);
        assert_eq!(pixel(&ppu, 80, 10), BLACK);
        assert_eq!(pixel(&ppu, 159, 143), BLACK);
    }

    #[test]
    fn test_sprite_priority_and_palettes() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        load_solid_tiles(&mut ppu);

        // sprite 0 at screen (8, 0) with tile 2 on OBP0
        ppu.oam[0..4].copy_from_slice(&[16, 16, 2, 0x00]);
        // sprite 1 overlaps it from x=4 with tile 1 on OBP1; lower X wins
        ppu.oam[4..8].copy_from_slice(&[16, 12, 1, 0x10]);
        ppu.write_lcdc(0x93);

        run_frame(&mut ppu, &mut interrupts);
        // OBP1 maps colour 3 to shade 0
        assert_eq!(pixel(&ppu, 4, 0), WHITE);
        assert_eq!(pixel(&ppu, 8, 0), WHITE);
        assert_eq!(pixel(&ppu, 11, 0), WHITE);
        assert_eq!(pixel(&ppu, 12, 0), LIGHT);
        assert_eq!(pixel(&ppu, 15, 0), LIGHT);
        assert_eq!(pixel(&ppu, 16, 0), WHITE);
        assert_eq!(pixel(&ppu, 3, 0), WHITE);
    }

    #[test]
    fn test_sprite_behind_background() {
        let mut ppu = new_ppu();
        let mut interrupts = Interrupt::empty();
        load_solid_tiles(&mut ppu);
        ppu.vram[0x1800] = 0x01;
        // behind-BG sprite over a BG tile (x 0-7) and over colour 0 (x 8-15)
        ppu.oam[0..4].copy_from_slice(&[16, 12, 2, 0x80]);
        ppu.write_lcdc(0x93);

        run_frame(&mut ppu, &mut interrupts);
        assert_eq!(pixel(&ppu, 5, 0), BLACK);
        assert_eq!(pixel(&ppu, 8, 0), LIGHT);
    }

    #[test]
    fn test_ten_sprites_per_line() {
        let mut ppu = new_ppu();
        load_solid_tiles(&mut ppu);
        for i in 0..12 {
            let x = 8 + i as u8 * 8;
            ppu.oam[i * 4..i * 4 + 4].copy_from_slice(&[16, x, 2, 0]);
        }
        ppu.lcdc = Lcdc::from_bits_truncate(0x93);
        ppu.scan_oam();
        assert_eq!(ppu.line_sprites.len(), 10);
        assert_eq!(ppu.line_sprites[9].x, 80);
    }
}
