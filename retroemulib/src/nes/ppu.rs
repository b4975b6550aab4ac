mod palette;
mod ppubus;
mod registers;

pub use ppubus::PpuBus;
pub use registers::{PpuCtrl, PpuMask, PpuStatus};

use crate::nes::bus::SystemBus;
use crate::SystemControl;

use self::ppubus::{ATTR_TABLE_START, NAME_TABLE_START, OAM_SIZE, PALETTE_TABLE_START};
use self::palette::DISPLAY_PALETTE;

pub const DISPLAY_WIDTH: usize = 256;
pub const DISPLAY_HEIGHT: usize = 240;

const FRAME_BYTES: usize = DISPLAY_WIDTH * DISPLAY_HEIGHT * 3;

const SPRITE_LIMIT: usize = 8;

const OAM_ENTRIES: usize = OAM_SIZE / 4;

// number of bytes occupied by a single tile in pattern memory
const TILE_BYTES: u16 = 16;

/// Does not render any pixels, but still reloads the vertical scroll
const S_PRE_RENDER: i32 = -1;

/// First row of pixels are rendered in this scanline
const S_RENDER_START: i32 = 0;

/// Last row of pixels are rendered in this scanline
const S_RENDER_END: i32 = 239;

/// Idle scanline that occurs between rendering and VBLANK
const S_POST_RENDER: i32 = 240;

/// First scanline of the VBLANK Period
const S_VBLANK_START: i32 = 241;

/// Last scanline of VBLANK and final scanline of the frame
const S_VBLANK_END: i32 = 260;

/// Final cycle of each scanline
const C_HBLANK_END: u32 = 340;

/// A sprite selected for the next scanline, with its pattern row already fetched
/// (and mirrored when the sprite is flipped horizontally).
#[derive(Clone, Copy, Debug)]
struct LineSprite {
    x: u8,
    pattern_lo: u8,
    pattern_hi: u8,
    palette: u16,
    in_front: bool,
    is_sprite_zero: bool,
}

impl LineSprite {
    #[inline]
    fn pixel_at(&self, x: usize) -> u8 {
        let dx = x.wrapping_sub(self.x as usize);
        if dx >= 8 {
            return 0;
        }

        let bit = 7 - dx;
        (((self.pattern_hi >> bit) & 0x01) << 1) | ((self.pattern_lo >> bit) & 0x01)
    }
}

pub struct Ppu2C02 {
    frame: Vec<u8>,
    pub cycles: u32,
    pub scanline: i32,

    line_sprites: Vec<LineSprite>,
    sprite_limit: bool,

    odd_frame: bool,
    frame_complete: bool,

    total_dots: u64,
    frame_start_dot: u64,
    last_frame_dots: u64,
}

impl SystemControl for Ppu2C02 {
    fn reset(&mut self) {
        self.cycles = 0;
        self.scanline = S_PRE_RENDER;

        self.line_sprites.clear();

        self.odd_frame = false;
        self.frame_complete = false;

        self.frame_start_dot = self.total_dots;
    }
}

impl Ppu2C02 {
    pub fn new(sprite_limit: bool) -> Self {
        Self {
            frame: vec![0; FRAME_BYTES],
            cycles: 0,
            scanline: S_PRE_RENDER,

            line_sprites: Vec::with_capacity(OAM_ENTRIES),
            sprite_limit,

            odd_frame: false,
            frame_complete: false,

            total_dots: 0,
            frame_start_dot: 0,
            last_frame_dots: 0,
        }
    }

    /// Advances the PPU by one dot.
    pub fn clock(&mut self, bus: &mut SystemBus) {
        match self.scanline {
            S_PRE_RENDER..=S_RENDER_END => {
                if self.scanline == S_PRE_RENDER && self.cycles == 1 {
                    bus.ppu_bus.status.remove(PpuStatus::IN_VBLANK | PpuStatus::SPR_OVERFLOW | PpuStatus::SPR_0_HIT);
                    self.line_sprites.clear();
                }

                if self.scanline >= S_RENDER_START && matches!(self.cycles, 1..=256) {
                    self.render_pixel(bus, self.cycles as usize - 1);
                }

                if bus.ppu_bus.rendering_enabled() {
                    match self.cycles {
                        256 => bus.ppu_bus.vram_addr.increment_vertical(),
                        257 => {
                            let tram_addr = bus.ppu_bus.tram_addr;
                            bus.ppu_bus.vram_addr.set_horizontal_to_tram(&tram_addr);
                        }
                        // reset vram vertical scroll bits
                        280..=304 if self.scanline == S_PRE_RENDER => {
                            let tram_addr = bus.ppu_bus.tram_addr;
                            bus.ppu_bus.vram_addr.set_vertical_to_tram(&tram_addr);
                        }
                        _ => {}
                    }
                }

                // fetch sprites for the next scanline and update SPR_OVERFLOW
                if self.cycles == 257 && self.scanline >= S_RENDER_START {
                    self.evaluate_sprites(bus);
                }
            }
            S_POST_RENDER => {} // Idle Scanline
            S_VBLANK_START..=S_VBLANK_END => {
                if self.scanline == S_VBLANK_START && self.cycles == 1 {
                    bus.ppu_bus.status.insert(PpuStatus::IN_VBLANK);

                    if bus.ppu_bus.ctrl.nmi_enabled() {
                        bus.ppu_bus.raise_nmi();
                    }

                    self.frame_complete = true;
                    self.last_frame_dots = self.total_dots - self.frame_start_dot;
                    self.frame_start_dot = self.total_dots;
                }
            }
            _ => {}
        }

        // Update PPU state
        self.cycles += 1;
        self.total_dots += 1;

        if bus.ppu_bus.rendering_enabled() {
            if self.cycles == 260 && self.scanline < S_POST_RENDER {
                bus.cartridge.notify_scanline();
            }

            // odd frames drop the last dot of the pre-render line
            if self.odd_frame && self.cycles == C_HBLANK_END && self.scanline == S_PRE_RENDER {
                self.cycles += 1;
            }
        }

        if self.cycles > C_HBLANK_END {
            self.cycles = 0;
            self.scanline += 1;

            if self.scanline > S_VBLANK_END {
                self.scanline = S_PRE_RENDER;
                self.odd_frame = !self.odd_frame;
            }
        }
    }

    /// Returns true once per frame, after the PPU enters vertical blank.
    pub fn take_frame_complete(&mut self) -> bool {
        std::mem::take(&mut self.frame_complete)
    }

    /// The current framebuffer as packed B, G, R bytes.
    pub fn frame(&self) -> &[u8] {
        &self.frame
    }

    pub fn total_dots(&self) -> u64 {
        self.total_dots
    }

    /// Dots between the two most recent vertical blank entries.
    pub fn last_frame_dots(&self) -> u64 {
        self.last_frame_dots
    }

    fn evaluate_sprites(&mut self, bus: &mut SystemBus) {
        self.line_sprites.clear();

        let spr_height = bus.ppu_bus.ctrl.spr_height();
        let mut found = 0;

        for index in 0..OAM_ENTRIES {
            let sprite = bus.ppu_bus.read_oam_entry(index);
            let y_dist = self.scanline - sprite.y as i32;

            if !(0..spr_height).contains(&y_dist) {
                continue;
            }

            found += 1;
            if found > SPRITE_LIMIT {
                bus.ppu_bus.status.insert(PpuStatus::SPR_OVERFLOW);
                if self.sprite_limit {
                    break;
                }
            }

            let y_dist = y_dist as u16;
            let mut y_offset = y_dist & 0x07;
            if sprite.y_flipped() { y_offset = 7 - y_offset; }

            let pattern_addr_lo = if spr_height == 8 {
                bus.ppu_bus.ctrl.spr_pattern_addr()
                    | (sprite.id as u16 * TILE_BYTES)
                    | y_offset
            } else {
                let tile = (sprite.id & 0b11111110) as u16;
                let tile_offset = if (y_dist < 8) ^ sprite.y_flipped() {
                    tile * TILE_BYTES
                } else {
                    (tile + 1) * TILE_BYTES
                };

                (((sprite.id & 0x01) as u16) << 12)
                    | tile_offset
                    | y_offset
            };

            let mut pattern_lo = bus.ppu_read(pattern_addr_lo);
            let mut pattern_hi = bus.ppu_read(pattern_addr_lo + 8);

            if sprite.x_flipped() {
                pattern_lo = REVERSED_BYTE[pattern_lo as usize];
                pattern_hi = REVERSED_BYTE[pattern_hi as usize];
            }

            self.line_sprites.push(LineSprite {
                x: sprite.x,
                pattern_lo,
                pattern_hi,
                palette: sprite.palette() + 0x04,
                in_front: sprite.in_front(),
                is_sprite_zero: index == 0,
            });
        }
    }

    /// Background pixel and palette at column `x` of the current scanline.
    fn background_pixel(&self, bus: &mut SystemBus, x: usize) -> (u8, u16) {
        let vram_addr = bus.ppu_bus.vram_addr;

        // horizontal position within the two side-by-side nametables
        let scroll_x = (vram_addr.coarse_x() << 3) + bus.ppu_bus.fine_x as u16 + x as u16;
        let name_table_x = vram_addr.name_table_x() ^ ((scroll_x >> 8) & 0x01);
        let tile_x = (scroll_x >> 3) & 0x1F;
        let coarse_y = vram_addr.coarse_y();
        let name_table_select = (vram_addr.name_table_y() << 11) | (name_table_x << 10);

        let tile_id = bus.ppu_read(NAME_TABLE_START | name_table_select | (coarse_y << 5) | tile_x);

        let attr = bus.ppu_read(ATTR_TABLE_START | name_table_select | ((coarse_y >> 2) << 3) | (tile_x >> 2));
        let attr_shift = ((coarse_y & 0x02) << 1) | (tile_x & 0x02);
        let palette = ((attr >> attr_shift) & 0x03) as u16;

        let pattern_addr = bus.ppu_bus.ctrl.bg_pattern_addr()
            + (tile_id as u16) * TILE_BYTES
            + vram_addr.fine_y();
        let bit = 7 - (scroll_x & 0x07);
        let lo = (bus.ppu_read(pattern_addr) >> bit) & 0x01;
        let hi = (bus.ppu_read(pattern_addr + 8) >> bit) & 0x01;

        ((hi << 1) | lo, palette)
    }

    fn render_pixel(&mut self, bus: &mut SystemBus, x: usize) {
        let mask = bus.ppu_bus.mask;

        // Background Rendering
        let (bg_pixel, bg_palette) = if mask.show_bg() && (mask.show_bg_left() || x >= 8) {
            self.background_pixel(bus, x)
        } else {
            (0, 0)
        };

        // Sprite / Foreground Rendering
        let mut sprite = None;
        if mask.show_spr() && (mask.show_spr_left() || x >= 8) {
            sprite = self.line_sprites.iter()
                .map(|spr| (spr, spr.pixel_at(x)))
                .find(|&(_, pixel)| pixel != 0);
        }

        // Resolve Background and Sprite/Foreground priority
        let (pixel, palette) = match (bg_pixel, sprite) {
            (0, None) => (0, 0),
            (0, Some((spr, spr_pixel))) => (spr_pixel, spr.palette),
            (bg_pixel, None) => (bg_pixel, bg_palette),
            (bg_pixel, Some((spr, spr_pixel))) => {
                if spr.is_sprite_zero && Self::sprite_zero_hit_possible(mask, x) {
                    bus.ppu_bus.status.insert(PpuStatus::SPR_0_HIT);
                }

                if spr.in_front {
                    (spr_pixel, spr.palette)
                } else {
                    (bg_pixel, bg_palette)
                }
            }
        };

        let palette_index = bus.ppu_read(PALETTE_TABLE_START + (palette << 2) + pixel as u16) as usize;
        let (r, g, b) = DISPLAY_PALETTE[palette_index & 0x3F];

        let offset = ((self.scanline as usize) * DISPLAY_WIDTH + x) * 3;
        self.frame[offset..offset + 3].copy_from_slice(&[b, g, r]);
    }

    #[inline]
    fn sprite_zero_hit_possible(mask: PpuMask, x: usize) -> bool {
        let left_clipped = !(mask.show_bg_left() && mask.show_spr_left());

        mask.show_bg() && mask.show_spr()
            && !(x < 8 && left_clipped)
            && x != 255
    }
}

lazy_static! {
    static ref REVERSED_BYTE: Vec<u8> = (0..=255u8).map(|x| x.reverse_bits()).collect();
}
