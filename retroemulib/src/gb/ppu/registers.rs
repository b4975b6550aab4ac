const TILE_MAP_0_ADDR: u16 = 0x9800;
const TILE_MAP_1_ADDR: u16 = 0x9C00;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Lcdc: u8 {
        const BG_WINDOW_ENABLE = 0b00000001;
        const OBJ_ENABLE       = 0b00000010;
        const OBJ_SIZE         = 0b00000100;
        const BG_TILE_MAP      = 0b00001000;
        const TILE_DATA_8000   = 0b00010000;
        const WINDOW_ENABLE    = 0b00100000;
        const WINDOW_TILE_MAP  = 0b01000000;
        const LCD_ENABLE       = 0b10000000;
    }

    /// The writable STAT interrupt selects plus the read-only coincidence bit.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Stat: u8 {
        const LYC_EQUAL  = 0b00000100;
        const HBLANK_INT = 0b00001000;
        const VBLANK_INT = 0b00010000;
        const OAM_INT    = 0b00100000;
        const LYC_INT    = 0b01000000;
    }
}

impl Lcdc {
    #[inline]
    pub fn lcd_enabled(&self) -> bool {
        self.contains(Lcdc::LCD_ENABLE)
    }

    #[inline]
    pub fn obj_height(&self) -> u8 {
        if self.contains(Lcdc::OBJ_SIZE) { 16 } else { 8 }
    }

    #[inline]
    pub fn bg_tile_map(&self) -> u16 {
        if self.contains(Lcdc::BG_TILE_MAP) { TILE_MAP_1_ADDR } else { TILE_MAP_0_ADDR }
    }

    #[inline]
    pub fn window_tile_map(&self) -> u16 {
        if self.contains(Lcdc::WINDOW_TILE_MAP) { TILE_MAP_1_ADDR } else { TILE_MAP_0_ADDR }
    }

    /// Address of row `row` of BG/window tile `index`. With bit 4 clear the index is
    /// signed and based at 0x9000.
    #[inline]
    pub fn tile_data_addr(&self, index: u8, row: u8) -> u16 {
        let base = if self.contains(Lcdc::TILE_DATA_8000) {
            0x8000 + index as u16 * 16
        } else {
            0x9000u16.wrapping_add((index as i8 as i16 * 16) as u16)
        };

        base + row as u16 * 2
    }
}

impl Stat {
    pub const WRITABLE: u8 = 0b01111000;
}

/// STAT mode bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Drawing = 3,
}
