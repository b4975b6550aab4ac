const PATTERN_TABLE_0_ADDR: u16 = 0x0000;
const PATTERN_TABLE_1_ADDR: u16 = 0x1000;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuCtrl: u8 {
        const NAME_TABLE_X     = 0b00000001;
        const NAME_TABLE_Y     = 0b00000010;
        const VRAM_ADDR_INC    = 0b00000100;
        const SPR_PATTERN_ADDR = 0b00001000;
        const BG_PATTERN_ADDR  = 0b00010000;
        const SPR_SIZE         = 0b00100000;
        const MASTER_SELECT    = 0b01000000;
        const NMI_ENABLED      = 0b10000000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuMask: u8 {
        const GREYSCALE_ON  = 0b00000001;
        const SHOW_BG_LEFT  = 0b00000010;
        const SHOW_SPR_LEFT = 0b00000100;
        const SHOW_BG       = 0b00001000;
        const SHOW_SPR      = 0b00010000;
        const EMP_RED       = 0b00100000;
        const EMP_GREEN     = 0b01000000;
        const EMP_BLUE      = 0b10000000;
    }

    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct PpuStatus: u8 {
        const SPR_OVERFLOW = 0b00100000;
        const SPR_0_HIT    = 0b01000000;
        const IN_VBLANK    = 0b10000000;
    }
}

impl PpuCtrl {
    #[inline]
    pub fn vram_addr_inc(&self) -> u16 {
        if self.contains(PpuCtrl::VRAM_ADDR_INC) { 32 } else { 1 }
    }

    /// Pattern table for 8x8 sprites; 8x16 sprites pick theirs from the tile index.
    #[inline]
    pub fn spr_pattern_addr(&self) -> u16 {
        if self.contains(PpuCtrl::SPR_PATTERN_ADDR) { PATTERN_TABLE_1_ADDR } else { PATTERN_TABLE_0_ADDR }
    }

    #[inline]
    pub fn bg_pattern_addr(&self) -> u16 {
        if self.contains(PpuCtrl::BG_PATTERN_ADDR) { PATTERN_TABLE_1_ADDR } else { PATTERN_TABLE_0_ADDR }
    }

    #[inline]
    pub fn spr_height(&self) -> i32 {
        if self.contains(PpuCtrl::SPR_SIZE) { 16 } else { 8 }
    }

    #[inline]
    pub fn nmi_enabled(&self) -> bool {
        self.contains(PpuCtrl::NMI_ENABLED)
    }
}

impl PpuMask {
    #[inline]
    pub fn greyscale_on(&self) -> bool {
        self.contains(PpuMask::GREYSCALE_ON)
    }

    #[inline]
    pub fn show_bg_left(&self) -> bool {
        self.contains(PpuMask::SHOW_BG_LEFT)
    }

    #[inline]
    pub fn show_spr_left(&self) -> bool {
        self.contains(PpuMask::SHOW_SPR_LEFT)
    }

    #[inline]
    pub fn show_bg(&self) -> bool {
        self.contains(PpuMask::SHOW_BG)
    }

    #[inline]
    pub fn show_spr(&self) -> bool {
        self.contains(PpuMask::SHOW_SPR)
    }

    #[inline]
    pub fn rendering_enabled(&self) -> bool {
        self.intersects(PpuMask::SHOW_BG | PpuMask::SHOW_SPR)
    }
}

/// The 15-bit scroll/address register layout shared by the PPU's `v` and `t`:
/// `yyy NN YYYYY XXXXX` (fine Y, nametable select, coarse Y, coarse X).
#[derive(Default, Clone, Copy, Debug, PartialEq, Eq)]
pub struct LoopyPpuReg(pub u16);

// Credits to Loopy: https://www.nesdev.org/wiki/PPU_scrolling
impl LoopyPpuReg {
    pub const COARSE_X: u16     = 0b0000000000011111;
    pub const COARSE_Y: u16     = 0b0000001111100000;
    pub const NAME_TABLE_X: u16 = 0b0000010000000000;
    pub const NAME_TABLE_Y: u16 = 0b0000100000000000;
    pub const FINE_Y: u16       = 0b0111000000000000;

    const HORIZONTAL_BITS: u16 = Self::COARSE_X | Self::NAME_TABLE_X;
    const VERTICAL_BITS: u16 = Self::COARSE_Y | Self::NAME_TABLE_Y | Self::FINE_Y;

    #[inline]
    pub fn set_horizontal_to_tram(&mut self, tram_addr: &LoopyPpuReg) {
        self.0 = (self.0 & !Self::HORIZONTAL_BITS) | (tram_addr.0 & Self::HORIZONTAL_BITS);
    }

    #[inline]
    pub fn set_vertical_to_tram(&mut self, tram_addr: &LoopyPpuReg) {
        self.0 = (self.0 & !Self::VERTICAL_BITS) | (tram_addr.0 & Self::VERTICAL_BITS);
    }

    /// Steps fine Y, carrying into coarse Y. Row 29 wraps into the other
    /// vertical nametable; rows 30-31 (attribute memory) wrap without switching.
    #[inline]
    pub fn increment_vertical(&mut self) {
        if self.fine_y() < 7 {
            self.set_mask(Self::FINE_Y, self.fine_y() + 1);
            return;
        }

        self.set_mask(Self::FINE_Y, 0);
        match self.coarse_y() {
            29 => {
                self.set_mask(Self::COARSE_Y, 0);
                self.0 ^= Self::NAME_TABLE_Y;
            }
            31 => self.set_mask(Self::COARSE_Y, 0),
            y => self.set_mask(Self::COARSE_Y, y + 1),
        }
    }

    #[inline]
    pub fn coarse_x(&self) -> u16 {
        self.get_mask(Self::COARSE_X)
    }

    #[inline]
    pub fn coarse_y(&self) -> u16 {
        self.get_mask(Self::COARSE_Y)
    }

    #[inline]
    pub fn name_table_x(&self) -> u16 {
        self.get_mask(Self::NAME_TABLE_X)
    }

    #[inline]
    pub fn name_table_y(&self) -> u16 {
        self.get_mask(Self::NAME_TABLE_Y)
    }

    #[inline]
    pub fn fine_y(&self) -> u16 {
        self.get_mask(Self::FINE_Y)
    }

    #[inline]
    pub fn set_mask(&mut self, mask: u16, val: u16) {
        self.0 &= !mask;
        self.0 |= (val << mask.trailing_zeros()) & mask
    }

    #[inline]
    pub fn get_mask(&self, mask: u16) -> u16 {
        (self.0 & mask) >> mask.trailing_zeros()
    }
}

#[cfg(test)]
mod tests {
    use super::LoopyPpuReg;

    #[test]
    fn test_increment_vertical_wraps_nametable() {
        let mut v = LoopyPpuReg(0);
        v.set_mask(LoopyPpuReg::FINE_Y, 7);
        v.set_mask(LoopyPpuReg::COARSE_Y, 29);
        v.increment_vertical();
        assert_eq!(v.fine_y(), 0);
        assert_eq!(v.coarse_y(), 0);
        assert_eq!(v.name_table_y(), 1);
    }

    #[test]
    fn test_increment_vertical_attribute_rows() {
        let mut v = LoopyPpuReg(0);
        v.set_mask(LoopyPpuReg::FINE_Y, 7);
        v.set_mask(LoopyPpuReg::COARSE_Y, 31);
        v.increment_vertical();
        assert_eq!(v.coarse_y(), 0);
        assert_eq!(v.name_table_y(), 0);
    }

    #[test]
    fn test_copy_from_tram() {
        let t = LoopyPpuReg(0b0101_1010_1011_0111);
        let mut v = LoopyPpuReg(0);
        v.set_horizontal_to_tram(&t);
        assert_eq!(v.coarse_x(), t.coarse_x());
        assert_eq!(v.name_table_x(), t.name_table_x());
        assert_eq!(v.coarse_y(), 0);

        v.set_vertical_to_tram(&t);
        assert_eq!(v.0, t.0 & 0x7FFF);
    }
}
