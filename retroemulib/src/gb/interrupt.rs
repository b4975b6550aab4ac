bitflags! {
    /// Bit layout shared by IF (0xFF0F) and IE (0xFFFF). Lower bits have higher priority.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Interrupt: u8 {
        const VBLANK   = 0b00000001;
        const LCD_STAT = 0b00000010;
        const TIMER    = 0b00000100;
        const SERIAL   = 0b00001000;
        const JOYPAD   = 0b00010000;
    }
}

impl Interrupt {
    /// The highest priority interrupt in the set, if any.
    pub fn highest_priority(self) -> Option<Interrupt> {
        (!self.is_empty()).then(|| Interrupt::from_bits_truncate(self.bits() & self.bits().wrapping_neg()))
    }

    pub fn vector(self) -> u16 {
        // one handler every 8 bytes from 0x40, by bit position
        0x0040 + 8 * self.bits().trailing_zeros().min(4) as u16
    }
}
