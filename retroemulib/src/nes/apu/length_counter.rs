use crate::SystemControl;

const LENGTH_LOOKUP: [u8; 0x20] = [
    10,254, 20,  2, 40,  4, 80,  6, 160,  8, 60, 10, 14, 12, 26, 14,
    12, 16, 24, 18, 48, 20, 96, 22, 192, 24, 72, 26, 16, 28, 32, 30
];

/// Silences a channel after a programmed number of half-frame clocks.
pub struct LengthCounter {
    pub halted: bool,
    enabled: bool,
    counter: u8,
}

impl SystemControl for LengthCounter {
    fn reset(&mut self) {
        self.halted = false;
        self.enabled = false;
        self.counter = 0;
    }
}

impl LengthCounter {
    pub fn new() -> Self {
        Self {
            halted: false,
            enabled: false,
            counter: 0,
        }
    }

    pub fn clock(&mut self) {
        if !self.halted && self.counter > 0 {
            self.counter -= 1;
        }
    }

    /// Loads from the 5-bit index written to a channel's fourth register. Ignored while disabled.
    pub fn load(&mut self, index: u8) {
        if self.enabled {
            self.counter = LENGTH_LOOKUP[(index & 0x1F) as usize];
        }
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
        if !enabled {
            self.counter = 0;
        }
    }

    #[inline]
    pub fn active(&self) -> bool {
        self.counter > 0
    }
}

#[cfg(test)]
mod tests {
    use super::LengthCounter;

    #[test]
    fn test_load_requires_enable() {
        let mut length = LengthCounter::new();
        length.load(0x01);
        assert!(!length.active());

        length.set_enabled(true);
        length.load(0x03);
        assert!(length.active());
        // index 3 is a length of 2
        length.clock();
        assert!(length.active());
        length.clock();
        assert!(!length.active());
    }

    #[test]
    fn test_halt_and_disable() {
        let mut length = LengthCounter::new();
        length.set_enabled(true);
        length.load(0x03);
        length.halted = true;
        length.clock();
        length.clock();
        assert!(length.active());

        length.set_enabled(false);
        assert!(!length.active());
    }
}
