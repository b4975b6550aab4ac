/// Volume unit: either a constant volume or a decay level stepped by quarter-frame clocks.
pub struct Envelope {
    pub start: bool,
    pub looping: bool,
    pub constant: bool,
    volume: u8,

    divider: u8,
    decay_level: u8,
}

impl Envelope {
    pub fn new() -> Self {
        Self {
            start: false,
            looping: false,
            constant: false,
            volume: 0,

            divider: 0,
            decay_level: 0,
        }
    }

    /// Bits 0-5 of a channel's first register.
    pub fn write_control(&mut self, byte: u8) {
        self.looping = (byte & 0b00100000) != 0;
        self.constant = (byte & 0b00010000) != 0;
        self.volume = byte & 0b00001111;
    }

    pub fn clock(&mut self) {
        if self.start {
            self.start = false;
            self.decay_level = 15;
            self.divider = self.volume;
            return;
        }

        if self.divider > 0 {
            self.divider -= 1;
            return;
        }

        self.divider = self.volume;
        if self.decay_level > 0 {
            self.decay_level -= 1;
        } else if self.looping {
            self.decay_level = 15;
        }
    }

    pub fn output(&self) -> u8 {
        if self.constant { self.volume } else { self.decay_level }
    }
}
