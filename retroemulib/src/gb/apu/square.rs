use crate::SystemControl;

const DUTY_PATTERNS: [[u8; 8]; 4] = [
    [0, 0, 0, 0, 0, 0, 0, 1], // 12.5%
    [1, 0, 0, 0, 0, 0, 0, 1], // 25%
    [1, 0, 0, 0, 0, 1, 1, 1], // 50%
    [0, 1, 1, 1, 1, 1, 1, 0], // 75%
];

const LENGTH_MAX: u16 = 64;
const FREQUENCY_MAX: u16 = 2047;

/// Square channel 1 (with frequency sweep) or 2. Register offsets 0-4 map to
/// NRx0-NRx4; channel 2 has no NRx0.
pub struct SquareChannel {
    has_sweep: bool,
    registers: [u8; 5],

    enabled: bool,
    frequency: u16,
    timer: u16,
    duty_step: usize,

    length: u16,

    volume: u8,
    envelope_timer: u8,

    sweep_timer: u8,
    sweep_enabled: bool,
    shadow_frequency: u16,
}

impl SystemControl for SquareChannel {
    fn reset(&mut self) {
        *self = SquareChannel::new(self.has_sweep);
    }
}

impl SquareChannel {
    pub fn new(has_sweep: bool) -> Self {
        Self {
            has_sweep,
            registers: [0; 5],

            enabled: false,
            frequency: 0,
            timer: 0,
            duty_step: 0,

            length: 0,

            volume: 0,
            envelope_timer: 0,

            sweep_timer: 0,
            sweep_enabled: false,
            shadow_frequency: 0,
        }
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    #[inline]
    pub fn register(&self, offset: usize) -> u8 {
        self.registers[offset]
    }

    #[inline]
    fn duty(&self) -> usize {
        (self.registers[1] >> 6) as usize
    }

    #[inline]
    fn length_enabled(&self) -> bool {
        self.registers[4] & 0b01000000 != 0
    }

    /// The DAC is powered whenever the upper five bits of NRx2 are not all zero.
    #[inline]
    fn dac_enabled(&self) -> bool {
        self.registers[2] & 0b11111000 != 0
    }

    #[inline]
    fn envelope_period(&self) -> u8 {
        self.registers[2] & 0b00000111
    }

    #[inline]
    fn sweep_period(&self) -> u8 {
        (self.registers[0] >> 4) & 0b00000111
    }

    #[inline]
    fn sweep_shift(&self) -> u8 {
        self.registers[0] & 0b00000111
    }

    /// Period of the duty step timer in T-cycles.
    #[inline]
    pub fn timer_period(&self) -> u16 {
        (2048 - self.frequency) * 4
    }

    pub fn write(&mut self, offset: usize, byte: u8) {
        self.registers[offset] = byte;

        match offset {
            1 => self.length = LENGTH_MAX - (byte & 0b00111111) as u16,
            2 => {
                if !self.dac_enabled() {
                    self.enabled = false;
                }
            }
            3 => self.frequency = (self.frequency & 0x0700) | byte as u16,
            4 => {
                self.frequency = (self.frequency & 0x00FF) | ((byte & 0b00000111) as u16) << 8;
                if byte & 0b10000000 != 0 {
                    self.trigger();
                }
            }
            _ => {}
        }
    }

    fn trigger(&mut self) {
        self.enabled = self.dac_enabled();
        if self.length == 0 {
            self.length = LENGTH_MAX;
        }

        self.timer = self.timer_period();
        self.volume = self.registers[2] >> 4;
        self.envelope_timer = self.envelope_period();

        if self.has_sweep {
            self.shadow_frequency = self.frequency;
            self.sweep_timer = reload_value(self.sweep_period());
            self.sweep_enabled = self.sweep_period() != 0 || self.sweep_shift() != 0;

            if self.sweep_shift() != 0 && self.next_sweep_frequency() > FREQUENCY_MAX {
                self.enabled = false;
            }
        }
    }

    /// Advances the frequency timer by one T-cycle.
    #[inline]
    pub fn tick(&mut self) {
        if self.timer <= 1 {
            self.timer = self.timer_period();
            self.duty_step = (self.duty_step + 1) & 0x07;
        } else {
            self.timer -= 1;
        }
    }

    pub fn clock_length(&mut self) {
        if self.length_enabled() && self.length > 0 {
            self.length -= 1;
            if self.length == 0 {
                self.enabled = false;
            }
        }
    }

    pub fn clock_envelope(&mut self) {
        let period = self.envelope_period();
        if period == 0 {
            return;
        }

        if self.envelope_timer > 0 {
            self.envelope_timer -= 1;
        }

        if self.envelope_timer == 0 {
            self.envelope_timer = period;

            let increase = self.registers[2] & 0b00001000 != 0;
            if increase && self.volume < 15 {
                self.volume += 1;
            } else if !increase && self.volume > 0 {
                self.volume -= 1;
            }
        }
    }

    pub fn clock_sweep(&mut self) {
        if !self.has_sweep {
            return;
        }

        if self.sweep_timer > 0 {
            self.sweep_timer -= 1;
        }

        if self.sweep_timer != 0 {
            return;
        }

        self.sweep_timer = reload_value(self.sweep_period());
        if !self.sweep_enabled || self.sweep_period() == 0 {
            return;
        }

        let frequency = self.next_sweep_frequency();
        if frequency > FREQUENCY_MAX {
            self.enabled = false;
        } else if self.sweep_shift() != 0 {
            self.shadow_frequency = frequency;
            self.frequency = frequency;
            self.registers[3] = frequency as u8;
            self.registers[4] = (self.registers[4] & 0b11111000) | (frequency >> 8) as u8;

            if self.next_sweep_frequency() > FREQUENCY_MAX {
                self.enabled = false;
            }
        }
    }

    fn next_sweep_frequency(&self) -> u16 {
        let delta = self.shadow_frequency >> self.sweep_shift();
        if self.registers[0] & 0b00001000 != 0 {
            self.shadow_frequency.wrapping_sub(delta)
        } else {
            self.shadow_frequency + delta
        }
    }

    /// Current 4-bit output level.
    pub fn output(&self) -> u8 {
        if !self.enabled || !self.dac_enabled() {
            return 0;
        }

        DUTY_PATTERNS[self.duty()][self.duty_step] * self.volume
    }
}

/// Sweep and envelope periods of 0 behave as 8 for their timers.
#[inline]
fn reload_value(period: u8) -> u8 {
    if period == 0 { 8 } else { period }
}

#[cfg(test)]
mod tests {
    use super::SquareChannel;

    #[test]
    fn test_duty_pattern_walk() {
        let mut channel = SquareChannel::new(false);
        // 25% duty, volume 15, frequency 2047 (period 4 T-cycles)
        channel.write(1, 0b0100_0000);
        channel.write(2, 0xF0);
        channel.write(3, 0xFF);
        channel.write(4, 0x87);
        assert!(channel.enabled());
        assert_eq!(channel.timer_period(), 4);

        let mut pattern = Vec::new();
        for _ in 0..8 {
            for _ in 0..4 {
                channel.tick();
            }
            pattern.push(channel.output());
        }
        assert_eq!(pattern, vec![0, 0, 0, 0, 0, 0, 15, 15]);
    }

    #[test]
    fn test_length_expiry_disables() {
        let mut channel = SquareChannel::new(false);
        channel.write(1, 62);
        channel.write(2, 0xF0);
        channel.write(4, 0xC0);
        channel.clock_length();
        assert!(channel.enabled());
        channel.clock_length();
        assert!(!channel.enabled());
    }

    #[test]
    fn test_dac_off_blocks_trigger() {
        let mut channel = SquareChannel::new(false);
        channel.write(2, 0x07);
        channel.write(4, 0x80);
        assert!(!channel.enabled());
    }

    #[test]
    fn test_envelope_decreases() {
        let mut channel = SquareChannel::new(false);
        channel.write(1, 0xC0);
        channel.write(2, 0x31);
        channel.write(4, 0x80);
        channel.clock_envelope();
        channel.clock_envelope();
        channel.clock_envelope();
        channel.clock_envelope();
        assert!(channel.enabled());
        for _ in 0..8 {
            channel.tick();
        }
        assert_eq!(channel.output(), 0);
    }

    #[test]
    fn test_sweep_overflow_disables() {
        let mut channel = SquareChannel::new(true);
        // period 1, increase, shift 1
        channel.write(0, 0x11);
        channel.write(2, 0xF0);
        channel.write(3, 0x00);
        channel.write(4, 0x85);
        assert!(channel.enabled());

        // 0x500 + 0x280 = 0x780, next would be 0xB40
        channel.clock_sweep();
        assert_eq!(channel.register(3), 0x80);
        assert!(!channel.enabled());
    }
}
