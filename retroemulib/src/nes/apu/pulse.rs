use crate::SystemControl;

use super::envelope::Envelope;
use super::length_counter::LengthCounter;
use super::sweep::Sweep;

const DUTY_SEQUENCES: [[u8; 8]; 4] = [
    [0, 1, 0, 0, 0, 0, 0, 0],
    [0, 1, 1, 0, 0, 0, 0, 0],
    [0, 1, 1, 1, 1, 0, 0, 0],
    [1, 0, 0, 1, 1, 1, 1, 1],
];

/// Square wave channel driven by an 11-bit timer period.
pub struct Pulse {
    duty: usize,
    duty_step: usize,

    pub length_counter: LengthCounter,
    pub envelope: Envelope,
    sweep: Sweep,

    timer_period: u16,
    timer: u16,
}

impl SystemControl for Pulse {
    fn reset(&mut self) {
        self.duty = 0;
        self.duty_step = 0;
        self.length_counter.reset();
        self.envelope = Envelope::new();
        self.sweep.reset();
        self.timer_period = 0;
        self.timer = 0;
    }
}

impl Pulse {
    pub fn new(ones_complement_sweep: bool) -> Self {
        Self {
            duty: 0,
            duty_step: 0,

            length_counter: LengthCounter::new(),
            envelope: Envelope::new(),
            sweep: Sweep::new(ones_complement_sweep),

            timer_period: 0,
            timer: 0,
        }
    }

    /// Writes one of the channel's four registers, `reg` being the address offset 0-3.
    pub fn write_register(&mut self, reg: u16, byte: u8) {
        match reg & 0x03 {
            0 => {
                self.duty = ((byte & 0b11000000) >> 6) as usize;
                self.length_counter.halted = (byte & 0b00100000) != 0;
                self.envelope.write_control(byte);
            }
            1 => self.sweep.write_control(byte),
            2 => self.timer_period = (self.timer_period & 0x0700) | byte as u16,
            _ => {
                self.timer_period = (self.timer_period & 0x00FF) | (((byte & 0b00000111) as u16) << 8);
                self.length_counter.load(byte >> 3);
                self.envelope.start = true;
                self.duty_step = 0;
            }
        }
    }

    /// Advances the timer by one APU cycle (every other CPU cycle).
    pub fn clock_timer(&mut self) {
        if self.timer == 0 {
            self.timer = self.timer_period;
            self.duty_step = (self.duty_step + 1) & 0x07;
        } else {
            self.timer -= 1;
        }
    }

    pub fn clock_sweep(&mut self) {
        self.sweep.clock(&mut self.timer_period);
    }

    pub fn timer_period(&self) -> u16 {
        self.timer_period
    }

    /// Current 4-bit output level.
    pub fn output(&self) -> u8 {
        if !self.length_counter.active()
            || self.sweep.mutes(self.timer_period)
            || DUTY_SEQUENCES[self.duty][self.duty_step] == 0 {
            return 0;
        }

        self.envelope.output()
    }
}
