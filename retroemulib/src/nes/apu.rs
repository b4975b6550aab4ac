mod envelope;
mod frame_sequencer;
mod length_counter;
mod pulse;
mod sweep;

use self::frame_sequencer::{FrameClock, FrameSequencer};
use self::length_counter::LengthCounter;
use self::pulse::Pulse;

use crate::SystemControl;

const APU_REG_START: u16 = 0x4000;
const APU_REG_END: u16 = 0x4017;
pub const APU_STATUS_REG: u16 = 0x4015;
pub const FRAME_COUNTER_REG: u16 = 0x4017;

/// The 2A03's audio unit. Both pulse channels are synthesized; the triangle, noise
/// and DMC channels keep their register contents and length counters for $4015.
pub struct Apu2A03 {
    frame_sequencer: FrameSequencer,
    pulse1: Pulse,
    pulse2: Pulse,
    triangle_length: LengthCounter,
    noise_length: LengthCounter,

    registers: [u8; (APU_REG_END - APU_REG_START + 1) as usize],

    total_cycles: u64,
    frame_irq: bool,
}

impl SystemControl for Apu2A03 {
    fn reset(&mut self) {
        self.frame_sequencer.reset();
        self.pulse1.reset();
        self.pulse2.reset();
        self.triangle_length.reset();
        self.noise_length.reset();
        self.registers = [0; (APU_REG_END - APU_REG_START + 1) as usize];
        self.total_cycles = 0;
        self.frame_irq = false;
    }
}

impl Apu2A03 {
    pub fn new() -> Self {
        Self {
            frame_sequencer: FrameSequencer::new(),
            pulse1: Pulse::new(true),
            pulse2: Pulse::new(false),
            triangle_length: LengthCounter::new(),
            noise_length: LengthCounter::new(),

            registers: [0; (APU_REG_END - APU_REG_START + 1) as usize],

            total_cycles: 0,
            frame_irq: false,
        }
    }

    /// Called once per CPU cycle.
    pub fn cpu_clock(&mut self) {
        if let Some(clock) = self.frame_sequencer.clock(&mut self.frame_irq) {
            self.clock_frame_units(clock);
        }

        self.total_cycles += 1;

        if self.total_cycles % 2 == 0 {
            self.pulse1.clock_timer();
            self.pulse2.clock_timer();
        }
    }

    fn clock_frame_units(&mut self, clock: FrameClock) {
        self.pulse1.envelope.clock();
        self.pulse2.envelope.clock();

        if clock == FrameClock::Half {
            self.pulse1.length_counter.clock();
            self.pulse2.length_counter.clock();
            self.triangle_length.clock();
            self.noise_length.clock();

            self.pulse1.clock_sweep();
            self.pulse2.clock_sweep();
        }
    }

    /// Level of the frame counter IRQ line.
    #[inline]
    pub fn irq_pending(&self) -> bool {
        self.frame_irq
    }

    /// Mixed pulse output in the range 0.0 to about 0.26, using the documented non-linear mix.
    pub fn pulse_output(&self) -> f32 {
        let sum = (self.pulse1.output() + self.pulse2.output()) as f32;
        if sum == 0.0 {
            0.0
        } else {
            95.88 / (8128.0 / sum + 100.0)
        }
    }

    /// Last value written to an APU register (0x4000-0x4017).
    pub fn register(&self, addr: u16) -> Option<u8> {
        (APU_REG_START..=APU_REG_END).contains(&addr)
            .then(|| self.registers[(addr - APU_REG_START) as usize])
    }

    /// Reads $4015. Clears the frame IRQ.
    pub fn read_status(&mut self) -> u8 {
        let mut byte = 0;

        if self.pulse1.length_counter.active() { byte |= 1 << 0; }
        if self.pulse2.length_counter.active() { byte |= 1 << 1; }
        if self.triangle_length.active()       { byte |= 1 << 2; }
        if self.noise_length.active()          { byte |= 1 << 3; }
        if self.frame_irq                      { byte |= 1 << 6; }

        self.frame_irq = false;

        byte
    }

    pub fn write_register(&mut self, addr: u16, byte: u8) {
        if let Some(slot) = self.registers.get_mut(addr.wrapping_sub(APU_REG_START) as usize) {
            *slot = byte;
        }

        match addr {
            0x4000..=0x4003 => self.pulse1.write_register(addr, byte),
            0x4004..=0x4007 => self.pulse2.write_register(addr, byte),
            0x4008 => self.triangle_length.halted = (byte & 0b10000000) != 0,
            0x400B => self.triangle_length.load(byte >> 3),
            0x400C => self.noise_length.halted = (byte & 0b00100000) != 0,
            0x400F => self.noise_length.load(byte >> 3),
            APU_STATUS_REG => {
                self.pulse1.length_counter.set_enabled((byte & 0b00000001) != 0);
                self.pulse2.length_counter.set_enabled((byte & 0b00000010) != 0);
                self.triangle_length.set_enabled((byte & 0b00000100) != 0);
                self.noise_length.set_enabled((byte & 0b00001000) != 0);
            }
            FRAME_COUNTER_REG => {
                if let Some(clock) = self.frame_sequencer.write_control(byte) {
                    self.clock_frame_units(clock);
                }

                if self.frame_sequencer.irq_inhibit {
                    self.frame_irq = false;
                }
            }
            _ => {}
        }
    }
}
