mod square;

use self::square::SquareChannel;

use crate::gb::bus::GbBus;
use crate::gb::io::IoRegistry;
use crate::{EmulationError, SystemControl};

const NR10_REG: u16 = 0xFF10;
const NR14_REG: u16 = 0xFF14;
const NR21_REG: u16 = 0xFF16;
const NR24_REG: u16 = 0xFF19;
const NR30_REG: u16 = 0xFF1A;
const NR44_REG: u16 = 0xFF23;
const NR50_REG: u16 = 0xFF24;
const NR51_REG: u16 = 0xFF25;
pub const NR52_REG: u16 = 0xFF26;
const WAVE_RAM_START: u16 = 0xFF30;
const WAVE_RAM_END: u16 = 0xFF3F;

// registers 0xFF10-0xFF25; 0xFF15 and 0xFF1F do not exist
const REGISTER_COUNT: usize = (NR51_REG - NR10_REG + 1) as usize;

/// Bits that always read back as 1, indexed from NR10.
const READ_MASKS: [u8; REGISTER_COUNT] = [
    0x80, 0x3F, 0x00, 0xFF, 0xBF, // NR10-NR14
    0xFF, 0x3F, 0x00, 0xFF, 0xBF, // NR20-NR24
    0x7F, 0xFF, 0x9F, 0xFF, 0xBF, // NR30-NR34
    0xFF, 0xFF, 0x00, 0x00, 0xBF, // NR40-NR44
    0x00, 0x00,                   // NR50-NR51
];

const NR52_POWER: u8 = 0b10000000;

/// The DMG audio unit. Both square channels are synthesized; the wave and noise
/// channels, the mixer and wave RAM keep their register contents only.
pub struct Apu {
    square1: SquareChannel,
    square2: SquareChannel,

    registers: [u8; REGISTER_COUNT],
    wave_ram: [u8; 0x10],

    powered: bool,
    frame_step: u8,
}

impl SystemControl for Apu {
    fn reset(&mut self) {
        self.square1.reset();
        self.square2.reset();
        self.registers = [0; REGISTER_COUNT];
        self.wave_ram = [0; 0x10];
        self.powered = false;
        self.frame_step = 0;
    }
}

impl Apu {
    pub fn new() -> Self {
        Self {
            square1: SquareChannel::new(true),
            square2: SquareChannel::new(false),

            registers: [0; REGISTER_COUNT],
            wave_ram: [0; 0x10],

            powered: false,
            frame_step: 0,
        }
    }

    /// Audio state as the DMG boot ROM leaves it, after its start-up chime on channel 1.
    pub fn post_boot() -> Self {
        let mut apu = Apu::new();
        apu.write_nr52(NR52_POWER);
        apu.write_register(NR50_REG, 0x77);
        apu.write_register(NR51_REG, 0xF3);
        apu.write_register(NR10_REG, 0x80);
        apu.write_register(0xFF11, 0x80);
        apu.write_register(0xFF12, 0xF3);
        apu.write_register(NR14_REG, 0x87);
        apu
    }

    /// Advances the channel timers by one T-cycle.
    #[inline]
    pub fn tick(&mut self) {
        if !self.powered {
            return;
        }

        self.square1.tick();
        self.square2.tick();
    }

    /// One step of the 512 Hz frame sequencer, driven by the divider. Length counters
    /// run on even steps, sweep on steps 2 and 6, envelopes on step 7.
    pub fn clock_frame_sequencer(&mut self) {
        if !self.powered {
            return;
        }

        if self.frame_step % 2 == 0 {
            self.square1.clock_length();
            self.square2.clock_length();
        }

        if self.frame_step == 2 || self.frame_step == 6 {
            self.square1.clock_sweep();
        }

        if self.frame_step == 7 {
            self.square1.clock_envelope();
            self.square2.clock_envelope();
        }

        self.frame_step = (self.frame_step + 1) & 0x07;
    }

    /// Both square channels mixed to the range 0.0 to 1.0.
    pub fn output(&self) -> f32 {
        (self.square1.output() + self.square2.output()) as f32 / 30.0
    }

    pub fn read_register(&self, addr: u16) -> u8 {
        match addr {
            NR10_REG..=NR14_REG => self.square1.register((addr - NR10_REG) as usize) | self.read_mask(addr),
            // NR21-NR24 sit at offsets 1-4 of the second channel
            NR21_REG..=NR24_REG => self.square2.register((addr - NR21_REG + 1) as usize) | self.read_mask(addr),
            NR30_REG..=NR51_REG => self.registers[(addr - NR10_REG) as usize] | self.read_mask(addr),
            NR52_REG => self.read_nr52(),
            WAVE_RAM_START..=WAVE_RAM_END => self.wave_ram[(addr - WAVE_RAM_START) as usize],
            _ => 0xFF,
        }
    }

    #[inline]
    fn read_mask(&self, addr: u16) -> u8 {
        READ_MASKS[(addr - NR10_REG) as usize]
    }

    pub fn write_register(&mut self, addr: u16, byte: u8) {
        if let WAVE_RAM_START..=WAVE_RAM_END = addr {
            self.wave_ram[(addr - WAVE_RAM_START) as usize] = byte;
            return;
        }

        if addr == NR52_REG {
            self.write_nr52(byte);
            return;
        }

        if !self.powered {
            tracing::trace!("dropped APU write {:02X} at {:04X} while powered off", byte, addr);
            return;
        }

        match addr {
            NR10_REG..=NR14_REG => self.square1.write((addr - NR10_REG) as usize, byte),
            NR21_REG..=NR24_REG => self.square2.write((addr - NR21_REG + 1) as usize, byte),
            NR30_REG..=NR44_REG | NR50_REG | NR51_REG => self.registers[(addr - NR10_REG) as usize] = byte,
            _ => {}
        }
    }

    fn read_nr52(&self) -> u8 {
        (self.powered as u8) << 7
            | 0b01110000
            | (self.square1.enabled() as u8)
            | (self.square2.enabled() as u8) << 1
    }

    fn write_nr52(&mut self, byte: u8) {
        let power = byte & NR52_POWER != 0;

        if self.powered && !power {
            // powering down clears every register but wave RAM
            self.square1.reset();
            self.square2.reset();
            self.registers = [0; REGISTER_COUNT];
            tracing::debug!("APU powered off");
        } else if !self.powered && power {
            self.frame_step = 0;
        }

        self.powered = power;
    }

    pub fn register_io(registry: &mut IoRegistry) -> Result<(), EmulationError> {
        for addr in (NR10_REG..=NR52_REG).chain(WAVE_RAM_START..=WAVE_RAM_END) {
            if addr == 0xFF15 || addr == 0xFF1F {
                continue;
            }

            registry.register(addr,
                |bus: &GbBus, addr| bus.apu.read_register(addr),
                |bus: &mut GbBus, addr, byte| bus.apu.write_register(addr, byte))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn powered_apu() -> Apu {
        let mut apu = Apu::new();
        apu.write_register(NR52_REG, 0x80);
        apu
    }

    #[test]
    fn test_read_masks() {
        let mut apu = powered_apu();
        apu.write_register(0xFF11, 0x80);
        apu.write_register(NR10_REG, 0x00);
        apu.write_register(0xFF1C, 0x00);
        assert_eq!(apu.read_register(0xFF11), 0xBF);
        assert_eq!(apu.read_register(NR10_REG), 0x80);
        assert_eq!(apu.read_register(0xFF13), 0xFF);
        assert_eq!(apu.read_register(0xFF1C), 0x9F);
        assert_eq!(apu.read_register(NR52_REG), 0xF0);
    }

    #[test]
    fn test_trigger_sets_status() {
        let mut apu = powered_apu();
        apu.write_register(0xFF17, 0xF0);
        apu.write_register(NR24_REG, 0x80);
        assert_eq!(apu.read_register(NR52_REG), 0xF2);
    }

    #[test]
    fn test_power_off_clears_registers() {
        let mut apu = powered_apu();
        apu.write_register(NR50_REG, 0x77);
        apu.write_register(0xFF30, 0x12);
        apu.write_register(NR52_REG, 0x00);

        assert_eq!(apu.read_register(NR50_REG), 0x00);
        assert_eq!(apu.read_register(NR52_REG), 0x70);
        assert_eq!(apu.read_register(0xFF30), 0x12);

        apu.write_register(NR50_REG, 0x55);
        assert_eq!(apu.read_register(NR50_REG), 0x00);
    }

    #[test]
    fn test_frame_sequencer_clocks_length() {
        let mut apu = powered_apu();
        apu.write_register(0xFF11, 63);
        apu.write_register(0xFF12, 0xF0);
        apu.write_register(NR14_REG, 0xC0);
        assert_eq!(apu.read_register(NR52_REG) & 0x01, 0x01);

        apu.clock_frame_sequencer();
        assert_eq!(apu.read_register(NR52_REG) & 0x01, 0x00);
    }

    #[test]
    fn test_post_boot_state() {
        let apu = Apu::post_boot();
        assert_eq!(apu.read_register(NR52_REG), 0xF1);
        assert_eq!(apu.read_register(NR50_REG), 0x77);
        assert_eq!(apu.read_register(NR51_REG), 0xF3);
    }
}
