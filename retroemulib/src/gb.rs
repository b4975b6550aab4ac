mod apu;
mod bus;
mod cartridge;
mod cpu;
mod dma;
mod interrupt;
mod io;
mod joypad;
mod mbc;
mod ppu;
mod timer;

pub use apu::Apu;
pub use bus::{GbBus, BOOT_ROM_SIZE};
pub use cartridge::{CartridgeGb, CartridgeHeader, MbcKind};
pub use cpu::{CpuLr35902, CpuSnapshot, Flags, Registers};
pub use interrupt::Interrupt;
pub use ppu::{Mode, Ppu, DISPLAY_HEIGHT, DISPLAY_WIDTH};

use std::path::Path;

use crate::config::DmgShade;
use crate::joypad::{Button, JoypadState};
use crate::{EmulationError, EmulatorConfig, FrameCallback, LoadError, LoadState, StepGate, SystemControl};

/// A whole DMG: LR35902 CPU, PPU, APU, timer, OAM DMA and the cartridge, stepped one
/// instruction at a time.
pub struct GameBoy {
    cpu: CpuLr35902,
    bus: Option<GbBus>,

    shades: [DmgShade; 4],
    boot_rom: Option<Vec<u8>>,
    joypad_state: JoypadState,

    load_state: LoadState,
    fault: Option<EmulationError>,

    frame_callback: Option<FrameCallback>,
    step_gate: Option<StepGate>,

    total_cycles: u64,
    frame_count: u64,
}

impl SystemControl for GameBoy {
    fn reset(&mut self) {
        self.fault = None;
        self.total_cycles = 0;
        self.joypad_state = JoypadState::empty();

        let Some(bus) = &mut self.bus else {
            self.cpu = CpuLr35902::new();
            return;
        };

        bus.reset();
        match &self.boot_rom {
            Some(boot_rom) => {
                bus.map_boot_rom(boot_rom.clone());
                self.cpu = CpuLr35902::new();
            }
            None => {
                bus.skip_boot();
                self.cpu = CpuLr35902::post_boot();
            }
        }
    }
}

impl GameBoy {
    pub fn new(config: &EmulatorConfig) -> Self {
        Self {
            cpu: CpuLr35902::new(),
            bus: None,

            shades: config.dmg_palette,
            boot_rom: None,
            joypad_state: JoypadState::empty(),

            load_state: LoadState::NotLoaded,
            fault: None,

            frame_callback: None,
            step_gate: None,

            total_cycles: 0,
            frame_count: 0,
        }
    }

    pub fn from_rom_bytes(data: &[u8], config: &EmulatorConfig) -> Result<Self, LoadError> {
        let mut gameboy = GameBoy::new(config);
        gameboy.load_rom_bytes(data)?;
        Ok(gameboy)
    }

    /// Runs `boot_rom` from 0x0000 on every reset instead of starting in the post-boot state.
    pub fn with_boot_rom(mut self, boot_rom: &[u8]) -> Result<Self, LoadError> {
        if boot_rom.len() != BOOT_ROM_SIZE {
            return Err(LoadError::Truncated { expected: BOOT_ROM_SIZE, found: boot_rom.len() });
        }

        self.boot_rom = Some(boot_rom.to_vec());
        self.reset();
        Ok(self)
    }

    pub fn load_rom_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<(), LoadError> {
        let result = CartridgeGb::from_rom_file(file_path.as_ref());
        self.insert_cartridge(result)
    }

    pub fn load_rom_bytes(&mut self, data: &[u8]) -> Result<(), LoadError> {
        let result = CartridgeGb::from_rom_bytes(data);
        self.insert_cartridge(result)
    }

    fn insert_cartridge(&mut self, result: Result<CartridgeGb, LoadError>) -> Result<(), LoadError> {
        match result {
            Ok(cartridge) => {
                self.bus = Some(GbBus::new(cartridge, self.shades));
                self.load_state = LoadState::Loaded;
                self.reset();
                Ok(())
            }
            Err(err) => {
                tracing::warn!("failed to load ROM image: {}", err);
                self.bus = None;
                self.load_state = LoadState::from_error(&err);
                Err(err)
            }
        }
    }

    pub fn unload(&mut self) {
        if self.bus.take().is_some() {
            tracing::info!("cartridge unloaded");
        }
        self.load_state = LoadState::NotLoaded;
        self.reset();
    }

    pub fn load_state(&self) -> LoadState {
        self.load_state
    }

    pub fn header(&self) -> Option<&CartridgeHeader> {
        self.bus.as_ref().map(|bus| bus.cartridge.header())
    }

    pub fn set_frame_callback(&mut self, callback: FrameCallback) {
        self.frame_callback = Some(callback);
    }

    pub fn set_step_gate(&mut self, gate: StepGate) {
        self.step_gate = Some(gate);
    }

    /// Runs one CPU instruction (or interrupt entry, or halted idle), then clocks every
    /// peripheral once per T-cycle it took. Returns the T-cycles consumed.
    pub fn step(&mut self) -> Result<u32, EmulationError> {
        if self.fault.is_some() {
            return Err(EmulationError::SessionHalted);
        }

        if let Some(gate) = self.step_gate.as_mut() {
            gate();
        }

        let bus = self.bus.as_mut().ok_or(EmulationError::NotLoaded)?;

        let cycles = match self.cpu.step(bus) {
            Ok(cycles) => cycles,
            Err(err) => {
                tracing::error!("emulation halted: {}", err);
                self.fault = Some(err.clone());
                return Err(err);
            }
        };

        for _ in 0..cycles {
            bus.tick();

            if bus.ppu.take_frame_complete() {
                self.frame_count += 1;
                if let Some(callback) = self.frame_callback.as_mut() {
                    callback(bus.ppu.frame());
                }
            }
        }

        self.total_cycles += cycles as u64;
        Ok(cycles)
    }

    /// Steps until the PPU next enters vertical blank.
    pub fn run_frame(&mut self) -> Result<(), EmulationError> {
        let frame = self.frame_count;
        while self.frame_count == frame {
            self.step()?;
        }
        Ok(())
    }

    pub fn press(&mut self, button: Button) {
        self.joypad_state.press(button);
        self.update_joypad();
    }

    pub fn release(&mut self, button: Button) {
        self.joypad_state.release(button);
        self.update_joypad();
    }

    fn update_joypad(&mut self) {
        if let Some(bus) = &mut self.bus {
            if bus.joypad.update(self.joypad_state, &mut bus.interrupt_flag) {
                self.cpu.wake_from_stop();
            }
        }
    }

    pub fn save_ram(&self) -> Option<&[u8]> {
        self.bus.as_ref().and_then(|bus| bus.cartridge.save_ram())
    }

    pub fn load_save_ram(&mut self, data: &[u8]) -> Result<(), LoadError> {
        match &mut self.bus {
            Some(bus) => bus.cartridge.load_save_ram(data),
            None => Err(LoadError::NoSaveRam),
        }
    }

    /// Reads a byte through the CPU bus, subject to the same mode blocking a CPU read is.
    pub fn read_memory(&self, addr: u16) -> Option<u8> {
        self.bus.as_ref().map(|bus| bus.read(addr))
    }

    pub fn write_memory(&mut self, addr: u16, byte: u8) {
        if let Some(bus) = &mut self.bus {
            bus.write(addr, byte);
        }
    }

    pub fn cpu_snapshot(&self) -> CpuSnapshot {
        self.cpu.snapshot()
    }

    pub fn set_registers(&mut self, registers: Registers) {
        self.cpu.set_registers(registers);
    }

    /// Current picture as packed B,G,R bytes.
    pub fn frame(&self) -> Option<&[u8]> {
        self.bus.as_ref().map(|bus| bus.ppu.frame())
    }

    /// Latest mixed sample of the square channels, 0.0 to 1.0.
    pub fn audio_sample(&self) -> f32 {
        self.bus.as_ref().map_or(0.0, |bus| bus.apu.output())
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// PPU dots between the two most recent frame completions.
    pub fn last_frame_dots(&self) -> u64 {
        self.bus.as_ref().map_or(0, |bus| bus.ppu.last_frame_dots())
    }

    pub fn fault(&self) -> Option<&EmulationError> {
        self.fault.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::cell::Cell;
    use std::rc::Rc;

    use crate::gb::cartridge::marker_rom;

    /// ROM-only image with `program` at the 0x0100 entry point.
    fn program_rom(program: &[u8]) -> Vec<u8> {
        let mut rom = marker_rom(0x00, 0, 0);
        rom[0x100..0x100 + program.len()].copy_from_slice(program);
        rom
    }

    #[test]
    fn test_load_states() {
        let mut gameboy = GameBoy::new(&EmulatorConfig::default());
        assert_eq!(gameboy.load_state(), LoadState::NotLoaded);
        assert_eq!(gameboy.step(), Err(EmulationError::NotLoaded));

        assert!(gameboy.load_rom_bytes(&[0x00; 0x100]).is_err());
        assert_eq!(gameboy.load_state(), LoadState::Invalid);

        assert!(gameboy.load_rom_file("/nonexistent/rom.gb").is_err());
        assert_eq!(gameboy.load_state(), LoadState::FailedToOpen);

        gameboy.load_rom_bytes(&program_rom(&[0x00])).unwrap();
        assert_eq!(gameboy.load_state(), LoadState::Loaded);
        assert_eq!(gameboy.header().map(|header| header.title.as_str()), Some("TEST"));

        gameboy.unload();
        assert_eq!(gameboy.load_state(), LoadState::NotLoaded);
        assert!(gameboy.frame().is_none());
    }

    #[test]
    fn test_fault_halts_session() {
        let mut gameboy = GameBoy::from_rom_bytes(&program_rom(&[0x00, 0xDD]), &EmulatorConfig::default()).unwrap();
        assert_eq!(gameboy.step(), Ok(4));
        assert!(matches!(gameboy.step(), Err(EmulationError::UnimplementedOpcode { opcode: 0xDD, pc: 0x0101, .. })));
        assert_eq!(gameboy.step(), Err(EmulationError::SessionHalted));

        gameboy.reset();
        assert_eq!(gameboy.step(), Ok(4));
    }

    #[test]
    fn test_frame_callback_once_per_frame() {
        // JR -2
        let mut gameboy = GameBoy::from_rom_bytes(&program_rom(&[0x18, 0xFE]), &EmulatorConfig::default()).unwrap();

        let frames = Rc::new(Cell::new(0));
        let counter = Rc::clone(&frames);
        gameboy.set_frame_callback(Box::new(move |frame: &[u8]| {
            assert_eq!(frame.len(), DISPLAY_WIDTH * DISPLAY_HEIGHT * 3);
            counter.set(counter.get() + 1);
        }));

        gameboy.run_frame().unwrap();
        gameboy.run_frame().unwrap();
        assert_eq!(frames.get(), 2);
        assert_eq!(gameboy.last_frame_dots(), 70224);
    }

    #[test]
    fn test_step_gate_runs_before_each_step() {
        let mut gameboy = GameBoy::from_rom_bytes(&program_rom(&[0x00, 0x00, 0x00]), &EmulatorConfig::default()).unwrap();

        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        gameboy.set_step_gate(Box::new(move || counter.set(counter.get() + 1)));

        for _ in 0..3 {
            gameboy.step().unwrap();
        }
        assert_eq!(calls.get(), 3);
        assert_eq!(gameboy.total_cycles(), 12);
    }

    #[test]
    fn test_joypad_through_p1() {
        let mut gameboy = GameBoy::from_rom_bytes(&program_rom(&[0x00]), &EmulatorConfig::default()).unwrap();
        gameboy.write_memory(0xFF0F, 0x00);

        gameboy.press(Button::Start);
        assert_eq!(gameboy.read_memory(0xFF0F).map(|byte| byte & 0x10), Some(0x10));

        // action group selected
        gameboy.write_memory(0xFF00, 0x10);
        assert_eq!(gameboy.read_memory(0xFF00), Some(0xD7));

        // direction group selected
        gameboy.write_memory(0xFF00, 0x20);
        assert_eq!(gameboy.read_memory(0xFF00), Some(0xEF));

        gameboy.release(Button::Start);
        gameboy.write_memory(0xFF00, 0x10);
        assert_eq!(gameboy.read_memory(0xFF00), Some(0xDF));
    }

    #[test]
    fn test_boot_rom_runs_from_zero() {
        // LD A,0x01; LDH (0x50),A
        let mut boot_rom = vec![0x00; BOOT_ROM_SIZE];
        boot_rom[..4].copy_from_slice(&[0x3E, 0x01, 0xE0, 0x50]);

        let gameboy = GameBoy::from_rom_bytes(&program_rom(&[0x00]), &EmulatorConfig::default()).unwrap();
        let mut gameboy = gameboy.with_boot_rom(&boot_rom).unwrap();
        assert_eq!(gameboy.cpu_snapshot().registers.pc, 0x0000);
        assert_eq!(gameboy.cpu_snapshot().registers.af(), 0x0000);

        gameboy.step().unwrap();
        gameboy.step().unwrap();
        assert_eq!(gameboy.read_memory(0x0000), Some(0x00));
        assert_eq!(gameboy.cpu_snapshot().registers.pc, 0x0004);
    }

    #[test]
    fn test_boot_rom_size_checked() {
        let gameboy = GameBoy::new(&EmulatorConfig::default());
        assert!(matches!(
            gameboy.with_boot_rom(&[0x00; 0x80]),
            Err(LoadError::Truncated { expected: 0x100, found: 0x80 })
        ));
    }

    #[test]
    fn test_save_ram_round_trip() {
        let mut gameboy = GameBoy::from_rom_bytes(&marker_rom(0x03, 1, 2), &EmulatorConfig::default()).unwrap();
        gameboy.write_memory(0x0000, 0x0A);
        gameboy.write_memory(0xA000, 0x5A);
        assert_eq!(gameboy.save_ram().map(|ram| ram[0]), Some(0x5A));

        let mut dump = vec![0u8; 0x2000];
        dump[1] = 0x77;
        gameboy.load_save_ram(&dump).unwrap();
        assert_eq!(gameboy.read_memory(0xA001), Some(0x77));
        assert!(gameboy.load_save_ram(&[0u8; 16]).is_err());
    }
}
