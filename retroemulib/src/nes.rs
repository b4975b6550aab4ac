mod apu;
mod bus;
mod cartridge;
mod cpu;
mod mapper;
mod ppu;

pub use apu::Apu2A03;
pub use bus::SystemBus;
pub use cartridge::{CartridgeNes, INesHeader, Mirroring, Region};
pub use cpu::{Cpu6502, CpuSnapshot, Status};
pub use ppu::{Ppu2C02, DISPLAY_HEIGHT, DISPLAY_WIDTH};

use std::path::Path;

use crate::joypad::Button;
use crate::{EmulationError, EmulatorConfig, FrameCallback, LoadError, LoadState, StepGate, SystemControl};

const PPU_DOTS_PER_CPU_CYCLE: u32 = 3;

// OAM DMA halts the CPU for 513 cycles, plus one when it starts on an odd cycle
const OAM_DMA_CYCLES: u32 = 513;

/// A whole NES: 6502 CPU, 2C02 PPU, 2A03 APU and the cartridge, stepped one instruction at a time.
pub struct Nes {
    cpu: Cpu6502,
    ppu: Ppu2C02,
    bus: Option<SystemBus>,

    load_state: LoadState,
    fault: Option<EmulationError>,

    frame_callback: Option<FrameCallback>,
    step_gate: Option<StepGate>,

    total_cycles: u64,
    frame_count: u64,
}

impl SystemControl for Nes {
    fn reset(&mut self) {
        self.ppu.reset();
        self.fault = None;
        self.total_cycles = 0;

        if let Some(bus) = &mut self.bus {
            bus.reset();
            self.total_cycles = self.cpu.reset(bus) as u64;
        }
    }
}

impl Nes {
    pub fn new(config: &EmulatorConfig) -> Self {
        Self {
            cpu: Cpu6502::new(config.allow_unofficial_opcodes),
            ppu: Ppu2C02::new(config.sprite_limit),
            bus: None,

            load_state: LoadState::NotLoaded,
            fault: None,

            frame_callback: None,
            step_gate: None,

            total_cycles: 0,
            frame_count: 0,
        }
    }

    pub fn from_ines_bytes(data: &[u8], config: &EmulatorConfig) -> Result<Self, LoadError> {
        let mut nes = Nes::new(config);
        nes.load_ines_bytes(data)?;
        Ok(nes)
    }

    pub fn load_ines_file<P: AsRef<Path>>(&mut self, file_path: P) -> Result<(), LoadError> {
        let result = CartridgeNes::from_ines_file(file_path.as_ref());
        self.insert_cartridge(result)
    }

    pub fn load_ines_bytes(&mut self, data: &[u8]) -> Result<(), LoadError> {
        let result = CartridgeNes::from_ines_bytes(data);
        self.insert_cartridge(result)
    }

    fn insert_cartridge(&mut self, result: Result<CartridgeNes, LoadError>) -> Result<(), LoadError> {
        match result {
            Ok(cartridge) => {
                self.bus = Some(SystemBus::new(cartridge));
                self.load_state = LoadState::Loaded;
                self.reset();
                Ok(())
            }
            Err(err) => {
                tracing::warn!("failed to load iNES image: {}", err);
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

    pub fn header(&self) -> Option<&INesHeader> {
        self.bus.as_ref().map(|bus| bus.cartridge.header())
    }

    pub fn set_frame_callback(&mut self, callback: FrameCallback) {
        self.frame_callback = Some(callback);
    }

    pub fn set_step_gate(&mut self, gate: StepGate) {
        self.step_gate = Some(gate);
    }

    /// Runs one CPU instruction (or interrupt entry), then clocks the APU once and the
    /// PPU three times for every cycle it took. Returns the CPU cycles consumed.
    pub fn step(&mut self) -> Result<u32, EmulationError> {
        if self.fault.is_some() {
            return Err(EmulationError::SessionHalted);
        }

        if let Some(gate) = self.step_gate.as_mut() {
            gate();
        }

        let bus = self.bus.as_mut().ok_or(EmulationError::NotLoaded)?;

        let mut cycles = match self.cpu.step(bus) {
            Ok(cycles) => cycles,
            Err(err) => {
                tracing::error!("emulation halted: {}", err);
                self.fault = Some(err.clone());
                return Err(err);
            }
        };

        if let Some(page) = bus.take_dma_request() {
            bus.oam_dma(page);
            cycles += OAM_DMA_CYCLES + ((self.total_cycles + cycles as u64) & 0x01) as u32;
        }

        for _ in 0..cycles {
            bus.apu.cpu_clock();

            for _ in 0..PPU_DOTS_PER_CPU_CYCLE {
                self.ppu.clock(bus);

                if self.ppu.take_frame_complete() {
                    self.frame_count += 1;
                    if let Some(callback) = self.frame_callback.as_mut() {
                        callback(self.ppu.frame());
                    }
                }
            }
        }

        if bus.ppu_bus.take_nmi() {
            self.cpu.request_nmi();
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

    pub fn press(&mut self, port: usize, button: Button) {
        if let Some(bus) = &mut self.bus {
            let mut state = bus.joypad_state(port);
            state.press(button);
            bus.update_joypad_state(port, state);
        }
    }

    pub fn release(&mut self, port: usize, button: Button) {
        if let Some(bus) = &mut self.bus {
            let mut state = bus.joypad_state(port);
            state.release(button);
            bus.update_joypad_state(port, state);
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

    /// Reads a byte through the CPU bus, with the same side effects a CPU read would have.
    pub fn read_memory(&mut self, addr: u16) -> Option<u8> {
        self.bus.as_mut().map(|bus| bus.cpu_read(addr))
    }

    pub fn write_memory(&mut self, addr: u16, byte: u8) {
        if let Some(bus) = &mut self.bus {
            bus.cpu_write(addr, byte);
        }
    }

    pub fn cpu_snapshot(&self) -> CpuSnapshot {
        self.cpu.snapshot()
    }

    pub fn frame(&self) -> &[u8] {
        self.ppu.frame()
    }

    pub fn total_cycles(&self) -> u64 {
        self.total_cycles
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// PPU dots between the two most recent frame completions.
    pub fn last_frame_dots(&self) -> u64 {
        self.ppu.last_frame_dots()
    }

    pub fn fault(&self) -> Option<&EmulationError> {
        self.fault.as_ref()
    }
}
