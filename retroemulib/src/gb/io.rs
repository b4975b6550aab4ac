use crate::gb::apu::Apu;
use crate::gb::bus::GbBus;
use crate::gb::dma::OamDma;
use crate::gb::joypad::JoypadPort;
use crate::gb::ppu::Ppu;
use crate::gb::timer::Timer;
use crate::EmulationError;

pub const IO_START: u16 = 0xFF00;
pub const IO_END: u16 = 0xFF7F;
const IO_PAGE_SIZE: usize = (IO_END - IO_START + 1) as usize;

pub type IoRead = fn(&GbBus, u16) -> u8;
pub type IoWrite = fn(&mut GbBus, u16, u8);

/// Getter and setter bound to one IO address. Both receive the address, so one
/// pair can serve a block of registers.
#[derive(Clone, Copy)]
pub struct IoPort {
    pub read: IoRead,
    pub write: IoWrite,
}

/// Address to port table for the IO page (0xFF00-0xFF7F). Each peripheral
/// contributes its own registers.
pub struct IoRegistry {
    ports: [Option<IoPort>; IO_PAGE_SIZE],
}

lazy_static! {
    pub static ref IO_REGISTRY: IoRegistry = match IoRegistry::build() {
        Ok(registry) => registry,
        Err(err) => panic!("failed to build IO registry: {}", err),
    };
}

impl IoRegistry {
    pub fn new() -> Self {
        Self {
            ports: [None; IO_PAGE_SIZE],
        }
    }

    /// The registry with every peripheral's registers bound.
    pub fn build() -> Result<Self, EmulationError> {
        let mut registry = IoRegistry::new();

        GbBus::register_io(&mut registry)?;
        JoypadPort::register_io(&mut registry)?;
        Timer::register_io(&mut registry)?;
        OamDma::register_io(&mut registry)?;
        Ppu::register_io(&mut registry)?;
        Apu::register_io(&mut registry)?;

        Ok(registry)
    }

    pub fn register(&mut self, addr: u16, read: IoRead, write: IoWrite) -> Result<(), EmulationError> {
        let index = match addr {
            IO_START..=IO_END => (addr - IO_START) as usize,
            _ => return Err(EmulationError::InvalidOperand { mnemonic: "IO register outside 0xFF00-0xFF7F" }),
        };

        if self.ports[index].is_some() {
            return Err(EmulationError::DuplicateIoRegistration(addr));
        }

        self.ports[index] = Some(IoPort { read, write });
        Ok(())
    }

    #[inline]
    pub fn port(&self, addr: u16) -> Option<IoPort> {
        match addr {
            IO_START..=IO_END => self.ports[(addr - IO_START) as usize],
            _ => None,
        }
    }

    pub fn registered_count(&self) -> usize {
        self.ports.iter().filter(|port| port.is_some()).count()
    }
}
