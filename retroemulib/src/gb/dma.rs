use crate::gb::bus::GbBus;
use crate::gb::io::IoRegistry;
use crate::{EmulationError, SystemControl};

pub const DMA_REG: u16 = 0xFF46;

pub const OAM_DMA_LENGTH: u8 = 0xA0;
const STARTUP_DELAY: u8 = 1;

/// OAM DMA. Writing P to 0xFF46 copies 160 bytes from P*0x100 into OAM, one
/// byte per M-cycle after a single M-cycle of startup.
pub struct OamDma {
    reg: u8,
    source: u16,
    index: u8,
    startup_delay: u8,
    active: bool,
}

impl SystemControl for OamDma {
    fn reset(&mut self) {
        self.reg = 0xFF;
        self.source = 0;
        self.index = 0;
        self.startup_delay = 0;
        self.active = false;
    }
}

impl OamDma {
    pub fn new() -> Self {
        Self {
            reg: 0xFF,
            source: 0,
            index: 0,
            startup_delay: 0,
            active: false,
        }
    }

    pub fn start(&mut self, page: u8) {
        self.reg = page;

        // sources past 0xDFFF read the echo of work RAM
        let page = if page >= 0xE0 { page - 0x20 } else { page };
        self.source = (page as u16) << 8;
        self.index = 0;
        self.startup_delay = STARTUP_DELAY;
        self.active = true;

        tracing::trace!("OAM DMA from {:04X}", self.source);
    }

    /// While a transfer runs the CPU cannot see OAM.
    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Advances one M-cycle. Returns the (source address, OAM index) of the byte
    /// to copy this cycle, if any.
    pub fn next_transfer(&mut self) -> Option<(u16, u8)> {
        if !self.active {
            return None;
        }

        if self.startup_delay > 0 {
            self.startup_delay -= 1;
            return None;
        }

        let transfer = (self.source + self.index as u16, self.index);
        self.index += 1;
        if self.index == OAM_DMA_LENGTH {
            self.active = false;
        }

        Some(transfer)
    }

    pub fn register_io(registry: &mut IoRegistry) -> Result<(), EmulationError> {
        registry.register(DMA_REG,
            |bus: &GbBus, _| bus.dma.reg,
            |bus: &mut GbBus, _, byte| bus.dma.start(byte))
    }
}
