use crate::joypad::JoypadState;
use crate::nes::apu::{Apu2A03, APU_STATUS_REG};
use crate::nes::cartridge::CartridgeNes;
use crate::nes::ppu::PpuBus;
use crate::SystemControl;

const CPU_RAM_START: u16 = 0x0000;
const CPU_RAM_END: u16 = 0x1FFF;
const PPU_REG_START: u16 = 0x2000;
const PPU_REG_END: u16 = 0x3FFF;
const APU_REG_START: u16 = 0x4000;
const APU_REG_END: u16 = 0x4017;

pub const DMA_REG_ADDR: u16 = 0x4014;
const JOYPAD1_REG: u16 = 0x4016;
const JOYPAD2_REG: u16 = 0x4017;

const CPU_RAM_LENGTH: usize = 0x800;

/// CPU address space routing. The cartridge is offered every access first, then the
/// console's own RAM, PPU registers, APU and controller ports.
pub struct SystemBus {
    pub cartridge: CartridgeNes,
    pub ppu_bus: PpuBus,
    pub apu: Apu2A03,

    cpu_ram: [u8; CPU_RAM_LENGTH],
    joypad_shifters: [u8; 2],
    joypad_state: [JoypadState; 2],
    joypad_strobe: bool,

    // last byte seen on the CPU data bus
    open_bus: u8,
    dma_page: Option<u8>,
}

impl SystemControl for SystemBus {
    fn reset(&mut self) {
        self.cartridge.reset();
        self.ppu_bus.reset();
        self.apu.reset();
        self.joypad_state = [JoypadState::empty(); 2];
        self.joypad_shifters = [0; 2];
        self.joypad_strobe = false;
        self.open_bus = 0;
        self.dma_page = None;
    }
}

impl SystemBus {
    pub fn new(cartridge: CartridgeNes) -> Self {
        Self {
            cartridge,
            ppu_bus: PpuBus::new(),
            apu: Apu2A03::new(),

            cpu_ram: [0; CPU_RAM_LENGTH],
            joypad_shifters: [0; 2],
            joypad_state: [JoypadState::empty(); 2],
            joypad_strobe: false,

            open_bus: 0,
            dma_page: None,
        }
    }

    pub fn cpu_read(&mut self, addr: u16) -> u8 {
        let byte = match self.cartridge.cpu_read(addr) {
            Some(byte) => byte,
            None => match addr {
                CPU_RAM_START..=CPU_RAM_END => {
                    self.cpu_ram[addr as usize % CPU_RAM_LENGTH]
                }
                PPU_REG_START..=PPU_REG_END => {
                    self.ppu_bus.cpu_read_reg(addr, &mut self.cartridge)
                }
                APU_STATUS_REG => {
                    // bit 5 is not driven
                    self.apu.read_status() | (self.open_bus & 0b00100000)
                }
                JOYPAD1_REG | JOYPAD2_REG => {
                    let port = (addr & 0x01) as usize;
                    (self.open_bus & 0b11100000) | self.read_joypad_bit(port)
                }
                _ => {
                    tracing::trace!("open bus read at {:04X}", addr);
                    self.open_bus
                }
            },
        };

        self.open_bus = byte;
        byte
    }

    pub fn cpu_write(&mut self, addr: u16, byte: u8) {
        self.open_bus = byte;

        if self.cartridge.cpu_write(addr, byte) {
            return;
        }

        match addr {
            CPU_RAM_START..=CPU_RAM_END => self.cpu_ram[addr as usize % CPU_RAM_LENGTH] = byte,
            PPU_REG_START..=PPU_REG_END => {
                self.ppu_bus.cpu_write_reg(addr, byte, &mut self.cartridge)
            }
            DMA_REG_ADDR => self.dma_page = Some(byte),
            JOYPAD1_REG => {
                self.joypad_strobe = byte & 0x01 != 0;
                if self.joypad_strobe {
                    self.latch_joypads();
                }
            }
            // 0x4017 writes go to the APU frame counter
            APU_REG_START..=APU_REG_END => self.apu.write_register(addr, byte),
            _ => tracing::trace!("dropped write {:02X} at {:04X}", byte, addr),
        }
    }

    /// Shifts out the next button of a controller, A first. Reads past the eighth return 1.
    fn read_joypad_bit(&mut self, port: usize) -> u8 {
        if self.joypad_strobe {
            self.latch_joypads();
        }

        let bit = self.joypad_shifters[port] & 0x01;
        self.joypad_shifters[port] = (self.joypad_shifters[port] >> 1) | 0x80;
        bit
    }

    fn latch_joypads(&mut self) {
        // shift order is A, B, Select, Start, Up, Down, Left, Right
        self.joypad_shifters[0] = self.joypad_state[0].bits();
        self.joypad_shifters[1] = self.joypad_state[1].bits();
    }

    /// A pending OAM DMA source page, set by a write to $4014.
    pub fn take_dma_request(&mut self) -> Option<u8> {
        self.dma_page.take()
    }

    /// Copies the 256-byte page `page * 0x100` into OAM starting at OAMADDR.
    pub fn oam_dma(&mut self, page: u8) {
        let base = (page as u16) << 8;
        for offset in 0..=0xFFu8 {
            let byte = self.cpu_read(base | offset as u16);
            self.ppu_bus.transfer_to_oam(offset, byte);
        }
    }

    /// Level of the shared IRQ line (mapper and APU frame counter).
    pub fn irq_line(&self) -> bool {
        self.cartridge.irq_active() || self.apu.irq_pending()
    }

    pub fn ppu_read(&mut self, addr: u16) -> u8 {
        self.ppu_bus.ppu_read(addr, &mut self.cartridge)
    }

    pub fn update_joypad_state(&mut self, port: usize, state: JoypadState) {
        if let Some(slot) = self.joypad_state.get_mut(port) {
            *slot = state;
        }
    }

    pub fn joypad_state(&self, port: usize) -> JoypadState {
        self.joypad_state.get(port).copied().unwrap_or_default()
    }
}

#[cfg(test)]
impl SystemBus {
    pub fn load_ram(&mut self, data: &[u8]) {
        for (addr, &byte) in data.iter().enumerate() {
            self.cartridge.cpu_write(addr as u16, byte);
        }
    }

    pub fn test_new() -> Self {
        SystemBus::new(CartridgeNes::test_new())
    }
}
