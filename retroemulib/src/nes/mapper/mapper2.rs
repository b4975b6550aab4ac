use super::{Mapper, PRG_ROM_END, PRG_ROM_HI_END, PRG_ROM_HI_START, PRG_ROM_LO_END, PRG_ROM_LO_START, PRG_ROM_START};
use crate::nes::cartridge::{CartridgeMemory, PRG_ROM_SIZE};
use crate::SystemControl;

/// UxROM: switchable 16 KiB bank at 0x8000, last bank fixed at 0xC000.
pub struct Mapper2 {
    prg_bank_lo: usize,
}

impl SystemControl for Mapper2 {
    fn reset(&mut self) {
        self.prg_bank_lo = 0;
    }
}

impl Mapper for Mapper2 {
    fn cpu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            PRG_ROM_LO_START..=PRG_ROM_LO_END => {
                Some(mem.prg_byte(self.prg_bank_lo * PRG_ROM_SIZE + (addr as usize & 0x3FFF)))
            }
            PRG_ROM_HI_START..=PRG_ROM_HI_END => {
                let last_bank = mem.prg_banks(PRG_ROM_SIZE) - 1;
                Some(mem.prg_byte(last_bank * PRG_ROM_SIZE + (addr as usize & 0x3FFF)))
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) -> bool {
        match addr {
            PRG_ROM_START..=PRG_ROM_END => {
                self.prg_bank_lo = byte as usize % mem.prg_banks(PRG_ROM_SIZE);
                tracing::debug!("UxROM PRG bank {}", self.prg_bank_lo);
                true
            }
            _ => false,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        addr as usize
    }
}

impl Mapper2 {
    pub fn new() -> Self {
        Self { prg_bank_lo: 0 }
    }
}
