use super::{Mapper, PRG_RAM_END, PRG_RAM_START, PRG_ROM_END, PRG_ROM_START};
use crate::nes::cartridge::CartridgeMemory;
use crate::SystemControl;

/// NROM: fixed PRG (a single 16 KiB bank is mirrored into 0xC000) and fixed CHR.
pub struct Mapper0;

impl SystemControl for Mapper0 {
    fn reset(&mut self) {}
}

impl Mapper for Mapper0 {
    fn cpu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            PRG_RAM_START..=PRG_RAM_END => Some(mem.prg_ram_byte(addr)),
            PRG_ROM_START..=PRG_ROM_END => Some(mem.prg_byte((addr - PRG_ROM_START) as usize)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) -> bool {
        match addr {
            PRG_RAM_START..=PRG_RAM_END => {
                mem.write_prg_ram(addr, byte);
                true
            }
            PRG_ROM_START..=PRG_ROM_END => {
                tracing::trace!("write to NROM PRG at {:04X} ignored", addr);
                true
            }
            _ => false,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        addr as usize
    }
}

impl Mapper0 {
    pub fn new() -> Self {
        Self
    }
}
