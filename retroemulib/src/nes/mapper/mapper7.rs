use super::{Mapper, PRG_ROM_END, PRG_ROM_START};
use crate::nes::cartridge::{CartridgeMemory, Mirroring, PRG_ROM_SIZE};
use crate::SystemControl;

const PRG_BANK_32K: usize = PRG_ROM_SIZE << 1;

/// AxROM: switchable 32 KiB PRG bank and a register-selected single nametable.
pub struct Mapper7 {
    prg_rom_select: usize,
    mirroring: Mirroring,
}

impl SystemControl for Mapper7 {
    fn reset(&mut self) {
        self.prg_rom_select = 0;
        self.mirroring = Mirroring::ONESCREEN_LO;
    }
}

impl Mapper for Mapper7 {
    fn cpu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            PRG_ROM_START..=PRG_ROM_END => {
                Some(mem.prg_byte(self.prg_rom_select * PRG_BANK_32K + (addr as usize & 0x7FFF)))
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) -> bool {
        match addr {
            PRG_ROM_START..=PRG_ROM_END => {
                self.prg_rom_select = (byte & 0b00000111) as usize % mem.prg_banks(PRG_BANK_32K);
                self.mirroring = if byte & 0b00010000 != 0 {
                    Mirroring::ONESCREEN_HI
                } else {
                    Mirroring::ONESCREEN_LO
                };
                tracing::debug!("AxROM PRG bank {} {:?}", self.prg_rom_select, self.mirroring);
                true
            }
            _ => false,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        addr as usize
    }

    fn mirroring(&self) -> Option<Mirroring> {
        Some(self.mirroring)
    }
}

impl Mapper7 {
    pub fn new() -> Self {
        Self {
            prg_rom_select: 0,
            mirroring: Mirroring::ONESCREEN_LO,
        }
    }
}
