use super::{Mapper, PRG_ROM_END, PRG_ROM_START};
use crate::nes::cartridge::{CartridgeMemory, CHR_ROM_SIZE, PRG_ROM_SIZE};
use crate::SystemControl;

const PRG_BANK_32K: usize = PRG_ROM_SIZE << 1;

/// GxROM: one register selects a 32 KiB PRG bank and an 8 KiB CHR bank.
pub struct Mapper66 {
    prg_rom_select: usize,
    chr_rom_select: usize,
}

impl SystemControl for Mapper66 {
    fn reset(&mut self) {
        self.prg_rom_select = 0;
        self.chr_rom_select = 0;
    }
}

impl Mapper for Mapper66 {
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
                self.chr_rom_select = (byte & 0b00000011) as usize % mem.chr_banks(CHR_ROM_SIZE);
                self.prg_rom_select = ((byte & 0b00110000) >> 4) as usize % mem.prg_banks(PRG_BANK_32K);
                tracing::debug!("GxROM PRG bank {} CHR bank {}", self.prg_rom_select, self.chr_rom_select);
                true
            }
            _ => false,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        self.chr_rom_select * CHR_ROM_SIZE + (addr as usize & 0x1FFF)
    }
}

impl Mapper66 {
    pub fn new() -> Self {
        Self {
            prg_rom_select: 0,
            chr_rom_select: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::nes::cartridge::{marker_image, CartridgeNes};

    #[test]
    fn test_combined_select() {
        let mut cart = CartridgeNes::from_ines_bytes(&marker_image(66, 4, 4, 0)).unwrap();
        assert_eq!(cart.cpu_read(0x8000), Some(0));
        assert_eq!(cart.ppu_read(0x0000), 0x80);

        cart.cpu_write(0x8000, 0b0001_0010);
        assert_eq!(cart.cpu_read(0x8000), Some(2));
        assert_eq!(cart.cpu_read(0xC000), Some(3));
        assert_eq!(cart.ppu_read(0x0400), 0x82);
    }
}
