use super::{Mapper, PRG_ROM_END, PRG_ROM_START};
use crate::nes::cartridge::{CartridgeMemory, CHR_ROM_SIZE};
use crate::SystemControl;

/// CNROM: fixed PRG, switchable 8 KiB CHR bank.
pub struct Mapper3 {
    chr_bank: usize,
}

impl SystemControl for Mapper3 {
    fn reset(&mut self) {
        self.chr_bank = 0;
    }
}

impl Mapper for Mapper3 {
    fn cpu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            PRG_ROM_START..=PRG_ROM_END => Some(mem.prg_byte((addr - PRG_ROM_START) as usize)),
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) -> bool {
        match addr {
            PRG_ROM_START..=PRG_ROM_END => {
                self.chr_bank = byte as usize % mem.chr_banks(CHR_ROM_SIZE);
                tracing::debug!("CNROM CHR bank {}", self.chr_bank);
                true
            }
            _ => false,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        self.chr_bank * CHR_ROM_SIZE + (addr as usize & 0x1FFF)
    }
}

impl Mapper3 {
    pub fn new() -> Self {
        Self { chr_bank: 0 }
    }
}

#[cfg(test)]
mod tests {
    use crate::nes::cartridge::{marker_image, CartridgeNes};

    #[test]
    fn test_chr_bank_switch() {
        let mut cart = CartridgeNes::from_ines_bytes(&marker_image(3, 2, 4, 0)).unwrap();
        assert_eq!(cart.ppu_read(0x0000), 0x80);

        cart.cpu_write(0x8000, 3);
        assert_eq!(cart.ppu_read(0x1FFF), 0x83);
        assert_eq!(cart.cpu_read(0xC000), Some(1));
    }
}
