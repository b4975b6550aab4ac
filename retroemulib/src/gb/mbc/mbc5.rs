use super::{ram_enable_value, Mbc, EXT_RAM_END, EXT_RAM_START, RAM_BANK_SELECT_END, RAM_BANK_SELECT_START, RAM_ENABLE_END, ROM_BANK0_END, ROM_BANK0_START, ROM_BANKX_END, ROM_BANKX_START};
use crate::gb::cartridge::CartridgeMemory;
use crate::SystemControl;

const ROM_BANK_LOW_START: u16 = 0x2000;
const ROM_BANK_LOW_END: u16 = 0x2FFF;
const ROM_BANK_HIGH_START: u16 = 0x3000;
const ROM_BANK_HIGH_END: u16 = 0x3FFF;

/// MBC5: a 9-bit ROM bank split over two registers. Unlike the older MBCs, bank 0
/// can be mapped into the switchable window.
pub struct Mbc5 {
    ram_enabled: bool,
    rom_bank: u16,
    ram_bank: u8,
}

impl SystemControl for Mbc5 {
    fn reset(&mut self) {
        self.ram_enabled = false;
        self.rom_bank = 1;
        self.ram_bank = 0;
    }
}

impl Mbc for Mbc5 {
    fn read(&self, mem: &CartridgeMemory, addr: u16) -> u8 {
        match addr {
            ROM_BANK0_START..=ROM_BANK0_END => mem.rom_byte(0, addr),
            ROM_BANKX_START..=ROM_BANKX_END => mem.rom_byte(self.rom_bank as usize, addr),
            EXT_RAM_START..=EXT_RAM_END => {
                if self.ram_enabled {
                    mem.ram_byte(self.ram_bank as usize, addr)
                } else {
                    0xFF
                }
            }
            _ => 0xFF,
        }
    }

    fn write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) {
        match addr {
            ROM_BANK0_START..=RAM_ENABLE_END => self.ram_enabled = ram_enable_value(byte),
            ROM_BANK_LOW_START..=ROM_BANK_LOW_END => {
                self.rom_bank = (self.rom_bank & 0x100) | byte as u16;
                tracing::debug!("MBC5 ROM bank {}", self.rom_bank);
            }
            ROM_BANK_HIGH_START..=ROM_BANK_HIGH_END => {
                self.rom_bank = (self.rom_bank & 0xFF) | ((byte as u16 & 0x01) << 8);
                tracing::debug!("MBC5 ROM bank {}", self.rom_bank);
            }
            RAM_BANK_SELECT_START..=RAM_BANK_SELECT_END => self.ram_bank = byte & 0x0F,
            EXT_RAM_START..=EXT_RAM_END => {
                if self.ram_enabled {
                    mem.write_ram(self.ram_bank as usize, addr, byte);
                }
            }
            _ => {}
        }
    }
}

impl Mbc5 {
    pub fn new() -> Self {
        Self {
            ram_enabled: false,
            rom_bank: 1,
            ram_bank: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::gb::cartridge::{marker_rom, CartridgeGb};

    #[test]
    fn test_bank_zero_is_selectable() {
        let mut cart = CartridgeGb::from_rom_bytes(&marker_rom(0x19, 0x04, 0)).unwrap();
        cart.write(0x2000, 0x00);
        assert_eq!(cart.read(0x4000), 0);
        cart.write(0x2000, 0x1F);
        assert_eq!(cart.read(0x4000), 0x1F);
    }

    #[test]
    fn test_ninth_bank_bit() {
        // 1 MiB, 64 banks; bank 0x101 wraps to bank 1
        let mut cart = CartridgeGb::from_rom_bytes(&marker_rom(0x19, 0x05, 0)).unwrap();
        cart.write(0x2000, 0x05);
        cart.write(0x3000, 0x01);
        assert_eq!(cart.read(0x4000), 0x05);

        cart.write(0x2000, 0x01);
        assert_eq!(cart.read(0x4000), 0x01);

        cart.write(0x3000, 0x00);
        cart.write(0x2000, 0x3A);
        assert_eq!(cart.read(0x4000), 0x3A);
    }

    #[test]
    fn test_sixteen_ram_banks() {
        let mut cart = CartridgeGb::from_rom_bytes(&marker_rom(0x1B, 0x01, 0x04)).unwrap();
        cart.write(0x0000, 0x0A);
        cart.write(0x4000, 0x0F);
        cart.write(0xA000, 0xF0);
        cart.write(0x4000, 0x00);
        assert_eq!(cart.read(0xA000), 0x00);
        cart.write(0x4000, 0x0F);
        assert_eq!(cart.read(0xA000), 0xF0);
    }
}
