use super::{ram_enable_value, Mbc, BANKING_MODE_END, BANKING_MODE_START, EXT_RAM_END, EXT_RAM_START, RAM_BANK_SELECT_END, RAM_BANK_SELECT_START, RAM_ENABLE_END, ROM_BANK0_END, ROM_BANK0_START, ROM_BANKX_END, ROM_BANKX_START, ROM_BANK_SELECT_END, ROM_BANK_SELECT_START};
use crate::gb::cartridge::CartridgeMemory;
use crate::SystemControl;

const RTC_SECONDS: u8 = 0x08;
const RTC_DAY_HIGH: u8 = 0x0C;

/// MBC3 with a 7-bit ROM bank and four RAM banks. The clock registers can be
/// selected and latched but never tick, so they always read 0.
pub struct Mbc3 {
    ram_enabled: bool,
    rom_bank: u8,
    ram_select: u8,
    latch_reg: u8,
}

impl SystemControl for Mbc3 {
    fn reset(&mut self) {
        self.ram_enabled = false;
        self.rom_bank = 1;
        self.ram_select = 0;
        self.latch_reg = 0xFF;
    }
}

impl Mbc for Mbc3 {
    fn read(&self, mem: &CartridgeMemory, addr: u16) -> u8 {
        match addr {
            ROM_BANK0_START..=ROM_BANK0_END => mem.rom_byte(0, addr),
            ROM_BANKX_START..=ROM_BANKX_END => mem.rom_byte(self.rom_bank as usize, addr),
            EXT_RAM_START..=EXT_RAM_END => {
                if !self.ram_enabled {
                    return 0xFF;
                }

                match self.ram_select {
                    0x00..=0x03 => mem.ram_byte(self.ram_select as usize, addr),
                    RTC_SECONDS..=RTC_DAY_HIGH => 0x00,
                    _ => 0xFF,
                }
            }
            _ => 0xFF,
        }
    }

    fn write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) {
        match addr {
            ROM_BANK0_START..=RAM_ENABLE_END => self.ram_enabled = ram_enable_value(byte),
            ROM_BANK_SELECT_START..=ROM_BANK_SELECT_END => {
                self.rom_bank = (byte & 0b01111111).max(1);
                tracing::debug!("MBC3 ROM bank {}", self.rom_bank);
            }
            RAM_BANK_SELECT_START..=RAM_BANK_SELECT_END => {
                self.ram_select = byte;
                tracing::debug!("MBC3 RAM/RTC select {:02X}", self.ram_select);
            }
            BANKING_MODE_START..=BANKING_MODE_END => {
                if self.latch_reg == 0x00 && byte == 0x01 {
                    tracing::trace!("MBC3 clock latched");
                }
                self.latch_reg = byte;
            }
            EXT_RAM_START..=EXT_RAM_END => {
                if self.ram_enabled && self.ram_select <= 0x03 {
                    mem.write_ram(self.ram_select as usize, addr, byte);
                }
            }
            _ => {}
        }
    }
}

impl Mbc3 {
    pub fn new() -> Self {
        Self {
            ram_enabled: false,
            rom_bank: 1,
            ram_select: 0,
            latch_reg: 0xFF,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::gb::cartridge::{marker_rom, CartridgeGb};

    #[test]
    fn test_seven_bit_rom_bank() {
        // 2 MiB, 128 banks
        let mut cart = CartridgeGb::from_rom_bytes(&marker_rom(0x13, 0x06, 0x03)).unwrap();
        cart.write(0x2000, 0x7F);
        assert_eq!(cart.read(0x4000), 0x7F);
        cart.write(0x2000, 0x00);
        assert_eq!(cart.read(0x4000), 0x01);
        assert_eq!(cart.read(0x3FFF), 0x00);
    }

    #[test]
    fn test_ram_banks() {
        let mut cart = CartridgeGb::from_rom_bytes(&marker_rom(0x13, 0x01, 0x03)).unwrap();
        cart.write(0x0000, 0x0A);
        for bank in 0..4u8 {
            cart.write(0x4000, bank);
            cart.write(0xB000, 0xA0 | bank);
        }
        for bank in 0..4u8 {
            cart.write(0x4000, bank);
            assert_eq!(cart.read(0xB000), 0xA0 | bank);
        }
    }

    #[test]
    fn test_clock_registers_read_zero() {
        let mut cart = CartridgeGb::from_rom_bytes(&marker_rom(0x10, 0x01, 0x03)).unwrap();
        cart.write(0x0000, 0x0A);
        cart.write(0xA000, 0x55);

        cart.write(0x4000, 0x08);
        cart.write(0x6000, 0x00);
        cart.write(0x6000, 0x01);
        cart.write(0xA000, 0x3B);
        assert_eq!(cart.read(0xA000), 0x00);

        cart.write(0x4000, 0x00);
        assert_eq!(cart.read(0xA000), 0x55);
    }
}
