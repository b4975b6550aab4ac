use super::{ram_enable_value, Mbc, BANKING_MODE_END, BANKING_MODE_START, EXT_RAM_END, EXT_RAM_START, RAM_BANK_SELECT_END, RAM_BANK_SELECT_START, RAM_ENABLE_END, ROM_BANK0_END, ROM_BANK0_START, ROM_BANKX_END, ROM_BANKX_START, ROM_BANK_SELECT_END, ROM_BANK_SELECT_START};
use crate::gb::cartridge::CartridgeMemory;
use crate::SystemControl;

/// MBC1: a 5-bit ROM bank register plus a 2-bit secondary register that either
/// extends the ROM bank or selects the RAM bank, depending on the banking mode.
pub struct Mbc1 {
    ram_enabled: bool,
    rom_bank: u8,
    secondary_bank: u8,
    advanced_mode: bool,
}

impl SystemControl for Mbc1 {
    fn reset(&mut self) {
        self.ram_enabled = false;
        self.rom_bank = 1;
        self.secondary_bank = 0;
        self.advanced_mode = false;
    }
}

impl Mbc for Mbc1 {
    fn read(&self, mem: &CartridgeMemory, addr: u16) -> u8 {
        match addr {
            ROM_BANK0_START..=ROM_BANK0_END => {
                let bank = if self.advanced_mode { (self.secondary_bank as usize) << 5 } else { 0 };
                mem.rom_byte(bank, addr)
            }
            ROM_BANKX_START..=ROM_BANKX_END => {
                mem.rom_byte((self.secondary_bank as usize) << 5 | self.rom_bank as usize, addr)
            }
            EXT_RAM_START..=EXT_RAM_END => {
                if self.ram_enabled {
                    mem.ram_byte(self.ram_bank(), addr)
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
            ROM_BANK_SELECT_START..=ROM_BANK_SELECT_END => {
                // bank 0 cannot be selected into the switchable window
                self.rom_bank = (byte & 0b00011111).max(1);
                tracing::debug!("MBC1 ROM bank {}", self.rom_bank);
            }
            RAM_BANK_SELECT_START..=RAM_BANK_SELECT_END => {
                self.secondary_bank = byte & 0b00000011;
                tracing::debug!("MBC1 secondary bank {}", self.secondary_bank);
            }
            BANKING_MODE_START..=BANKING_MODE_END => {
                self.advanced_mode = byte & 0x01 != 0;
                tracing::debug!("MBC1 advanced banking mode:{}", self.advanced_mode);
            }
            EXT_RAM_START..=EXT_RAM_END => {
                if self.ram_enabled {
                    mem.write_ram(self.ram_bank(), addr, byte);
                }
            }
            _ => {}
        }
    }
}

impl Mbc1 {
    pub fn new() -> Self {
        Self {
            ram_enabled: false,
            rom_bank: 1,
            secondary_bank: 0,
            advanced_mode: false,
        }
    }

    #[inline]
    fn ram_bank(&self) -> usize {
        if self.advanced_mode { self.secondary_bank as usize } else { 0 }
    }
}
