use std::path::Path;

use crate::gb::mbc::{self, Mbc};
use crate::{LoadError, SystemControl};

const TITLE_START: usize = 0x0134;
const TITLE_END: usize = 0x0143;
const CGB_FLAG_ADDR: usize = 0x0143;
const SGB_FLAG_ADDR: usize = 0x0146;
const CARTRIDGE_TYPE_ADDR: usize = 0x0147;
const ROM_SIZE_ADDR: usize = 0x0148;
const RAM_SIZE_ADDR: usize = 0x0149;
const HEADER_CHECKSUM_ADDR: usize = 0x014D;
const HEADER_END: usize = 0x0150;

pub const ROM_BANK_SIZE: usize = 0x4000;
pub const RAM_BANK_SIZE: usize = 0x2000;

/// Which bank controller sits on the board, decoded from the cartridge type byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcKind {
    RomOnly,
    Mbc1,
    Mbc3,
    Mbc5,
}

#[derive(Debug, Clone)]
pub struct CartridgeHeader {
    pub title: String,
    pub cgb_flag: u8,
    pub sgb_flag: u8,
    pub cartridge_type: u8,
    pub mbc: MbcKind,
    pub battery_backed: bool,
    pub rom_size: usize,
    pub ram_size: usize,
    pub header_checksum: u8,
}

impl CartridgeHeader {
    pub fn parse(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < HEADER_END {
            return Err(LoadError::Truncated { expected: HEADER_END, found: data.len() });
        }

        let title: String = data[TITLE_START..=TITLE_END]
            .iter()
            .take_while(|&&byte| byte != 0)
            .map(|&byte| byte as char)
            .collect();

        let cartridge_type = data[CARTRIDGE_TYPE_ADDR];
        let (mbc, battery_backed) = match cartridge_type {
            0x00 | 0x08 => (MbcKind::RomOnly, false),
            0x09 => (MbcKind::RomOnly, true),
            0x01 | 0x02 => (MbcKind::Mbc1, false),
            0x03 => (MbcKind::Mbc1, true),
            0x11 | 0x12 => (MbcKind::Mbc3, false),
            0x0F | 0x10 | 0x13 => (MbcKind::Mbc3, true),
            0x19 | 0x1A | 0x1C | 0x1D => (MbcKind::Mbc5, false),
            0x1B | 0x1E => (MbcKind::Mbc5, true),
            other => return Err(LoadError::UnsupportedCartridgeType(other)),
        };

        let rom_code = data[ROM_SIZE_ADDR];
        if rom_code > 0x08 {
            return Err(LoadError::InvalidSizeCode { field: "rom_size", code: rom_code });
        }

        let ram_code = data[RAM_SIZE_ADDR];
        let ram_size = match ram_code {
            0x00 => 0,
            0x01 => 0x800,
            0x02 => 0x2000,
            0x03 => 0x8000,
            0x04 => 0x20000,
            0x05 => 0x10000,
            code => return Err(LoadError::InvalidSizeCode { field: "ram_size", code }),
        };

        Ok(Self {
            title,
            cgb_flag: data[CGB_FLAG_ADDR],
            sgb_flag: data[SGB_FLAG_ADDR],
            cartridge_type,
            mbc,
            battery_backed,
            rom_size: 0x8000 << rom_code,
            ram_size,
            header_checksum: data[HEADER_CHECKSUM_ADDR],
        })
    }

    /// The checksum the boot ROM computes over 0x134..=0x14C.
    pub fn computed_checksum(data: &[u8]) -> u8 {
        data[TITLE_START..HEADER_CHECKSUM_ADDR]
            .iter()
            .fold(0u8, |sum, &byte| sum.wrapping_sub(byte).wrapping_sub(1))
    }
}

/// ROM and external RAM of a cartridge. The MBC picks which bank of each is visible.
pub struct CartridgeMemory {
    pub rom: Vec<u8>,
    pub ram: Vec<u8>,
}

impl CartridgeMemory {
    #[inline]
    pub fn rom_banks(&self) -> usize {
        (self.rom.len() / ROM_BANK_SIZE).max(1)
    }

    #[inline]
    pub fn ram_banks(&self) -> usize {
        (self.ram.len() / RAM_BANK_SIZE).max(1)
    }

    /// Byte at `addr` within the 16 KiB window of ROM bank `bank`.
    #[inline]
    pub fn rom_byte(&self, bank: usize, addr: u16) -> u8 {
        let offset = (bank % self.rom_banks()) * ROM_BANK_SIZE + (addr as usize & (ROM_BANK_SIZE - 1));
        self.rom.get(offset).copied().unwrap_or(0xFF)
    }

    /// Byte at `addr` within the 8 KiB window of RAM bank `bank`. Boards without RAM read 0xFF.
    #[inline]
    pub fn ram_byte(&self, bank: usize, addr: u16) -> u8 {
        if self.ram.is_empty() {
            return 0xFF;
        }

        let offset = ((bank % self.ram_banks()) * RAM_BANK_SIZE + (addr as usize & (RAM_BANK_SIZE - 1))) % self.ram.len();
        self.ram[offset]
    }

    #[inline]
    pub fn write_ram(&mut self, bank: usize, addr: u16, byte: u8) {
        if self.ram.is_empty() {
            return;
        }

        let offset = ((bank % self.ram_banks()) * RAM_BANK_SIZE + (addr as usize & (RAM_BANK_SIZE - 1))) % self.ram.len();
        self.ram[offset] = byte;
    }
}

pub struct CartridgeGb {
    header: CartridgeHeader,
    memory: CartridgeMemory,
    mbc: Box<dyn Mbc>,
}

impl SystemControl for CartridgeGb {
    fn reset(&mut self) {
        self.mbc.reset();
    }
}

impl CartridgeGb {
    pub fn from_rom_file<P: AsRef<Path>>(file_path: P) -> Result<Self, LoadError> {
        let data = std::fs::read(file_path)?;

        CartridgeGb::from_rom_bytes(&data)
    }

    pub fn from_rom_bytes(data: &[u8]) -> Result<Self, LoadError> {
        let header = CartridgeHeader::parse(data)?;

        if data.len() < header.rom_size {
            return Err(LoadError::Truncated { expected: header.rom_size, found: data.len() });
        }

        let checksum = CartridgeHeader::computed_checksum(data);
        if checksum != header.header_checksum {
            tracing::warn!("header checksum mismatch: header says {:02X}, computed {:02X}",
                header.header_checksum, checksum);
        }

        tracing::info!(
            "GB image: \"{}\" type:{:02X} {:?} ROM:{} KiB RAM:{} KiB battery:{} cgb:{:02X} sgb:{:02X}",
            header.title, header.cartridge_type, header.mbc, header.rom_size / 1024,
            header.ram_size / 1024, header.battery_backed, header.cgb_flag, header.sgb_flag
        );

        Ok(Self {
            mbc: mbc::create_mbc(header.mbc),
            memory: CartridgeMemory {
                rom: data[..header.rom_size].to_vec(),
                ram: vec![0; header.ram_size],
            },
            header,
        })
    }

    pub fn header(&self) -> &CartridgeHeader {
        &self.header
    }

    /// Reads from the ROM area (0x0000-0x7FFF) or external RAM (0xA000-0xBFFF).
    #[inline]
    pub fn read(&self, addr: u16) -> u8 {
        self.mbc.read(&self.memory, addr)
    }

    #[inline]
    pub fn write(&mut self, addr: u16, byte: u8) {
        self.mbc.write(&mut self.memory, addr, byte);
    }

    /// Battery-backed external RAM, if the board has any.
    pub fn save_ram(&self) -> Option<&[u8]> {
        (self.header.battery_backed && !self.memory.ram.is_empty()).then_some(self.memory.ram.as_slice())
    }

    pub fn load_save_ram(&mut self, data: &[u8]) -> Result<(), LoadError> {
        if !self.header.battery_backed || self.memory.ram.is_empty() {
            return Err(LoadError::NoSaveRam);
        }

        if data.len() != self.memory.ram.len() {
            tracing::warn!("rejecting save data of {} bytes", data.len());
            return Err(LoadError::SaveRamSize { expected: self.memory.ram.len(), found: data.len() });
        }

        self.memory.ram.copy_from_slice(data);
        Ok(())
    }
}

/// Builds a ROM whose 16 KiB banks are filled with their own bank number, with a
/// valid header for `cartridge_type`, `rom_code` and `ram_code`.
#[cfg(test)]
pub fn marker_rom(cartridge_type: u8, rom_code: u8, ram_code: u8) -> Vec<u8> {
    let banks = 2usize << rom_code;
    let mut data = Vec::with_capacity(banks * ROM_BANK_SIZE);
    for bank in 0..banks {
        data.extend(std::iter::repeat(bank as u8).take(ROM_BANK_SIZE));
    }

    data[TITLE_START..=TITLE_END].fill(0);
    data[TITLE_START..TITLE_START + 4].copy_from_slice(b"TEST");
    data[SGB_FLAG_ADDR] = 0;
    data[CARTRIDGE_TYPE_ADDR] = cartridge_type;
    data[ROM_SIZE_ADDR] = rom_code;
    data[RAM_SIZE_ADDR] = ram_code;
    data[0x014A..HEADER_CHECKSUM_ADDR].fill(0);
    data[HEADER_CHECKSUM_ADDR] = CartridgeHeader::computed_checksum(&data);
    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let mut rom = marker_rom(0x03, 0x02, 0x03);
        rom[CGB_FLAG_ADDR] = 0x80;
        rom[HEADER_CHECKSUM_ADDR] = CartridgeHeader::computed_checksum(&rom);

        let cart = CartridgeGb::from_rom_bytes(&rom).unwrap();
        let header = cart.header();
        assert_eq!(header.title, "TEST");
        assert_eq!(header.cgb_flag, 0x80);
        assert_eq!(header.mbc, MbcKind::Mbc1);
        assert!(header.battery_backed);
        assert_eq!(header.rom_size, 0x20000);
        assert_eq!(header.ram_size, 0x8000);
    }

    #[test]
    fn test_ram_size_table() {
        for (code, size) in [(0, 0), (1, 0x800), (2, 0x2000), (3, 0x8000), (4, 0x20000), (5, 0x10000)] {
            let rom = marker_rom(0x1B, 0, code);
            assert_eq!(CartridgeHeader::parse(&rom).unwrap().ram_size, size);
        }
    }

    #[test]
    fn test_invalid_size_codes() {
        let mut rom = marker_rom(0x00, 0, 0);
        rom[RAM_SIZE_ADDR] = 0x06;
        assert!(matches!(CartridgeGb::from_rom_bytes(&rom),
            Err(LoadError::InvalidSizeCode { field: "ram_size", code: 0x06 })));

        rom[RAM_SIZE_ADDR] = 0;
        rom[ROM_SIZE_ADDR] = 0x09;
        assert!(matches!(CartridgeGb::from_rom_bytes(&rom),
            Err(LoadError::InvalidSizeCode { field: "rom_size", code: 0x09 })));
    }

    #[test]
    fn test_truncated_rom() {
        let rom = marker_rom(0x01, 0x02, 0);
        assert!(matches!(CartridgeGb::from_rom_bytes(&rom[..0x8000]),
            Err(LoadError::Truncated { expected: 0x20000, found: 0x8000 })));
        assert!(matches!(CartridgeGb::from_rom_bytes(&rom[..0x100]),
            Err(LoadError::Truncated { expected: HEADER_END, .. })));
    }

    #[test]
    fn test_unsupported_type() {
        let rom = marker_rom(0x20, 0, 0);
        assert!(matches!(CartridgeGb::from_rom_bytes(&rom), Err(LoadError::UnsupportedCartridgeType(0x20))));
    }

    #[test]
    fn test_checksum_mismatch_still_loads() {
        let mut rom = marker_rom(0x00, 0, 0);
        rom[HEADER_CHECKSUM_ADDR] ^= 0xFF;
        assert!(CartridgeGb::from_rom_bytes(&rom).is_ok());
    }

    #[test]
    fn test_save_ram_roundtrip() {
        let rom = marker_rom(0x03, 0x01, 0x02);
        let mut cart = CartridgeGb::from_rom_bytes(&rom).unwrap();
        cart.write(0x0000, 0x0A);
        cart.write(0xA010, 0x5A);
        assert_eq!(cart.save_ram().unwrap()[0x10], 0x5A);

        let mut restored = CartridgeGb::from_rom_bytes(&rom).unwrap();
        assert!(matches!(restored.load_save_ram(&[0; 3]), Err(LoadError::SaveRamSize { expected: 0x2000, found: 3 })));
        restored.load_save_ram(cart.save_ram().unwrap()).unwrap();
        restored.write(0x0000, 0x0A);
        assert_eq!(restored.read(0xA010), 0x5A);
    }

    #[test]
    fn test_no_battery() {
        let rom = marker_rom(0x01, 0x01, 0x00);
        let mut cart = CartridgeGb::from_rom_bytes(&rom).unwrap();
        assert!(cart.save_ram().is_none());
        assert!(matches!(cart.load_save_ram(&[]), Err(LoadError::NoSaveRam)));
    }
}
