use std::path::Path;

use crate::nes::mapper::{self, Mapper};
use crate::{LoadError, SystemControl};

const INES_MAGIC: [u8; 4] = [0x4E, 0x45, 0x53, 0x1A];
const INES_HEADER_SIZE: usize = 0x10;
const TRAINER_SIZE: usize = 0x200;

// The size of each PRG_ROM bank
pub const PRG_ROM_SIZE: usize = 0x4000;

// The size of each CHR_ROM bank
pub const CHR_ROM_SIZE: usize = 0x2000;

pub const PRG_RAM_SIZE: usize = 0x2000;

#[allow(non_camel_case_types)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    HORIZONTAL,
    VERTICAL,
    ONESCREEN_LO,
    ONESCREEN_HI,
    FOUR_SCREEN,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Region {
    Ntsc,
    Pal,
}

#[derive(Debug, Clone)]
pub struct INesHeader {
    pub prg_rom_banks: usize,
    pub chr_rom_banks: usize,
    pub mapper_id: u8,
    pub mirroring: Mirroring,
    pub battery_backed: bool,
    pub has_trainer: bool,
    pub region: Region,
}

impl INesHeader {
    pub fn parse(data: &[u8]) -> Result<Self, LoadError> {
        if data.len() < INES_HEADER_SIZE {
            return Err(LoadError::Truncated { expected: INES_HEADER_SIZE, found: data.len() });
        }

        // First three bytes must be "NES" in ASCII, followed by 0x1A
        if data[0..4] != INES_MAGIC {
            return Err(LoadError::BadSignature);
        }

        let prg_rom_banks = data[4] as usize;
        if prg_rom_banks == 0 {
            return Err(LoadError::InvalidSizeCode { field: "prg_rom_banks", code: 0 });
        }

        let mirroring = if data[6] & 0b00001000 != 0 {
            Mirroring::FOUR_SCREEN
        } else if data[6] & 0x01 != 0 {
            Mirroring::VERTICAL
        } else {
            Mirroring::HORIZONTAL
        };

        Ok(Self {
            prg_rom_banks,
            chr_rom_banks: data[5] as usize,
            mapper_id: (data[7] & 0b11110000) | (data[6] >> 4),
            mirroring,
            battery_backed: data[6] & 0b00000010 != 0,
            has_trainer: data[6] & 0b00000100 != 0,
            region: if data[9] & 0x01 != 0 { Region::Pal } else { Region::Ntsc },
        })
    }

    /// A header of zero CHR banks means the board carries 8 KiB of CHR RAM instead.
    pub fn chr_is_ram(&self) -> bool {
        self.chr_rom_banks == 0
    }
}

/// Raw cartridge storage. Mappers decide which slice of it the CPU and PPU see.
pub struct CartridgeMemory {
    pub prg_rom: Vec<u8>,
    pub chr: Vec<u8>,
    pub chr_is_ram: bool,
    pub prg_ram: Vec<u8>,
}

impl CartridgeMemory {
    #[inline]
    pub fn prg_byte(&self, offset: usize) -> u8 {
        self.prg_rom[offset % self.prg_rom.len()]
    }

    #[inline]
    pub fn chr_byte(&self, offset: usize) -> u8 {
        self.chr[offset % self.chr.len()]
    }

    #[inline]
    pub fn write_chr(&mut self, offset: usize, byte: u8) {
        if self.chr_is_ram {
            let len = self.chr.len();
            self.chr[offset % len] = byte;
        }
    }

    #[inline]
    pub fn prg_ram_byte(&self, addr: u16) -> u8 {
        self.prg_ram[addr as usize & (PRG_RAM_SIZE - 1)]
    }

    #[inline]
    pub fn write_prg_ram(&mut self, addr: u16, byte: u8) {
        self.prg_ram[addr as usize & (PRG_RAM_SIZE - 1)] = byte;
    }

    /// Number of PRG banks of `bank_size` bytes, never zero.
    #[inline]
    pub fn prg_banks(&self, bank_size: usize) -> usize {
        (self.prg_rom.len() / bank_size).max(1)
    }

    #[inline]
    pub fn chr_banks(&self, bank_size: usize) -> usize {
        (self.chr.len() / bank_size).max(1)
    }
}

pub struct CartridgeNes {
    header: INesHeader,
    memory: CartridgeMemory,
    mapper: Box<dyn Mapper>,
}

impl SystemControl for CartridgeNes {
    fn reset(&mut self) {
        self.mapper.reset();
    }
}

impl CartridgeNes {
    pub fn from_ines_file<P: AsRef<Path>>(file_path: P) -> Result<Self, LoadError> {
        let data = std::fs::read(file_path)?;

        CartridgeNes::from_ines_bytes(&data)
    }

    pub fn from_ines_bytes(data: &[u8]) -> Result<Self, LoadError> {
        let header = INesHeader::parse(data)?;

        let prg_start = INES_HEADER_SIZE + if header.has_trainer { TRAINER_SIZE } else { 0 };
        let prg_end = prg_start + header.prg_rom_banks * PRG_ROM_SIZE;
        let chr_end = prg_end + header.chr_rom_banks * CHR_ROM_SIZE;

        if data.len() < chr_end {
            return Err(LoadError::Truncated { expected: chr_end, found: data.len() });
        }

        let chr = if header.chr_is_ram() {
            vec![0; CHR_ROM_SIZE]
        } else {
            data[prg_end..chr_end].to_vec()
        };

        let mapper = mapper::create_mapper(&header)?;

        tracing::info!(
            "iNES image: mapper {} PRG-ROM banks:{} CHR-ROM banks:{} {:?} trainer:{} battery:{} {:?}",
            header.mapper_id, header.prg_rom_banks, header.chr_rom_banks, header.mirroring,
            header.has_trainer, header.battery_backed, header.region
        );

        Ok(Self {
            memory: CartridgeMemory {
                prg_rom: data[prg_start..prg_end].to_vec(),
                chr,
                chr_is_ram: header.chr_is_ram(),
                prg_ram: vec![0; PRG_RAM_SIZE],
            },
            header,
            mapper,
        })
    }

    pub fn header(&self) -> &INesHeader {
        &self.header
    }

    pub fn cpu_read(&mut self, addr: u16) -> Option<u8> {
        self.mapper.cpu_read(&self.memory, addr)
    }

    pub fn cpu_write(&mut self, addr: u16, byte: u8) -> bool {
        self.mapper.cpu_write(&mut self.memory, addr, byte)
    }

    pub fn ppu_read(&mut self, addr: u16) -> u8 {
        self.mapper.ppu_read(&self.memory, addr)
    }

    pub fn ppu_write(&mut self, addr: u16, byte: u8) {
        self.mapper.ppu_write(&mut self.memory, addr, byte);
    }

    pub fn mirroring(&self) -> Mirroring {
        match self.header.mirroring {
            Mirroring::FOUR_SCREEN => Mirroring::FOUR_SCREEN,
            fixed => self.mapper.mirroring().unwrap_or(fixed),
        }
    }

    pub fn notify_scanline(&mut self) {
        self.mapper.notify_scanline();
    }

    pub fn irq_active(&self) -> bool {
        self.mapper.irq_active()
    }

    /// Battery-backed PRG RAM, if the board has any.
    pub fn save_ram(&self) -> Option<&[u8]> {
        self.header.battery_backed.then_some(self.memory.prg_ram.as_slice())
    }

    pub fn load_save_ram(&mut self, data: &[u8]) -> Result<(), LoadError> {
        if !self.header.battery_backed {
            return Err(LoadError::NoSaveRam);
        }

        if data.len() != self.memory.prg_ram.len() {
            tracing::warn!("rejecting save data of {} bytes", data.len());
            return Err(LoadError::SaveRamSize { expected: self.memory.prg_ram.len(), found: data.len() });
        }

        self.memory.prg_ram.copy_from_slice(data);
        Ok(())
    }
}

#[cfg(test)]
impl CartridgeNes {
    pub fn test_new() -> Self {
        let header = INesHeader {
            prg_rom_banks: 1,
            chr_rom_banks: 0,
            mapper_id: 0,
            mirroring: Mirroring::HORIZONTAL,
            battery_backed: false,
            has_trainer: false,
            region: Region::Ntsc,
        };

        Self {
            header,
            memory: CartridgeMemory {
                prg_rom: vec![0; PRG_ROM_SIZE],
                chr: vec![0; CHR_ROM_SIZE],
                chr_is_ram: true,
                prg_ram: vec![0; PRG_RAM_SIZE],
            },
            mapper: Box::new(mapper::testmapper::TestMapper::new()),
        }
    }
}

/// Builds an iNES image whose PRG banks are filled with their own bank number
/// and whose CHR banks are filled with 0x80 | bank number.
#[cfg(test)]
pub fn marker_image(mapper_id: u8, prg_rom_banks: u8, chr_rom_banks: u8, flags6: u8) -> Vec<u8> {
    let mut data = vec![0x4E, 0x45, 0x53, 0x1A, prg_rom_banks, chr_rom_banks,
        (mapper_id << 4) | (flags6 & 0x0F), mapper_id & 0xF0, 0, 0, 0, 0, 0, 0, 0, 0];

    for bank in 0..prg_rom_banks {
        data.extend(std::iter::repeat(bank).take(PRG_ROM_SIZE));
    }
    for bank in 0..chr_rom_banks {
        data.extend(std::iter::repeat(0x80 | bank).take(CHR_ROM_SIZE));
    }

    data
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_fields() {
        let mut image = marker_image(4, 2, 1, 0b0000_0011);
        image[9] = 0x01;
        let cart = CartridgeNes::from_ines_bytes(&image).unwrap();
        let header = cart.header();

        assert_eq!(header.mapper_id, 4);
        assert_eq!(header.prg_rom_banks, 2);
        assert_eq!(header.chr_rom_banks, 1);
        assert_eq!(header.mirroring, Mirroring::VERTICAL);
        assert!(header.battery_backed);
        assert!(!header.has_trainer);
        assert_eq!(header.region, Region::Pal);
    }

    #[test]
    fn test_bad_magic() {
        let mut image = marker_image(0, 1, 1, 0);
        image[3] = 0x00;
        assert!(matches!(CartridgeNes::from_ines_bytes(&image), Err(LoadError::BadSignature)));
    }

    #[test]
    fn test_truncated_image() {
        let image = marker_image(0, 2, 1, 0);
        let result = CartridgeNes::from_ines_bytes(&image[..0x4000]);
        assert!(matches!(result, Err(LoadError::Truncated { expected: 0xA010, found: 0x4000 })));
    }

    #[test]
    fn test_unsupported_mapper() {
        let image = marker_image(5, 1, 1, 0);
        assert!(matches!(CartridgeNes::from_ines_bytes(&image), Err(LoadError::UnsupportedMapper(5))));
    }

    #[test]
    fn test_trainer_is_skipped() {
        let mut image = marker_image(0, 1, 1, 0b0000_0100);
        let trainer = vec![0xEE; TRAINER_SIZE];
        image.splice(INES_HEADER_SIZE..INES_HEADER_SIZE, trainer);

        let mut cart = CartridgeNes::from_ines_bytes(&image).unwrap();
        assert_eq!(cart.cpu_read(0x8000), Some(0x00));
        assert_eq!(cart.ppu_read(0x0000), 0x80);
    }

    #[test]
    fn test_four_screen_overrides_mapper() {
        let image = marker_image(7, 2, 0, 0b0000_1000);
        let cart = CartridgeNes::from_ines_bytes(&image).unwrap();
        assert_eq!(cart.mirroring(), Mirroring::FOUR_SCREEN);
    }

    #[test]
    fn test_save_ram_roundtrip() {
        let image = marker_image(0, 1, 1, 0b0000_0010);
        let mut cart = CartridgeNes::from_ines_bytes(&image).unwrap();
        cart.cpu_write(0x6001, 0x42);
        assert_eq!(cart.save_ram().unwrap()[1], 0x42);

        let mut restored = CartridgeNes::from_ines_bytes(&image).unwrap();
        assert!(matches!(restored.load_save_ram(&[0; 16]), Err(LoadError::SaveRamSize { .. })));
        restored.load_save_ram(cart.save_ram().unwrap()).unwrap();
        assert_eq!(restored.cpu_read(0x6001), Some(0x42));
    }

    #[test]
    fn test_no_battery() {
        let image = marker_image(0, 1, 1, 0);
        let mut cart = CartridgeNes::from_ines_bytes(&image).unwrap();
        assert!(cart.save_ram().is_none());
        assert!(matches!(cart.load_save_ram(&[0; PRG_RAM_SIZE]), Err(LoadError::NoSaveRam)));
    }
}
