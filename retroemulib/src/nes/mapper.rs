mod mapper0;
mod mapper1;
mod mapper2;
mod mapper3;
mod mapper4;
mod mapper7;
mod mapper66;

#[cfg(test)]
pub mod testmapper;

use crate::nes::cartridge::{CartridgeMemory, INesHeader, Mirroring};
use crate::{LoadError, SystemControl};

pub use self::mapper0::Mapper0;
pub use self::mapper1::Mapper1;
pub use self::mapper2::Mapper2;
pub use self::mapper3::Mapper3;
pub use self::mapper4::Mapper4;
pub use self::mapper7::Mapper7;
pub use self::mapper66::Mapper66;

const PRG_RAM_START: u16 = 0x6000;
const PRG_RAM_END: u16 = 0x7FFF;

const PRG_ROM_START: u16 = 0x8000;
const PRG_ROM_END: u16 = 0xFFFF;
const PRG_ROM_LO_START: u16 = 0x8000;
const PRG_ROM_LO_END: u16 = 0xBFFF;
const PRG_ROM_HI_START: u16 = 0xC000;
const PRG_ROM_HI_END: u16 = 0xFFFF;

const CHR_ROM_LO_END: u16 = 0x0FFF;

pub trait Mapper: SystemControl {
    /// Some contains the byte the board drives; None leaves the address to the rest of the system bus.
    fn cpu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> Option<u8>;

    /// Returns true if the board claimed the write.
    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) -> bool;

    /// Translates a pattern table address (0x0000 to 0x1FFF) into an offset in CHR memory.
    fn chr_offset(&self, addr: u16) -> usize;

    fn ppu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> u8 {
        mem.chr_byte(self.chr_offset(addr))
    }

    /// Only lands when the board carries CHR RAM.
    fn ppu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) {
        let offset = self.chr_offset(addr);
        mem.write_chr(offset, byte);
    }

    /// Some mappers can dynamically change mirroring mode during execution
    fn mirroring(&self) -> Option<Mirroring> {
        None
    }

    /// Called once per rendered scanline while rendering is enabled.
    fn notify_scanline(&mut self) {}

    /// Level of the board's IRQ line. Stays asserted until the program acknowledges it.
    fn irq_active(&self) -> bool {
        false
    }
}

pub fn create_mapper(header: &INesHeader) -> Result<Box<dyn Mapper>, LoadError> {
    let mapper: Box<dyn Mapper> = match header.mapper_id {
        0 => Box::new(Mapper0::new()),
        1 => Box::new(Mapper1::new()),
        2 => Box::new(Mapper2::new()),
        3 => Box::new(Mapper3::new()),
        4 => Box::new(Mapper4::new(header.prg_rom_banks)),
        7 => Box::new(Mapper7::new()),
        66 => Box::new(Mapper66::new()),
        id => return Err(LoadError::UnsupportedMapper(id)),
    };

    Ok(mapper)
}
