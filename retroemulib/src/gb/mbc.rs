mod mbc1;
mod mbc3;
mod mbc5;
mod romonly;

use crate::gb::cartridge::{CartridgeMemory, MbcKind};
use crate::SystemControl;

pub use self::mbc1::Mbc1;
pub use self::mbc3::Mbc3;
pub use self::mbc5::Mbc5;
pub use self::romonly::RomOnly;

const ROM_BANK0_START: u16 = 0x0000;
const ROM_BANK0_END: u16 = 0x3FFF;
const ROM_BANKX_START: u16 = 0x4000;
const ROM_BANKX_END: u16 = 0x7FFF;
const EXT_RAM_START: u16 = 0xA000;
const EXT_RAM_END: u16 = 0xBFFF;

const RAM_ENABLE_END: u16 = 0x1FFF;
const ROM_BANK_SELECT_START: u16 = 0x2000;
const ROM_BANK_SELECT_END: u16 = 0x3FFF;
const RAM_BANK_SELECT_START: u16 = 0x4000;
const RAM_BANK_SELECT_END: u16 = 0x5FFF;
const BANKING_MODE_START: u16 = 0x6000;
const BANKING_MODE_END: u16 = 0x7FFF;

/// Bank controller of a Game Boy cartridge. Sees the ROM area (0x0000-0x7FFF) and
/// the external RAM window (0xA000-0xBFFF); writes to the ROM area select banks.
pub trait Mbc: SystemControl {
    fn read(&self, mem: &CartridgeMemory, addr: u16) -> u8;

    fn write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8);
}

pub fn create_mbc(kind: MbcKind) -> Box<dyn Mbc> {
    match kind {
        MbcKind::RomOnly => Box::new(RomOnly::new()),
        MbcKind::Mbc1 => Box::new(Mbc1::new()),
        MbcKind::Mbc3 => Box::new(Mbc3::new()),
        MbcKind::Mbc5 => Box::new(Mbc5::new()),
    }
}

/// RAM is enabled by writing 0x0A to the low nibble of 0x0000-0x1FFF.
#[inline]
fn ram_enable_value(byte: u8) -> bool {
    byte & 0x0F == 0x0A
}
