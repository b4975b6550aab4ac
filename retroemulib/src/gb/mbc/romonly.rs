use super::{Mbc, EXT_RAM_END, EXT_RAM_START, ROM_BANK0_END, ROM_BANK0_START, ROM_BANKX_END, ROM_BANKX_START};
use crate::gb::cartridge::CartridgeMemory;
use crate::SystemControl;

/// 32 KiB of ROM mapped flat, with optional RAM that is always enabled.
pub struct RomOnly;

impl SystemControl for RomOnly {
    fn reset(&mut self) {}
}

impl Mbc for RomOnly {
    fn read(&self, mem: &CartridgeMemory, addr: u16) -> u8 {
        match addr {
            ROM_BANK0_START..=ROM_BANK0_END => mem.rom_byte(0, addr),
            ROM_BANKX_START..=ROM_BANKX_END => mem.rom_byte(1, addr),
            EXT_RAM_START..=EXT_RAM_END => mem.ram_byte(0, addr),
            _ => 0xFF,
        }
    }

    fn write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) {
        match addr {
            EXT_RAM_START..=EXT_RAM_END => mem.write_ram(0, addr, byte),
            _ => tracing::trace!("ROM-only cartridge ignored write {:02X} at {:04X}", byte, addr),
        }
    }
}

impl RomOnly {
    pub fn new() -> Self {
        RomOnly
    }
}

#[cfg(test)]
mod tests {
    use crate::gb::cartridge::{marker_rom, CartridgeGb};

    #[test]
    fn test_flat_mapping() {
        let mut cart = CartridgeGb::from_rom_bytes(&marker_rom(0x00, 0, 0)).unwrap();
        assert_eq!(cart.read(0x0000), 0);
        assert_eq!(cart.read(0x4000), 1);

        cart.write(0x2000, 0x05);
        assert_eq!(cart.read(0x4000), 1);
        assert_eq!(cart.read(0xA000), 0xFF);
    }

    #[test]
    fn test_ram_always_enabled() {
        let mut cart = CartridgeGb::from_rom_bytes(&marker_rom(0x08, 0, 0x02)).unwrap();
        cart.write(0xA123, 0x99);
        assert_eq!(cart.read(0xA123), 0x99);
    }
}
