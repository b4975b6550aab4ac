use super::{Mapper, CHR_ROM_LO_END, PRG_RAM_END, PRG_RAM_START, PRG_ROM_END, PRG_ROM_HI_END, PRG_ROM_HI_START, PRG_ROM_LO_END, PRG_ROM_LO_START, PRG_ROM_START};
use crate::nes::cartridge::{CartridgeMemory, Mirroring, PRG_ROM_SIZE};
use crate::SystemControl;

const CHR_BANK_4K: usize = 0x1000;

/// MMC1: registers are loaded one bit per write through a 5-write serial port.
pub struct Mapper1 {
    mirroring: Mirroring,

    chr_bank_lo4: usize,
    chr_bank_hi4: usize,
    prg_bank: usize,
    prg_ram_enabled: bool,

    load_reg: u8,
    control_reg: u8,
    load_count: u8,
}

impl SystemControl for Mapper1 {
    fn reset(&mut self) {
        self.mirroring = Mirroring::HORIZONTAL;
        self.chr_bank_lo4 = 0;
        self.chr_bank_hi4 = 0;
        self.prg_bank = 0;
        self.prg_ram_enabled = true;

        self.load_reg = 0x00;
        self.control_reg = 0x1C;
        self.load_count = 0;
    }
}

impl Mapper for Mapper1 {
    fn cpu_read(&mut self, mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        match addr {
            PRG_RAM_START..=PRG_RAM_END => {
                if self.prg_ram_enabled {
                    Some(mem.prg_ram_byte(addr))
                } else {
                    None
                }
            }
            PRG_ROM_START..=PRG_ROM_END => {
                let bank = self.prg_bank_for(mem, addr);
                Some(mem.prg_byte(bank * PRG_ROM_SIZE + (addr as usize & 0x3FFF)))
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) -> bool {
        match addr {
            PRG_RAM_START..=PRG_RAM_END => {
                if self.prg_ram_enabled {
                    mem.write_prg_ram(addr, byte);
                }
                true
            }
            PRG_ROM_START..=PRG_ROM_END => {
                if byte & 0b10000000 != 0 {
                    self.load_reg = 0x00;
                    self.load_count = 0;
                    self.control_reg |= 0b00001100;
                    return true;
                }

                self.load_reg >>= 1;
                self.load_reg |= (byte & 0x01) << 4;
                self.load_count += 1;

                if self.load_count == 5 {
                    self.commit(addr);
                    self.load_reg = 0x00;
                    self.load_count = 0;
                }

                true
            }
            _ => false,
        }
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let bank = if self.control_reg & 0b10000 != 0 {
            if addr <= CHR_ROM_LO_END { self.chr_bank_lo4 } else { self.chr_bank_hi4 }
        } else {
            // 8 KiB mode ignores the low bit of the first bank register
            (self.chr_bank_lo4 & !0x01) | ((addr as usize >> 12) & 0x01)
        };

        bank * CHR_BANK_4K + (addr as usize & 0x0FFF)
    }

    fn mirroring(&self) -> Option<Mirroring> {
        Some(self.mirroring)
    }
}

impl Mapper1 {
    pub fn new() -> Self {
        Self {
            mirroring: Mirroring::HORIZONTAL,
            chr_bank_lo4: 0,
            chr_bank_hi4: 0,
            prg_bank: 0,
            prg_ram_enabled: true,

            load_reg: 0x00,
            control_reg: 0x1C,
            load_count: 0,
        }
    }

    /// Writes the shifted-in value to the register picked by address bits 13-14.
    fn commit(&mut self, addr: u16) {
        let value = self.load_reg & 0b00011111;

        match (addr >> 13) & 0b00000011 {
            0 => {
                self.control_reg = value;
                self.mirroring = match value & 0b00000011 {
                    0 => Mirroring::ONESCREEN_LO,
                    1 => Mirroring::ONESCREEN_HI,
                    2 => Mirroring::VERTICAL,
                    _ => Mirroring::HORIZONTAL,
                };
            }
            1 => self.chr_bank_lo4 = value as usize,
            2 => self.chr_bank_hi4 = value as usize,
            _ => {
                self.prg_bank = (value & 0b00001111) as usize;
                self.prg_ram_enabled = value & 0b00010000 == 0;
            }
        }

        tracing::debug!("MMC1 control:{:05b} prg:{} chr:{}/{}",
            self.control_reg, self.prg_bank, self.chr_bank_lo4, self.chr_bank_hi4);
    }

    /// The 16 KiB bank visible at `addr` under the current PRG mode.
    fn prg_bank_for(&self, mem: &CartridgeMemory, addr: u16) -> usize {
        let last_bank = mem.prg_banks(PRG_ROM_SIZE) - 1;
        let upper_half = matches!(addr, PRG_ROM_HI_START..=PRG_ROM_HI_END);

        match (self.control_reg >> 2) & 0b00000011 {
            0 | 1 => (self.prg_bank & !0x01) | upper_half as usize,
            2 => if upper_half { self.prg_bank } else { 0 },
            _ => if matches!(addr, PRG_ROM_LO_START..=PRG_ROM_LO_END) { self.prg_bank } else { last_bank },
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::nes::cartridge::{marker_image, CartridgeNes, Mirroring};

    fn serial_write(cart: &mut CartridgeNes, addr: u16, value: u8) {
        for bit in 0..5 {
            cart.cpu_write(addr, (value >> bit) & 0x01);
        }
    }

    #[test]
    fn test_power_on_fixes_last_bank() {
        let mut cart = CartridgeNes::from_ines_bytes(&marker_image(1, 8, 2, 0)).unwrap();
        assert_eq!(cart.cpu_read(0x8000), Some(0));
        assert_eq!(cart.cpu_read(0xC000), Some(7));
    }

    #[test]
    fn test_prg_bank_switch() {
        let mut cart = CartridgeNes::from_ines_bytes(&marker_image(1, 8, 2, 0)).unwrap();
        serial_write(&mut cart, 0xE000, 5);
        assert_eq!(cart.cpu_read(0x8000), Some(5));
        assert_eq!(cart.cpu_read(0xC000), Some(7));

        // 32 KiB mode drops the low bit
        serial_write(&mut cart, 0x8000, 0b00000);
        assert_eq!(cart.cpu_read(0x8000), Some(4));
        assert_eq!(cart.cpu_read(0xC000), Some(5));
        assert_eq!(cart.mirroring(), Mirroring::ONESCREEN_LO);
    }

    #[test]
    fn test_fixed_first_bank_mode() {
        let mut cart = CartridgeNes::from_ines_bytes(&marker_image(1, 8, 2, 0)).unwrap();
        serial_write(&mut cart, 0x8000, 0b01011);
        serial_write(&mut cart, 0xE000, 3);
        assert_eq!(cart.cpu_read(0x8000), Some(0));
        assert_eq!(cart.cpu_read(0xC000), Some(3));
        assert_eq!(cart.mirroring(), Mirroring::HORIZONTAL);
    }

    #[test]
    fn test_reset_bit_aborts_sequence() {
        let mut cart = CartridgeNes::from_ines_bytes(&marker_image(1, 8, 2, 0)).unwrap();
        cart.cpu_write(0xE000, 1);
        cart.cpu_write(0xE000, 1);
        cart.cpu_write(0xE000, 0x80);
        serial_write(&mut cart, 0xE000, 2);
        assert_eq!(cart.cpu_read(0x8000), Some(2));
    }

    #[test]
    fn test_chr_4k_banks() {
        let mut cart = CartridgeNes::from_ines_bytes(&marker_image(1, 2, 2, 0)).unwrap();
        serial_write(&mut cart, 0x8000, 0b11100);
        serial_write(&mut cart, 0xA000, 3);
        serial_write(&mut cart, 0xC000, 0);
        assert_eq!(cart.ppu_read(0x0000), 0x81);
        assert_eq!(cart.ppu_read(0x1000), 0x80);
    }

    #[test]
    fn test_prg_ram_disable() {
        let mut cart = CartridgeNes::from_ines_bytes(&marker_image(1, 2, 2, 0)).unwrap();
        cart.cpu_write(0x6000, 0x77);
        assert_eq!(cart.cpu_read(0x6000), Some(0x77));

        serial_write(&mut cart, 0xE000, 0b10000);
        assert_eq!(cart.cpu_read(0x6000), None);
    }
}
