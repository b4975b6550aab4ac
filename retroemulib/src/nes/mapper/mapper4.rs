use super::{Mapper, PRG_RAM_END, PRG_RAM_START, PRG_ROM_END, PRG_ROM_HI_END, PRG_ROM_HI_START, PRG_ROM_LO_END, PRG_ROM_LO_START, PRG_ROM_START};
use crate::nes::cartridge::{CartridgeMemory, Mirroring, PRG_ROM_SIZE};
use crate::SystemControl;

const PRG_BANK_8K: usize = PRG_ROM_SIZE >> 1;
const CHR_BANK_1K: usize = 0x400;

/// MMC3: 8 KiB PRG and 1/2 KiB CHR banking with a scanline IRQ counter.
pub struct Mapper4 {
    mirroring: Mirroring,
    prg_rom_banks: usize,

    prg_bank_offset: [usize; 4],
    chr_bank_offset: [usize; 8],

    prg_mode: bool,
    chr_inversion: bool,
    registers: [usize; 8],
    target_register: usize,

    prg_ram_enabled: bool,
    prg_ram_write_protect: bool,

    irq_counter: u8,
    irq_latch: u8,
    irq_reload: bool,
    irq_enable: bool,
    irq_active: bool,
}

impl SystemControl for Mapper4 {
    fn reset(&mut self) {
        self.mirroring = Mirroring::VERTICAL;
        self.prg_mode = false;
        self.chr_inversion = false;
        self.registers = [0; 8];
        self.target_register = 0;
        self.prg_ram_enabled = true;
        self.prg_ram_write_protect = false;

        self.irq_counter = 0;
        self.irq_latch = 0;
        self.irq_reload = false;
        self.irq_enable = false;
        self.irq_active = false;

        self.update_banks();
    }
}

impl Mapper for Mapper4 {
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
                let slot = (addr as usize & 0x6000) >> 13;
                Some(mem.prg_byte(self.prg_bank_offset[slot] + (addr as usize & 0x1FFF)))
            }
            _ => None,
        }
    }

    fn cpu_write(&mut self, mem: &mut CartridgeMemory, addr: u16, byte: u8) -> bool {
        let even = addr & 0x01 == 0;

        match addr {
            PRG_RAM_START..=PRG_RAM_END => {
                if self.prg_ram_enabled && !self.prg_ram_write_protect {
                    mem.write_prg_ram(addr, byte);
                }
            }
            PRG_ROM_LO_START..=PRG_ROM_LO_END if addr < 0xA000 => {
                if even {
                    self.target_register = (byte & 0b00000111) as usize;
                    self.prg_mode = byte & 0b01000000 != 0;
                    self.chr_inversion = byte & 0b10000000 != 0;
                } else {
                    self.registers[self.target_register] = byte as usize;
                }
                self.update_banks();
            }
            PRG_ROM_LO_START..=PRG_ROM_LO_END => {
                if even {
                    self.mirroring = if byte & 0x01 != 0 {
                        Mirroring::HORIZONTAL
                    } else {
                        Mirroring::VERTICAL
                    };
                } else {
                    self.prg_ram_enabled = byte & 0b10000000 != 0;
                    self.prg_ram_write_protect = byte & 0b01000000 != 0;
                }
            }
            PRG_ROM_HI_START..=PRG_ROM_HI_END if addr < 0xE000 => {
                if even {
                    self.irq_latch = byte;
                } else {
                    self.irq_counter = 0;
                    self.irq_reload = true;
                }
            }
            PRG_ROM_HI_START..=PRG_ROM_HI_END => {
                if even {
                    self.irq_enable = false;
                    self.irq_active = false;
                } else {
                    self.irq_enable = true;
                }
            }
            _ => return false,
        }

        true
    }

    fn chr_offset(&self, addr: u16) -> usize {
        let slot = (addr as usize & 0x1C00) >> 10;
        self.chr_bank_offset[slot] + (addr as usize & 0x03FF)
    }

    fn mirroring(&self) -> Option<Mirroring> {
        Some(self.mirroring)
    }

    fn notify_scanline(&mut self) {
        if self.irq_counter == 0 || self.irq_reload {
            self.irq_counter = self.irq_latch;
            self.irq_reload = false;
        } else {
            self.irq_counter -= 1;
        }

        if self.irq_counter == 0 && self.irq_enable {
            self.irq_active = true;
        }
    }

    fn irq_active(&self) -> bool {
        self.irq_active
    }
}

impl Mapper4 {
    pub fn new(prg_rom_banks: usize) -> Self {
        let mut mapper = Self {
            mirroring: Mirroring::VERTICAL,
            prg_rom_banks,

            prg_bank_offset: [0; 4],
            chr_bank_offset: [0; 8],

            prg_mode: false,
            chr_inversion: false,
            registers: [0; 8],
            target_register: 0,

            prg_ram_enabled: true,
            prg_ram_write_protect: false,

            irq_counter: 0,
            irq_latch: 0,
            irq_reload: false,
            irq_enable: false,
            irq_active: false,
        };

        mapper.update_banks();
        mapper
    }

    fn update_banks(&mut self) {
        let prg_banks = (self.prg_rom_banks << 1).max(2);
        let second_last = (prg_banks - 2) * PRG_BANK_8K;
        let r6 = (self.registers[6] & 0b00111111) % prg_banks * PRG_BANK_8K;
        let r7 = (self.registers[7] & 0b00111111) % prg_banks * PRG_BANK_8K;

        self.prg_bank_offset = if self.prg_mode {
            [second_last, r7, r6, (prg_banks - 1) * PRG_BANK_8K]
        } else {
            [r6, r7, second_last, (prg_banks - 1) * PRG_BANK_8K]
        };

        let r = &self.registers;
        let two_kb = [
            (r[0] & 0xFE) * CHR_BANK_1K,
            (r[0] | 0x01) * CHR_BANK_1K,
            (r[1] & 0xFE) * CHR_BANK_1K,
            (r[1] | 0x01) * CHR_BANK_1K,
        ];
        let one_kb = [r[2] * CHR_BANK_1K, r[3] * CHR_BANK_1K, r[4] * CHR_BANK_1K, r[5] * CHR_BANK_1K];

        self.chr_bank_offset = if self.chr_inversion {
            [one_kb[0], one_kb[1], one_kb[2], one_kb[3], two_kb[0], two_kb[1], two_kb[2], two_kb[3]]
        } else {
            [two_kb[0], two_kb[1], two_kb[2], two_kb[3], one_kb[0], one_kb[1], one_kb[2], one_kb[3]]
        };
    }
}
