use crate::nes::cartridge::{CartridgeNes, Mirroring};
use crate::SystemControl;

use super::registers::{LoopyPpuReg, PpuCtrl, PpuMask, PpuStatus};

const PATTERN_TABLE_START: u16 = 0x0000;
const PATTERN_TABLE_END: u16 = 0x1FFF;

pub const NAME_TABLE_START: u16 = 0x2000;
const NAME_TABLE_END: u16 = 0x3EFF;
pub const ATTR_TABLE_START: u16 = 0x23C0;

pub const PALETTE_TABLE_START: u16 = 0x3F00;
const PALETTE_TABLE_END: u16 = 0x3FFF;

const PALETTE_TABLE_SIZE: usize = 0x20;
const NAME_TABLE_SIZE: usize = 0x400;
pub const OAM_SIZE: usize = 0x100;

#[derive(Clone, Copy, Debug)]
pub struct OamEntry {
    pub y: u8,
    pub id: u8,
    attributes: u8,
    pub x: u8,
}

impl OamEntry {
    pub fn y_flipped(&self) -> bool {
        self.attributes & 0x80 != 0
    }

    pub fn x_flipped(&self) -> bool {
        self.attributes & 0x40 != 0
    }

    pub fn in_front(&self) -> bool {
        self.attributes & 0x20 == 0
    }

    pub fn palette(&self) -> u16 {
        (self.attributes & 0x03) as u16
    }
}

/// Everything the CPU can reach through 0x2000-0x2007 plus the PPU's own memory
/// (nametables, palette RAM and OAM).
pub struct PpuBus {
    name_table: [[u8; NAME_TABLE_SIZE]; 4],
    palette_table: [u8; PALETTE_TABLE_SIZE],
    oam: [u8; OAM_SIZE],

    pub ctrl: PpuCtrl,
    pub mask: PpuMask,
    pub status: PpuStatus,
    pub oam_addr_reg: u8,

    // Loopy Registers
    pub vram_addr: LoopyPpuReg,
    pub tram_addr: LoopyPpuReg,
    pub fine_x: u8,

    write_latch: bool,
    ppu_data_buffer: u8,
    // last value driven onto the PPU's CPU-facing data bus
    io_latch: u8,
    nmi_occurred: bool,
}

impl SystemControl for PpuBus {
    fn reset(&mut self) {
        self.ctrl = PpuCtrl::empty();
        self.mask = PpuMask::empty();
        self.status = PpuStatus::empty();
        self.oam_addr_reg = 0;

        self.vram_addr = LoopyPpuReg::default();
        self.tram_addr = LoopyPpuReg::default();
        self.fine_x = 0;

        self.write_latch = false;
        self.ppu_data_buffer = 0;
        self.io_latch = 0;
        self.nmi_occurred = false;
    }
}

impl PpuBus {
    pub fn new() -> Self {
        Self {
            name_table: [[0; NAME_TABLE_SIZE]; 4],
            palette_table: [0; PALETTE_TABLE_SIZE],
            oam: [0; OAM_SIZE],

            ctrl: PpuCtrl::empty(),
            mask: PpuMask::empty(),
            status: PpuStatus::empty(),
            oam_addr_reg: 0,

            vram_addr: LoopyPpuReg::default(),
            tram_addr: LoopyPpuReg::default(),
            fine_x: 0,

            write_latch: false,
            ppu_data_buffer: 0,
            io_latch: 0,
            nmi_occurred: false,
        }
    }

    pub fn read_oam_entry(&self, index: usize) -> OamEntry {
        let base = (index * 4) & 0xFF;
        OamEntry {
            y: self.oam[base],
            id: self.oam[base + 1],
            attributes: self.oam[base + 2],
            x: self.oam[base + 3],
        }
    }

    /// OAM DMA writes start at the current OAMADDR and wrap within the 256-byte table.
    pub fn transfer_to_oam(&mut self, index: u8, byte: u8) {
        self.oam[self.oam_addr_reg.wrapping_add(index) as usize] = byte;
    }

    /// Raises the NMI latch; the orchestrator forwards it to the CPU.
    pub fn raise_nmi(&mut self) {
        self.nmi_occurred = true;
    }

    pub fn take_nmi(&mut self) -> bool {
        std::mem::take(&mut self.nmi_occurred)
    }

    #[inline]
    pub fn rendering_enabled(&self) -> bool {
        self.mask.rendering_enabled()
    }

    // CPU can only access the PPU memory map through the PPU registers
    pub fn cpu_read_reg(&mut self, addr: u16, cartridge: &mut CartridgeNes) -> u8 {
        let value = match addr & 0x0007 {
            0x0002 => {
                let ret = (self.status.bits() & 0b11100000) | (self.io_latch & 0b00011111);
                self.status.remove(PpuStatus::IN_VBLANK);
                self.write_latch = false;
                ret
            }
            0x0004 => self.oam[self.oam_addr_reg as usize],
            0x0007 => {
                let vram_addr = self.vram_addr.0 & 0x3FFF;
                let ret = if vram_addr >= PALETTE_TABLE_START {
                    // palette reads skip the buffer, which picks up the nametable byte underneath
                    self.ppu_data_buffer = self.ppu_read(vram_addr - 0x1000, cartridge);
                    self.ppu_read(vram_addr, cartridge)
                } else {
                    let buffered = self.ppu_data_buffer;
                    self.ppu_data_buffer = self.ppu_read(vram_addr, cartridge);
                    buffered
                };

                self.increment_vram_addr();
                ret
            }
            // write-only registers read back whatever was last on the bus
            _ => self.io_latch,
        };

        self.io_latch = value;
        value
    }

    pub fn cpu_write_reg(&mut self, addr: u16, byte: u8, cartridge: &mut CartridgeNes) {
        self.io_latch = byte;

        match addr & 0x0007 {
            0x0000 => {
                let was_enabled = self.ctrl.nmi_enabled();
                self.ctrl = PpuCtrl::from_bits_truncate(byte);

                // enabling NMI while already in vblank fires immediately
                if !was_enabled && self.ctrl.nmi_enabled() && self.status.contains(PpuStatus::IN_VBLANK) {
                    self.nmi_occurred = true;
                }

                self.tram_addr.set_mask(LoopyPpuReg::NAME_TABLE_X, (byte & 0x01) as u16);
                self.tram_addr.set_mask(LoopyPpuReg::NAME_TABLE_Y, ((byte >> 1) & 0x01) as u16);
            }
            0x0001 => self.mask = PpuMask::from_bits_truncate(byte),
            0x0002 => {}
            0x0003 => self.oam_addr_reg = byte,
            0x0004 => {
                self.oam[self.oam_addr_reg as usize] = byte;
                self.oam_addr_reg = self.oam_addr_reg.wrapping_add(1);
            }
            0x0005 => {
                if !self.write_latch {
                    self.fine_x = byte & 0x07;
                    self.tram_addr.set_mask(LoopyPpuReg::COARSE_X, (byte as u16) >> 3);
                } else {
                    self.tram_addr.set_mask(LoopyPpuReg::FINE_Y, (byte as u16) & 0x07);
                    self.tram_addr.set_mask(LoopyPpuReg::COARSE_Y, (byte as u16) >> 3);
                }

                self.write_latch = !self.write_latch;
            }
            0x0006 => {
                if !self.write_latch {
                    self.tram_addr.0 = (((byte & 0x3F) as u16) << 8) | (self.tram_addr.0 & 0x00FF);
                } else {
                    self.tram_addr.0 = (self.tram_addr.0 & 0x7F00) | (byte as u16);
                    self.vram_addr = self.tram_addr;
                }

                self.write_latch = !self.write_latch;
            }
            _ => {
                self.ppu_write(self.vram_addr.0, byte, cartridge);
                self.increment_vram_addr();
            }
        }
    }

    #[inline]
    fn increment_vram_addr(&mut self) {
        self.vram_addr.0 = self.vram_addr.0.wrapping_add(self.ctrl.vram_addr_inc()) & 0x7FFF;
    }

    /// Physical nametable (0-3) backing a logical nametable address.
    #[inline]
    fn name_table_index(mirroring: Mirroring, addr: u16) -> usize {
        let addr = addr as usize;
        match mirroring {
            // [ A ] [ a ]
            // [ B ] [ b ]
            Mirroring::HORIZONTAL => (addr >> 11) & 0x01,
            // [ A ] [ B ]
            // [ a ] [ b ]
            Mirroring::VERTICAL => (addr >> 10) & 0x01,
            Mirroring::ONESCREEN_LO => 0,
            Mirroring::ONESCREEN_HI => 1,
            Mirroring::FOUR_SCREEN => (addr >> 10) & 0x03,
        }
    }

    #[inline]
    fn palette_index(addr: u16) -> usize {
        let addr = addr as usize & 0x001F;
        // sprite palette entry 0 aliases the matching background entry
        if addr & 0x13 == 0x10 { addr - 0x10 } else { addr }
    }

    pub fn ppu_read(&self, addr: u16, cartridge: &mut CartridgeNes) -> u8 {
        let addr = addr & 0x3FFF;

        match addr {
            PATTERN_TABLE_START..=PATTERN_TABLE_END => cartridge.ppu_read(addr),
            NAME_TABLE_START..=NAME_TABLE_END => {
                let table = Self::name_table_index(cartridge.mirroring(), addr);
                self.name_table[table][addr as usize & 0x3FF]
            }
            PALETTE_TABLE_START..=PALETTE_TABLE_END => {
                let colour = self.palette_table[Self::palette_index(addr)];
                colour & if self.mask.greyscale_on() { 0x30 } else { 0x3F }
            }
            _ => 0,
        }
    }

    pub fn ppu_write(&mut self, addr: u16, byte: u8, cartridge: &mut CartridgeNes) {
        let addr = addr & 0x3FFF;

        match addr {
            PATTERN_TABLE_START..=PATTERN_TABLE_END => cartridge.ppu_write(addr, byte),
            NAME_TABLE_START..=NAME_TABLE_END => {
                let table = Self::name_table_index(cartridge.mirroring(), addr);
                self.name_table[table][addr as usize & 0x3FF] = byte;
            }
            PALETTE_TABLE_START..=PALETTE_TABLE_END => {
                self.palette_table[Self::palette_index(addr)] = byte;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nes::cartridge::{marker_image, CartridgeNes};

    fn vertical_cart() -> CartridgeNes {
        CartridgeNes::from_ines_bytes(&marker_image(0, 1, 0, 0x01)).unwrap()
    }

    fn set_addr(bus: &mut PpuBus, cart: &mut CartridgeNes, addr: u16) {
        bus.cpu_write_reg(0x2006, (addr >> 8) as u8, cart);
        bus.cpu_write_reg(0x2006, addr as u8, cart);
    }

    #[test]
    fn test_ppudata_read_is_buffered() {
        let mut cart = vertical_cart();
        let mut bus = PpuBus::new();
        set_addr(&mut bus, &mut cart, 0x2000);
        bus.cpu_write_reg(0x2007, 0xAB, &mut cart);
        bus.cpu_write_reg(0x2007, 0xCD, &mut cart);

        set_addr(&mut bus, &mut cart, 0x2000);
        bus.cpu_read_reg(0x2007, &mut cart);
        assert_eq!(bus.cpu_read_reg(0x2007, &mut cart), 0xAB);
        assert_eq!(bus.cpu_read_reg(0x2007, &mut cart), 0xCD);
    }

    #[test]
    fn test_palette_read_is_immediate_and_mirrored() {
        let mut cart = vertical_cart();
        let mut bus = PpuBus::new();
        set_addr(&mut bus, &mut cart, 0x3F00);
        bus.cpu_write_reg(0x2007, 0x21, &mut cart);

        set_addr(&mut bus, &mut cart, 0x3F10);
        assert_eq!(bus.cpu_read_reg(0x2007, &mut cart), 0x21);
    }

    #[test]
    fn test_vertical_mirroring() {
        let mut cart = vertical_cart();
        let mut bus = PpuBus::new();
        bus.ppu_write(0x2005, 0x11, &mut cart);
        bus.ppu_write(0x2405, 0x22, &mut cart);
        assert_eq!(bus.ppu_read(0x2805, &mut cart), 0x11);
        assert_eq!(bus.ppu_read(0x2C05, &mut cart), 0x22);
        // 0x3000-0x3EFF mirrors 0x2000-0x2EFF
        assert_eq!(bus.ppu_read(0x3005, &mut cart), 0x11);
    }

    #[test]
    fn test_status_read_clears_vblank_and_latch() {
        let mut cart = vertical_cart();
        let mut bus = PpuBus::new();
        bus.status.insert(PpuStatus::IN_VBLANK);
        bus.cpu_write_reg(0x2006, 0x3F, &mut cart);
        bus.cpu_write_reg(0x2001, 0x1F, &mut cart);

        let status = bus.cpu_read_reg(0x2002, &mut cart);
        assert_eq!(status, 0x80 | 0x1F);
        assert!(!bus.status.contains(PpuStatus::IN_VBLANK));

        // latch reset means the next 0x2006 write is the high byte again
        set_addr(&mut bus, &mut cart, 0x2123);
        assert_eq!(bus.vram_addr.0, 0x2123);
    }

    #[test]
    fn test_write_only_register_reads_open_bus() {
        let mut cart = vertical_cart();
        let mut bus = PpuBus::new();
        bus.cpu_write_reg(0x2005, 0x5A, &mut cart);
        assert_eq!(bus.cpu_read_reg(0x2000, &mut cart), 0x5A);
    }

    #[test]
    fn test_nmi_enable_during_vblank() {
        let mut cart = vertical_cart();
        let mut bus = PpuBus::new();
        bus.status.insert(PpuStatus::IN_VBLANK);
        bus.cpu_write_reg(0x2000, 0x80, &mut cart);
        assert!(bus.take_nmi());
        assert!(!bus.take_nmi());

        // rewriting with NMI already enabled does not fire again
        bus.cpu_write_reg(0x2000, 0x80, &mut cart);
        assert!(!bus.take_nmi());
    }

    #[test]
    fn test_oam_dma_starts_at_oamaddr() {
        let mut bus = PpuBus::new();
        bus.oam_addr_reg = 0xFE;
        bus.transfer_to_oam(0, 0x10);
        bus.transfer_to_oam(1, 0x20);
        bus.transfer_to_oam(2, 0x30);
        assert_eq!(bus.oam[0xFE], 0x10);
        assert_eq!(bus.oam[0xFF], 0x20);
        assert_eq!(bus.oam[0x00], 0x30);
    }
}
