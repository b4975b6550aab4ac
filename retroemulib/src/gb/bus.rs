use crate::gb::apu::Apu;
use crate::gb::cartridge::CartridgeGb;
use crate::gb::dma::OamDma;
use crate::gb::interrupt::Interrupt;
use crate::gb::io::{IoRegistry, IO_END, IO_REGISTRY, IO_START};
use crate::gb::joypad::JoypadPort;
use crate::gb::ppu::{Ppu, OAM_END, OAM_START, VRAM_END, VRAM_START};
use crate::gb::timer::Timer;
use crate::config::DmgShade;
use crate::{EmulationError, SystemControl};

const ROM_END: u16 = 0x7FFF;
const EXTERNAL_RAM_START: u16 = 0xA000;
const EXTERNAL_RAM_END: u16 = 0xBFFF;
const WRAM_START: u16 = 0xC000;
const WRAM_END: u16 = 0xDFFF;
const ECHO_START: u16 = 0xE000;
const ECHO_END: u16 = 0xFDFF;
const UNUSABLE_START: u16 = 0xFEA0;
const UNUSABLE_END: u16 = 0xFEFF;
const HRAM_START: u16 = 0xFF80;
const HRAM_END: u16 = 0xFFFE;
pub const IE_REG: u16 = 0xFFFF;

pub const SB_REG: u16 = 0xFF01;
pub const SC_REG: u16 = 0xFF02;
pub const IF_REG: u16 = 0xFF0F;
pub const BOOT_DISABLE_REG: u16 = 0xFF50;

pub const BOOT_ROM_SIZE: usize = 0x100;

const WRAM_SIZE: usize = 0x2000;
const HRAM_SIZE: usize = 0x7F;

const T_CYCLES_PER_M_CYCLE: u8 = 4;

/// The DMG address space. Owns work RAM, high RAM and the interrupt masks; every
/// other region belongs to the cartridge or a peripheral.
pub struct GbBus {
    pub cartridge: CartridgeGb,
    pub ppu: Ppu,
    pub timer: Timer,
    pub dma: OamDma,
    pub apu: Apu,
    pub joypad: JoypadPort,

    pub interrupt_flag: Interrupt,
    pub interrupt_enable: u8,

    wram: [u8; WRAM_SIZE],
    hram: [u8; HRAM_SIZE],

    boot_rom: Option<Vec<u8>>,
    serial_data: u8,
    serial_control: u8,

    // T-cycles into the current M-cycle
    sub_cycle: u8,
}

impl SystemControl for GbBus {
    fn reset(&mut self) {
        self.cartridge.reset();
        self.ppu.reset();
        self.timer.reset();
        self.dma.reset();
        self.apu.reset();
        self.joypad.reset();
        self.interrupt_flag = Interrupt::empty();
        self.interrupt_enable = 0;
        self.boot_rom = None;
        self.wram = [0; WRAM_SIZE];
        self.hram = [0; HRAM_SIZE];
        self.serial_data = 0;
        self.serial_control = 0;
        self.sub_cycle = 0;
    }
}

impl GbBus {
    /// A bus at power-on. Either map a boot ROM or skip straight to the post-boot state.
    pub fn new(cartridge: CartridgeGb, shades: [DmgShade; 4]) -> Self {
        Self {
            cartridge,
            ppu: Ppu::new(shades),
            timer: Timer::new(),
            dma: OamDma::new(),
            apu: Apu::new(),
            joypad: JoypadPort::new(),

            interrupt_flag: Interrupt::empty(),
            interrupt_enable: 0,

            wram: [0; WRAM_SIZE],
            hram: [0; HRAM_SIZE],

            boot_rom: None,
            serial_data: 0,
            serial_control: 0,

            sub_cycle: 0,
        }
    }

    /// A bus in the state the DMG boot ROM hands over to the cartridge.
    pub fn post_boot(cartridge: CartridgeGb, shades: [DmgShade; 4]) -> Self {
        let mut bus = GbBus::new(cartridge, shades);
        bus.skip_boot();
        bus
    }

    /// Loads the IO state the DMG boot ROM leaves behind.
    pub fn skip_boot(&mut self) {
        self.boot_rom = None;
        self.ppu.skip_boot();
        self.timer = Timer::post_boot();
        self.apu = Apu::post_boot();
        self.interrupt_flag = Interrupt::VBLANK;
    }

    /// Overlays `boot_rom` at 0x0000 until a non-zero write to 0xFF50.
    pub fn map_boot_rom(&mut self, boot_rom: Vec<u8>) {
        self.boot_rom = Some(boot_rom);
    }

    #[inline]
    pub fn boot_rom_active(&self) -> bool {
        self.boot_rom.is_some()
    }

    pub fn read(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=ROM_END => match &self.boot_rom {
                Some(boot_rom) if (addr as usize) < boot_rom.len() => boot_rom[addr as usize],
                _ => self.cartridge.read(addr),
            },
            VRAM_START..=VRAM_END => self.ppu.read_vram(addr),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.read(addr),
            WRAM_START..=WRAM_END => self.wram[(addr - WRAM_START) as usize],
            ECHO_START..=ECHO_END => self.wram[(addr - ECHO_START) as usize],
            OAM_START..=OAM_END => {
                if self.dma.is_active() {
                    tracing::trace!("OAM read at {:04X} during DMA", addr);
                    return 0xFF;
                }
                self.ppu.read_oam(addr)
            }
            UNUSABLE_START..=UNUSABLE_END => {
                tracing::trace!("read from unusable area at {:04X}", addr);
                0xFF
            }
            IO_START..=IO_END => match IO_REGISTRY.port(addr) {
                Some(port) => (port.read)(self, addr),
                None => {
                    tracing::trace!("read from unmapped IO register {:04X}", addr);
                    0xFF
                }
            },
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize],
            IE_REG => self.interrupt_enable,
        }
    }

    pub fn write(&mut self, addr: u16, byte: u8) {
        match addr {
            0x0000..=ROM_END => self.cartridge.write(addr, byte),
            VRAM_START..=VRAM_END => self.ppu.write_vram(addr, byte),
            EXTERNAL_RAM_START..=EXTERNAL_RAM_END => self.cartridge.write(addr, byte),
            WRAM_START..=WRAM_END => self.wram[(addr - WRAM_START) as usize] = byte,
            ECHO_START..=ECHO_END => self.wram[(addr - ECHO_START) as usize] = byte,
            OAM_START..=OAM_END => {
                if self.dma.is_active() {
                    tracing::trace!("dropped OAM write {:02X} at {:04X} during DMA", byte, addr);
                    return;
                }
                self.ppu.write_oam(addr, byte)
            }
            UNUSABLE_START..=UNUSABLE_END => {
                tracing::trace!("dropped write {:02X} to unusable area at {:04X}", byte, addr)
            }
            IO_START..=IO_END => match IO_REGISTRY.port(addr) {
                Some(port) => (port.write)(self, addr, byte),
                None => tracing::trace!("dropped write {:02X} to unmapped IO register {:04X}", byte, addr),
            },
            HRAM_START..=HRAM_END => self.hram[(addr - HRAM_START) as usize] = byte,
            IE_REG => self.interrupt_enable = byte,
        }
    }

    #[inline]
    pub fn read16(&self, addr: u16) -> u16 {
        u16::from_le_bytes([self.read(addr), self.read(addr.wrapping_add(1))])
    }

    #[inline]
    pub fn write16(&mut self, addr: u16, value: u16) {
        let [lo, hi] = value.to_le_bytes();
        self.write(addr, lo);
        self.write(addr.wrapping_add(1), hi);
    }

    /// Pending interrupts that are also enabled.
    #[inline]
    pub fn pending_interrupts(&self) -> Interrupt {
        self.interrupt_flag & Interrupt::from_bits_truncate(self.interrupt_enable)
    }

    /// Advances every peripheral by one T-cycle (one PPU dot).
    pub fn tick(&mut self) {
        self.timer.tick(&mut self.interrupt_flag);
        self.ppu.tick(&mut self.interrupt_flag);

        if self.timer.take_frame_sequencer_clock() {
            self.apu.clock_frame_sequencer();
        }
        self.apu.tick();

        self.sub_cycle += 1;
        if self.sub_cycle == T_CYCLES_PER_M_CYCLE {
            self.sub_cycle = 0;
            self.tick_dma();
        }
    }

    fn tick_dma(&mut self) {
        if let Some((source, index)) = self.dma.next_transfer() {
            let byte = self.read(source);
            self.ppu.write_oam_direct(index, byte);
        }
    }

    pub fn register_io(registry: &mut IoRegistry) -> Result<(), EmulationError> {
        registry.register(SB_REG,
            |bus: &GbBus, _| bus.serial_data,
            |bus: &mut GbBus, _, byte| bus.serial_data = byte)?;
        registry.register(SC_REG,
            |bus: &GbBus, _| bus.serial_control | 0b01111110,
            |bus: &mut GbBus, _, byte| {
                // no link partner, so a started transfer never completes
                bus.serial_control = byte & 0b10000001;
            })?;
        registry.register(IF_REG,
            |bus: &GbBus, _| bus.interrupt_flag.bits() | 0b11100000,
            |bus: &mut GbBus, _, byte| bus.interrupt_flag = Interrupt::from_bits_truncate(byte))?;
        registry.register(BOOT_DISABLE_REG,
            |_: &GbBus, _| 0xFF,
            |bus: &mut GbBus, _, byte| {
                if byte != 0 && bus.boot_rom.take().is_some() {
                    tracing::debug!("boot ROM unmapped");
                }
            })?;
        Ok(())
    }
}

#[cfg(test)]
impl GbBus {
    pub fn test_new() -> Self {
        use crate::config::EmulatorConfig;
        use crate::gb::cartridge::marker_rom;

        let cartridge = match CartridgeGb::from_rom_bytes(&marker_rom(0x03, 2, 3)) {
            Ok(cartridge) => cartridge,
            Err(err) => panic!("marker ROM rejected: {}", err),
        };
        GbBus::post_boot(cartridge, EmulatorConfig::default().dmg_palette)
    }

    pub fn run(&mut self, t_cycles: u32) {
        for _ in 0..t_cycles {
            self.tick();
        }
    }
}
