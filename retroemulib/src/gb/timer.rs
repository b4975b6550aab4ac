use crate::gb::bus::GbBus;
use crate::gb::interrupt::Interrupt;
use crate::gb::io::IoRegistry;
use crate::{EmulationError, SystemControl};

pub const DIV_REG: u16 = 0xFF04;
pub const TIMA_REG: u16 = 0xFF05;
pub const TMA_REG: u16 = 0xFF06;
pub const TAC_REG: u16 = 0xFF07;

const TAC_ENABLE: u8 = 0b00000100;

// the APU frame sequencer steps when this divider bit falls (512 Hz)
const FRAME_SEQUENCER_BIT: u16 = 1 << 12;

/// DIV/TIMA/TMA/TAC. The 16-bit divider counts T-cycles; TIMA is clocked by the
/// falling edge of the divider bit picked by TAC, gated by the enable bit.
pub struct Timer {
    divider: u16,
    tima: u8,
    tma: u8,
    tac: u8,

    frame_sequencer_clock: bool,
}

impl SystemControl for Timer {
    fn reset(&mut self) {
        self.divider = 0;
        self.tima = 0;
        self.tma = 0;
        self.tac = 0;
        self.frame_sequencer_clock = false;
    }
}

impl Timer {
    pub fn new() -> Self {
        Self {
            divider: 0,
            tima: 0,
            tma: 0,
            tac: 0,

            frame_sequencer_clock: false,
        }
    }

    /// Timer state as the DMG boot ROM leaves it.
    pub fn post_boot() -> Self {
        Self {
            divider: 0xABCC,
            ..Timer::new()
        }
    }

    /// Advances the divider by one T-cycle.
    #[inline]
    pub fn tick(&mut self, interrupts: &mut Interrupt) {
        self.set_divider(self.divider.wrapping_add(1), interrupts);
    }

    /// True once after each falling edge of divider bit 12.
    #[inline]
    pub fn take_frame_sequencer_clock(&mut self) -> bool {
        std::mem::take(&mut self.frame_sequencer_clock)
    }

    #[inline]
    pub fn divider(&self) -> u16 {
        self.divider
    }

    #[inline]
    pub fn read_div(&self) -> u8 {
        (self.divider >> 8) as u8
    }

    /// Any write clears the whole divider, which may itself produce a falling edge.
    pub fn write_div(&mut self, interrupts: &mut Interrupt) {
        self.set_divider(0, interrupts);
    }

    #[inline]
    pub fn read_tima(&self) -> u8 {
        self.tima
    }

    #[inline]
    pub fn write_tima(&mut self, byte: u8) {
        self.tima = byte;
    }

    #[inline]
    pub fn read_tma(&self) -> u8 {
        self.tma
    }

    #[inline]
    pub fn write_tma(&mut self, byte: u8) {
        self.tma = byte;
    }

    #[inline]
    pub fn read_tac(&self) -> u8 {
        self.tac | 0b11111000
    }

    pub fn write_tac(&mut self, byte: u8, interrupts: &mut Interrupt) {
        let was_high = self.timer_input();
        self.tac = byte & 0b00000111;

        if was_high && !self.timer_input() {
            self.increment_tima(interrupts);
        }
    }

    fn set_divider(&mut self, value: u16, interrupts: &mut Interrupt) {
        let was_high = self.timer_input();
        let frame_bit_was_high = self.divider & FRAME_SEQUENCER_BIT != 0;

        self.divider = value;

        if was_high && !self.timer_input() {
            self.increment_tima(interrupts);
        }

        if frame_bit_was_high && self.divider & FRAME_SEQUENCER_BIT == 0 {
            self.frame_sequencer_clock = true;
        }
    }

    /// The selected divider bit ANDed with the enable bit.
    #[inline]
    fn timer_input(&self) -> bool {
        let bit = match self.tac & 0b00000011 {
            0 => 9, // 4096 Hz
            1 => 3, // 262144 Hz
            2 => 5, // 65536 Hz
            _ => 7, // 16384 Hz
        };

        self.tac & TAC_ENABLE != 0 && (self.divider >> bit) & 0x01 != 0
    }

    fn increment_tima(&mut self, interrupts: &mut Interrupt) {
        let (value, overflow) = self.tima.overflowing_add(1);
        if overflow {
            self.tima = self.tma;
            interrupts.insert(Interrupt::TIMER);
        } else {
            self.tima = value;
        }
    }

    pub fn register_io(registry: &mut IoRegistry) -> Result<(), EmulationError> {
        registry.register(DIV_REG,
            |bus: &GbBus, _| bus.timer.read_div(),
            |bus: &mut GbBus, _, _| bus.timer.write_div(&mut bus.interrupt_flag))?;
        registry.register(TIMA_REG,
            |bus: &GbBus, _| bus.timer.read_tima(),
            |bus: &mut GbBus, _, byte| bus.timer.write_tima(byte))?;
        registry.register(TMA_REG,
            |bus: &GbBus, _| bus.timer.read_tma(),
            |bus: &mut GbBus, _, byte| bus.timer.write_tma(byte))?;
        registry.register(TAC_REG,
            |bus: &GbBus, _| bus.timer.read_tac(),
            |bus: &mut GbBus, _, byte| bus.timer.write_tac(byte, &mut bus.interrupt_flag))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(timer: &mut Timer, interrupts: &mut Interrupt, cycles: u32) {
        for _ in 0..cycles {
            timer.tick(interrupts);
        }
    }

    #[test]
    fn test_div_counts_every_256_cycles() {
        let mut timer = Timer::new();
        let mut interrupts = Interrupt::empty();
        run(&mut timer, &mut interrupts, 255);
        assert_eq!(timer.read_div(), 0);
        run(&mut timer, &mut interrupts, 1);
        assert_eq!(timer.read_div(), 1);

        timer.write_div(&mut interrupts);
        assert_eq!(timer.read_div(), 0);
        assert_eq!(timer.divider(), 0);
    }

    #[test]
    fn test_tima_rates() {
        for (tac, period) in [(0x04, 1024), (0x05, 16), (0x06, 64), (0x07, 256)] {
            let mut timer = Timer::new();
            let mut interrupts = Interrupt::empty();
            timer.write_tac(tac, &mut interrupts);

            run(&mut timer, &mut interrupts, period * 3);
            assert_eq!(timer.read_tima(), 3, "TAC {:02X}", tac);
        }
    }

    #[test]
    fn test_disabled_timer_holds() {
        let mut timer = Timer::new();
        let mut interrupts = Interrupt::empty();
        timer.write_tac(0x01, &mut interrupts);
        run(&mut timer, &mut interrupts, 1000);
        assert_eq!(timer.read_tima(), 0);
        assert_eq!(timer.read_tac(), 0xF9);
    }

    #[test]
    fn test_overflow_reloads_and_interrupts() {
        let mut timer = Timer::new();
        let mut interrupts = Interrupt::empty();
        timer.write_tma(0xF0);
        timer.write_tima(0xFF);
        timer.write_tac(0x05, &mut interrupts);

        run(&mut timer, &mut interrupts, 16);
        assert_eq!(timer.read_tima(), 0xF0);
        assert!(interrupts.contains(Interrupt::TIMER));
    }

    #[test]
    fn test_div_write_falling_edge_increments() {
        let mut timer = Timer::new();
        let mut interrupts = Interrupt::empty();
        timer.write_tac(0x05, &mut interrupts);

        // bit 3 is high after 8 cycles
        run(&mut timer, &mut interrupts, 8);
        assert_eq!(timer.read_tima(), 0);
        timer.write_div(&mut interrupts);
        assert_eq!(timer.read_tima(), 1);
    }

    #[test]
    fn test_frame_sequencer_edge() {
        let mut timer = Timer::new();
        let mut interrupts = Interrupt::empty();
        run(&mut timer, &mut interrupts, 8191);
        assert!(!timer.take_frame_sequencer_clock());
        run(&mut timer, &mut interrupts, 8192);
        assert!(timer.take_frame_sequencer_clock());
        assert!(!timer.take_frame_sequencer_clock());
    }
}
