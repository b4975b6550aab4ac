use crate::gb::bus::GbBus;
use crate::gb::interrupt::Interrupt;
use crate::gb::io::IoRegistry;
use crate::joypad::JoypadState;
use crate::{EmulationError, SystemControl};

pub const P1_REG: u16 = 0xFF00;

const SELECT_DIRECTIONS: u8 = 0b00010000;
const SELECT_ACTIONS: u8 = 0b00100000;

/// The P1 register. Bits 4 and 5 select the direction or action group (active low);
/// the low nibble reads 0 for each pressed button of a selected group.
pub struct JoypadPort {
    select: u8,
    state: JoypadState,
}

impl SystemControl for JoypadPort {
    fn reset(&mut self) {
        self.select = SELECT_DIRECTIONS | SELECT_ACTIONS;
        self.state = JoypadState::empty();
    }
}

impl JoypadPort {
    pub fn new() -> Self {
        Self {
            select: SELECT_DIRECTIONS | SELECT_ACTIONS,
            state: JoypadState::empty(),
        }
    }

    pub fn read(&self) -> u8 {
        let mut pressed = 0;
        if self.select & SELECT_DIRECTIONS == 0 {
            pressed |= self.state.direction_nibble();
        }
        if self.select & SELECT_ACTIONS == 0 {
            pressed |= self.state.action_nibble();
        }

        0b11000000 | self.select | (!pressed & 0x0F)
    }

    #[inline]
    pub fn write(&mut self, byte: u8) {
        self.select = byte & (SELECT_DIRECTIONS | SELECT_ACTIONS);
    }

    #[inline]
    pub fn state(&self) -> JoypadState {
        self.state
    }

    /// Replaces the pressed set. Any newly pressed button requests the joypad
    /// interrupt; returns true in that case.
    pub fn update(&mut self, state: JoypadState, interrupts: &mut Interrupt) -> bool {
        let newly_pressed = !state.difference(self.state).is_empty();
        self.state = state;

        if newly_pressed {
            interrupts.insert(Interrupt::JOYPAD);
        }
        newly_pressed
    }

    pub fn register_io(registry: &mut IoRegistry) -> Result<(), EmulationError> {
        registry.register(P1_REG,
            |bus: &GbBus, _| bus.joypad.read(),
            |bus: &mut GbBus, _, byte| bus.joypad.write(byte))
    }
}
