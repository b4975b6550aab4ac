#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Button {
    Up,
    Down,
    Left,
    Right,
    Start,
    Select,
    A,
    B,
}

impl Button {
    /// Every button, in NES controller shift order.
    pub const ALL: [Button; 8] = [
        Button::A, Button::B, Button::Select, Button::Start,
        Button::Up, Button::Down, Button::Left, Button::Right,
    ];
}

bitflags! {
    /// Pressed buttons, laid out in NES controller shift order (A first).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct JoypadState: u8 {
        const A      = 0b00000001;
        const B      = 0b00000010;
        const SELECT = 0b00000100;
        const START  = 0b00001000;
        const UP     = 0b00010000;
        const DOWN   = 0b00100000;
        const LEFT   = 0b01000000;
        const RIGHT  = 0b10000000;
    }
}

impl From<Button> for JoypadState {
    fn from(button: Button) -> Self {
        match button {
            Button::A => JoypadState::A,
            Button::B => JoypadState::B,
            Button::Select => JoypadState::SELECT,
            Button::Start => JoypadState::START,
            Button::Up => JoypadState::UP,
            Button::Down => JoypadState::DOWN,
            Button::Left => JoypadState::LEFT,
            Button::Right => JoypadState::RIGHT,
        }
    }
}

impl JoypadState {
    #[inline]
    pub fn press(&mut self, button: Button) {
        self.insert(button.into());
    }

    #[inline]
    pub fn release(&mut self, button: Button) {
        self.remove(button.into());
    }

    #[inline]
    pub fn is_pressed(&self, button: Button) -> bool {
        self.contains(button.into())
    }

    /// Low nibble of the direction keys, bit set when pressed (Right, Left, Up, Down).
    #[inline]
    pub fn direction_nibble(&self) -> u8 {
        (self.contains(JoypadState::RIGHT) as u8)
            | (self.contains(JoypadState::LEFT) as u8) << 1
            | (self.contains(JoypadState::UP) as u8) << 2
            | (self.contains(JoypadState::DOWN) as u8) << 3
    }

    /// Low nibble of the action keys, bit set when pressed (A, B, Select, Start).
    #[inline]
    pub fn action_nibble(&self) -> u8 {
        self.bits() & 0x0F
    }
}
