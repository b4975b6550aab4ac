#[macro_use]
extern crate lazy_static;

#[macro_use]
extern crate bitflags;

mod config;
mod error;
mod joypad;

pub mod gb;
pub mod nes;

pub use config::EmulatorConfig;
pub use error::{EmulationError, LoadError, LoadState};
pub use joypad::{Button, JoypadState};

pub use gb::GameBoy;
pub use nes::Nes;

/// Receives one completed frame as packed BGR bytes, row-major.
pub type FrameCallback = Box<dyn FnMut(&[u8])>;

/// Invoked once before each instruction step; may block to throttle or pause a session.
pub type StepGate = Box<dyn FnMut()>;

pub trait SystemControl {
    fn reset(&mut self);
}
