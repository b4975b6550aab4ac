use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read image: {0}")]
    Io(#[from] io::Error),

    #[error("image does not carry a recognised header signature")]
    BadSignature,

    #[error("image is truncated: expected at least {expected} bytes, found {found}")]
    Truncated { expected: usize, found: usize },

    #[error("header field {field} holds invalid size code {code:#04X}")]
    InvalidSizeCode { field: &'static str, code: u8 },

    #[error("mapper {0} is not supported")]
    UnsupportedMapper(u8),

    #[error("cartridge type {0:#04X} is not supported")]
    UnsupportedCartridgeType(u8),

    #[error("save data is {found} bytes but the cartridge has {expected} bytes of RAM")]
    SaveRamSize { expected: usize, found: usize },

    #[error("cartridge has no battery-backed RAM")]
    NoSaveRam,

    #[error("invalid configuration: {0}")]
    Config(#[from] serde_json::Error),
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EmulationError {
    #[error("unimplemented opcode {}{opcode:02X} at {pc:#06X}", if *prefixed { "CB " } else { "" })]
    UnimplementedOpcode { opcode: u8, prefixed: bool, pc: u16 },

    #[error("instruction {mnemonic} has an operand combination it cannot execute")]
    InvalidOperand { mnemonic: &'static str },

    #[error("IO register {0:#06X} was registered twice")]
    DuplicateIoRegistration(u16),

    #[error("session has halted after a previous fault")]
    SessionHalted,

    #[error("no program image is loaded")]
    NotLoaded,
}

/// Outcome of the most recent attempt to load a program image into a console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadState {
    #[default]
    NotLoaded,
    Loaded,
    FailedToOpen,
    Invalid,
}

impl LoadState {
    pub fn from_error(err: &LoadError) -> Self {
        match err {
            LoadError::Io(_) => LoadState::FailedToOpen,
            _ => LoadState::Invalid,
        }
    }
}
