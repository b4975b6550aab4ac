use crate::nes::cartridge::CartridgeMemory;
use crate::SystemControl;

use super::Mapper;

/// Claims the whole CPU address space as flat RAM so instruction tests can place
/// code and data anywhere.
pub struct TestMapper {
    memory: Box<[u8; 0x10000]>,
}

impl SystemControl for TestMapper {
    fn reset(&mut self) {}
}

impl Mapper for TestMapper {
    fn cpu_read(&mut self, _mem: &CartridgeMemory, addr: u16) -> Option<u8> {
        Some(self.memory[addr as usize])
    }

    fn cpu_write(&mut self, _mem: &mut CartridgeMemory, addr: u16, byte: u8) -> bool {
        self.memory[addr as usize] = byte;
        true
    }

    fn chr_offset(&self, addr: u16) -> usize {
        addr as usize
    }
}

impl TestMapper {
    pub fn new() -> Self {
        Self {
            memory: Box::new([0; 0x10000]),
        }
    }
}
