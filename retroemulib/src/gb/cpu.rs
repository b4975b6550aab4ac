mod alu;
mod instruction;
mod registers;

pub use registers::{Flags, Registers};

use crate::gb::bus::GbBus;
use crate::gb::interrupt::Interrupt;
use crate::EmulationError;

use self::alu::{AluResult, Shift};
use self::instruction::{Condition, Instruction, Mnemonic, Operand, CB_INSTRUCTIONS, INSTRUCTIONS, PREFIX_OPCODE};

const INTERRUPT_CYCLES: u32 = 20;
const IDLE_CYCLES: u32 = 4;

const HIGH_PAGE: u16 = 0xFF00;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub registers: Registers,
    pub ime: bool,
    pub halted: bool,
    pub stopped: bool,
    pub total_cycles: u64,
}

/// The Sharp LR35902 core. Each step executes one instruction, services one
/// interrupt or idles while halted, and reports the T-cycles it took.
pub struct CpuLr35902 {
    regs: Registers,

    ime: bool,
    // EI takes effect after the following instruction
    ei_pending: bool,
    halted: bool,
    stopped: bool,

    // address of the instruction being executed
    instr_addr: u16,
    total_cycles: u64,
}

impl CpuLr35902 {
    /// Power-on state, for running a boot ROM from 0x0000.
    pub fn new() -> Self {
        Self {
            regs: Registers::default(),

            ime: false,
            ei_pending: false,
            halted: false,
            stopped: false,

            instr_addr: 0,
            total_cycles: 0,
        }
    }

    /// State the DMG boot ROM hands over with, at the cartridge entry point 0x0100.
    pub fn post_boot() -> Self {
        Self {
            regs: Registers::post_boot(),
            ..CpuLr35902::new()
        }
    }

    pub fn step(&mut self, bus: &mut GbBus) -> Result<u32, EmulationError> {
        let cycles = self.next_step(bus)?;
        self.total_cycles += cycles as u64;
        Ok(cycles)
    }

    fn next_step(&mut self, bus: &mut GbBus) -> Result<u32, EmulationError> {
        if self.stopped {
            return Ok(IDLE_CYCLES);
        }

        let pending = bus.pending_interrupts();

        // a pending interrupt ends HALT even with IME clear
        if self.halted {
            if pending.is_empty() {
                return Ok(IDLE_CYCLES);
            }
            self.halted = false;
        }

        if self.ime {
            if let Some(interrupt) = pending.highest_priority() {
                self.service_interrupt(bus, interrupt);
                return Ok(INTERRUPT_CYCLES);
            }
        }

        self.execute_instruction(bus)
    }

    fn service_interrupt(&mut self, bus: &mut GbBus, interrupt: Interrupt) {
        tracing::debug!("{:?} interrupt taken at {:04X}", interrupt, self.regs.pc);

        self.ime = false;
        self.ei_pending = false;
        bus.interrupt_flag.remove(interrupt);

        self.push_word(bus, self.regs.pc);
        self.regs.pc = interrupt.vector();
    }

    #[inline]
    fn execute_instruction(&mut self, bus: &mut GbBus) -> Result<u32, EmulationError> {
        let pc = self.regs.pc;
        let opcode = bus.read(pc);

        let instruction = if opcode == PREFIX_OPCODE {
            let opcode = bus.read(pc.wrapping_add(1));
            CB_INSTRUCTIONS[opcode as usize]
                .ok_or(EmulationError::UnimplementedOpcode { opcode, prefixed: true, pc })?
        } else {
            INSTRUCTIONS[opcode as usize]
                .ok_or(EmulationError::UnimplementedOpcode { opcode, prefixed: false, pc })?
        };

        tracing::trace!("{:04X} {:?} {:?},{:?} AF:{:04X} BC:{:04X} DE:{:04X} HL:{:04X} SP:{:04X}",
            pc, instruction.mnemonic, instruction.dest, instruction.src,
            self.regs.af(), self.regs.bc(), self.regs.de(), self.regs.hl(), self.regs.sp);

        self.instr_addr = pc;
        self.regs.pc = pc.wrapping_add(instruction.size);

        let enable_interrupts = self.ei_pending;
        let cycles = instruction.execute(self, bus)?;

        // a DI in between cancels the pending EI
        if enable_interrupts && self.ei_pending {
            self.ime = true;
            self.ei_pending = false;
        }

        Ok(cycles)
    }

    /// A joypad press ends STOP.
    pub fn wake_from_stop(&mut self) {
        if self.stopped {
            tracing::debug!("woken from STOP");
            self.stopped = false;
        }
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            registers: self.regs,
            ime: self.ime,
            halted: self.halted,
            stopped: self.stopped,
            total_cycles: self.total_cycles,
        }
    }

    #[inline]
    pub fn registers(&self) -> &Registers {
        &self.regs
    }

    pub fn set_registers(&mut self, registers: Registers) {
        self.regs = registers;
    }

    pub fn set_ime(&mut self, ime: bool) {
        self.ime = ime;
        self.ei_pending = false;
    }

    #[inline]
    fn imm8(&self, bus: &GbBus) -> u8 {
        bus.read(self.instr_addr.wrapping_add(1))
    }

    #[inline]
    fn imm16(&self, bus: &GbBus) -> u16 {
        bus.read16(self.instr_addr.wrapping_add(1))
    }

    fn read8(&mut self, bus: &mut GbBus, operand: Operand, instr: &Instruction) -> Result<u8, EmulationError> {
        let byte = match operand {
            Operand::A => self.regs.a,
            Operand::B => self.regs.b,
            Operand::C => self.regs.c,
            Operand::D => self.regs.d,
            Operand::E => self.regs.e,
            Operand::H => self.regs.h,
            Operand::L => self.regs.l,
            Operand::D8 => self.imm8(bus),
            Operand::IndBC => bus.read(self.regs.bc()),
            Operand::IndDE => bus.read(self.regs.de()),
            Operand::IndHL => bus.read(self.regs.hl()),
            Operand::IndHLInc => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_add(1));
                bus.read(hl)
            }
            Operand::IndHLDec => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_sub(1));
                bus.read(hl)
            }
            Operand::HighA8 => bus.read(HIGH_PAGE | self.imm8(bus) as u16),
            Operand::HighC => bus.read(HIGH_PAGE | self.regs.c as u16),
            Operand::A16 => bus.read(self.imm16(bus)),
            _ => return Err(invalid_operand(instr)),
        };
        Ok(byte)
    }

    fn write8(&mut self, bus: &mut GbBus, operand: Operand, byte: u8, instr: &Instruction) -> Result<(), EmulationError> {
        match operand {
            Operand::A => self.regs.a = byte,
            Operand::B => self.regs.b = byte,
            Operand::C => self.regs.c = byte,
            Operand::D => self.regs.d = byte,
            Operand::E => self.regs.e = byte,
            Operand::H => self.regs.h = byte,
            Operand::L => self.regs.l = byte,
            Operand::IndBC => bus.write(self.regs.bc(), byte),
            Operand::IndDE => bus.write(self.regs.de(), byte),
            Operand::IndHL => bus.write(self.regs.hl(), byte),
            Operand::IndHLInc => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_add(1));
                bus.write(hl, byte);
            }
            Operand::IndHLDec => {
                let hl = self.regs.hl();
                self.regs.set_hl(hl.wrapping_sub(1));
                bus.write(hl, byte);
            }
            Operand::HighA8 => bus.write(HIGH_PAGE | self.imm8(bus) as u16, byte),
            Operand::HighC => bus.write(HIGH_PAGE | self.regs.c as u16, byte),
            Operand::A16 => bus.write(self.imm16(bus), byte),
            _ => return Err(invalid_operand(instr)),
        }
        Ok(())
    }

    fn read16(&self, bus: &GbBus, operand: Operand, instr: &Instruction) -> Result<u16, EmulationError> {
        let word = match operand {
            Operand::AF => self.regs.af(),
            Operand::BC => self.regs.bc(),
            Operand::DE => self.regs.de(),
            Operand::HL => self.regs.hl(),
            Operand::SP => self.regs.sp,
            Operand::D16 => self.imm16(bus),
            _ => return Err(invalid_operand(instr)),
        };
        Ok(word)
    }

    fn write16(&mut self, bus: &mut GbBus, operand: Operand, word: u16, instr: &Instruction) -> Result<(), EmulationError> {
        match operand {
            Operand::AF => self.regs.set_af(word),
            Operand::BC => self.regs.set_bc(word),
            Operand::DE => self.regs.set_de(word),
            Operand::HL => self.regs.set_hl(word),
            Operand::SP => self.regs.sp = word,
            // LD (a16),SP stores both bytes, low first
            Operand::A16 => bus.write16(self.imm16(bus), word),
            _ => return Err(invalid_operand(instr)),
        }
        Ok(())
    }

    #[inline]
    fn condition_met(&self, condition: Condition) -> bool {
        match condition {
            Condition::Always => true,
            Condition::NZ => !self.regs.flags.zero,
            Condition::Z => self.regs.flags.zero,
            Condition::NC => !self.regs.flags.carry,
            Condition::C => self.regs.flags.carry,
        }
    }

    #[inline]
    fn push_word(&mut self, bus: &mut GbBus, word: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(2);
        bus.write16(self.regs.sp, word);
    }

    #[inline]
    fn pop_word(&mut self, bus: &mut GbBus) -> u16 {
        let word = bus.read16(self.regs.sp);
        self.regs.sp = self.regs.sp.wrapping_add(2);
        word
    }

    #[inline]
    fn accumulate(&mut self, result: AluResult) {
        self.regs.a = result.value;
        self.regs.flags = result.flags;
    }

    pub(super) fn no_operation(&mut self, _bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        Ok(0)
    }

    pub(super) fn load(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        if instr.src == Operand::SpOffset {
            let (value, flags) = alu::add_sp_offset(self.regs.sp, self.imm8(bus) as i8);
            self.regs.set_hl(value);
            self.regs.flags = flags;
        } else if instr.src.is_wide() {
            let word = self.read16(bus, instr.src, instr)?;
            self.write16(bus, instr.dest, word, instr)?;
        } else {
            let byte = self.read8(bus, instr.src, instr)?;
            self.write8(bus, instr.dest, byte, instr)?;
        }
        Ok(0)
    }

    pub(super) fn increment(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        if instr.dest.is_wide() {
            let word = self.read16(bus, instr.dest, instr)?;
            self.write16(bus, instr.dest, word.wrapping_add(1), instr)?;
        } else {
            let byte = self.read8(bus, instr.dest, instr)?;
            let result = alu::inc8(byte, self.regs.flags);
            self.write8(bus, instr.dest, result.value, instr)?;
            self.regs.flags = result.flags;
        }
        Ok(0)
    }

    pub(super) fn decrement(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        if instr.dest.is_wide() {
            let word = self.read16(bus, instr.dest, instr)?;
            self.write16(bus, instr.dest, word.wrapping_sub(1), instr)?;
        } else {
            let byte = self.read8(bus, instr.dest, instr)?;
            let result = alu::dec8(byte, self.regs.flags);
            self.write8(bus, instr.dest, result.value, instr)?;
            self.regs.flags = result.flags;
        }
        Ok(0)
    }

    pub(super) fn add(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        match instr.dest {
            Operand::HL => {
                let operand = self.read16(bus, instr.src, instr)?;
                let (value, flags) = alu::add16(self.regs.hl(), operand, self.regs.flags);
                self.regs.set_hl(value);
                self.regs.flags = flags;
            }
            Operand::SP => {
                let (value, flags) = alu::add_sp_offset(self.regs.sp, self.imm8(bus) as i8);
                self.regs.sp = value;
                self.regs.flags = flags;
            }
            Operand::A => {
                let operand = self.read8(bus, instr.src, instr)?;
                self.accumulate(alu::add8(self.regs.a, operand, false));
            }
            _ => return Err(invalid_operand(instr)),
        }
        Ok(0)
    }

    pub(super) fn add_with_carry(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let operand = self.read8(bus, instr.src, instr)?;
        self.accumulate(alu::add8(self.regs.a, operand, self.regs.flags.carry));
        Ok(0)
    }

    pub(super) fn subtract(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let operand = self.read8(bus, instr.src, instr)?;
        self.accumulate(alu::sub8(self.regs.a, operand, false));
        Ok(0)
    }

    pub(super) fn subtract_with_carry(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let operand = self.read8(bus, instr.src, instr)?;
        self.accumulate(alu::sub8(self.regs.a, operand, self.regs.flags.carry));
        Ok(0)
    }

    pub(super) fn and_accumulator(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let operand = self.read8(bus, instr.src, instr)?;
        self.accumulate(alu::and8(self.regs.a, operand));
        Ok(0)
    }

    pub(super) fn xor_accumulator(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let operand = self.read8(bus, instr.src, instr)?;
        self.accumulate(alu::xor8(self.regs.a, operand));
        Ok(0)
    }

    pub(super) fn or_accumulator(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let operand = self.read8(bus, instr.src, instr)?;
        self.accumulate(alu::or8(self.regs.a, operand));
        Ok(0)
    }

    pub(super) fn compare(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let operand = self.read8(bus, instr.src, instr)?;
        self.regs.flags = alu::sub8(self.regs.a, operand, false).flags;
        Ok(0)
    }

    pub(super) fn rotate_accumulator(&mut self, _bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let op = match instr.mnemonic {
            Mnemonic::RLCA => Shift::Rlc,
            Mnemonic::RRCA => Shift::Rrc,
            Mnemonic::RLA => Shift::Rl,
            Mnemonic::RRA => Shift::Rr,
            _ => return Err(invalid_operand(instr)),
        };

        let mut result = alu::shift(op, self.regs.a, self.regs.flags.carry);
        // the accumulator forms always clear Z
        result.flags.zero = false;
        self.accumulate(result);
        Ok(0)
    }

    pub(super) fn decimal_adjust(&mut self, _bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        self.accumulate(alu::daa(self.regs.a, self.regs.flags));
        Ok(0)
    }

    pub(super) fn complement_accumulator(&mut self, _bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        self.regs.a = !self.regs.a;
        self.regs.flags.subtract = true;
        self.regs.flags.half_carry = true;
        Ok(0)
    }

    pub(super) fn set_carry_flag(&mut self, _bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        self.regs.flags.subtract = false;
        self.regs.flags.half_carry = false;
        self.regs.flags.carry = true;
        Ok(0)
    }

    pub(super) fn complement_carry_flag(&mut self, _bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        self.regs.flags.subtract = false;
        self.regs.flags.half_carry = false;
        self.regs.flags.carry = !self.regs.flags.carry;
        Ok(0)
    }

    pub(super) fn jump_relative(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let offset = self.imm8(bus) as i8;
        if !self.condition_met(instr.condition) {
            return Ok(0);
        }

        self.regs.pc = self.regs.pc.wrapping_add_signed(offset as i16);
        Ok(instr.branch_cycles)
    }

    pub(super) fn jump(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let target = self.read16(bus, instr.src, instr)?;
        if !self.condition_met(instr.condition) {
            return Ok(0);
        }

        self.regs.pc = target;
        Ok(instr.branch_cycles)
    }

    pub(super) fn call(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let target = self.read16(bus, instr.src, instr)?;
        if !self.condition_met(instr.condition) {
            return Ok(0);
        }

        self.push_word(bus, self.regs.pc);
        self.regs.pc = target;
        Ok(instr.branch_cycles)
    }

    pub(super) fn return_from_subroutine(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        if !self.condition_met(instr.condition) {
            return Ok(0);
        }

        self.regs.pc = self.pop_word(bus);
        Ok(instr.branch_cycles)
    }

    pub(super) fn return_from_interrupt(&mut self, bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        self.regs.pc = self.pop_word(bus);
        self.ime = true;
        self.ei_pending = false;
        Ok(0)
    }

    pub(super) fn restart(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let Operand::Vector(vector) = instr.src else {
            return Err(invalid_operand(instr));
        };

        self.push_word(bus, self.regs.pc);
        self.regs.pc = vector as u16;
        Ok(0)
    }

    pub(super) fn push_register(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let word = self.read16(bus, instr.src, instr)?;
        self.push_word(bus, word);
        Ok(0)
    }

    pub(super) fn pop_register(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let word = self.pop_word(bus);
        // POP AF drops the low nibble of F
        self.write16(bus, instr.dest, word, instr)?;
        Ok(0)
    }

    pub(super) fn halt(&mut self, _bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        self.halted = true;
        Ok(0)
    }

    pub(super) fn stop(&mut self, bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        tracing::debug!("STOP at {:04X}", self.instr_addr);
        self.stopped = true;
        bus.timer.write_div(&mut bus.interrupt_flag);
        Ok(0)
    }

    pub(super) fn disable_interrupts(&mut self, _bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        self.ime = false;
        self.ei_pending = false;
        Ok(0)
    }

    pub(super) fn enable_interrupts(&mut self, _bus: &mut GbBus, _instr: &Instruction) -> Result<u32, EmulationError> {
        self.ei_pending = true;
        Ok(0)
    }

    pub(super) fn shift_operand(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let op = match instr.mnemonic {
            Mnemonic::RLC => Shift::Rlc,
            Mnemonic::RRC => Shift::Rrc,
            Mnemonic::RL => Shift::Rl,
            Mnemonic::RR => Shift::Rr,
            Mnemonic::SLA => Shift::Sla,
            Mnemonic::SRA => Shift::Sra,
            Mnemonic::SWAP => Shift::Swap,
            Mnemonic::SRL => Shift::Srl,
            _ => return Err(invalid_operand(instr)),
        };

        let byte = self.read8(bus, instr.dest, instr)?;
        let result = alu::shift(op, byte, self.regs.flags.carry);
        self.write8(bus, instr.dest, result.value, instr)?;
        self.regs.flags = result.flags;
        Ok(0)
    }

    pub(super) fn test_bit(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let Operand::Bit(bit) = instr.src else {
            return Err(invalid_operand(instr));
        };

        let byte = self.read8(bus, instr.dest, instr)?;
        self.regs.flags.zero = byte & (1 << bit) == 0;
        self.regs.flags.subtract = false;
        self.regs.flags.half_carry = true;
        Ok(0)
    }

    pub(super) fn reset_bit(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let Operand::Bit(bit) = instr.src else {
            return Err(invalid_operand(instr));
        };

        let byte = self.read8(bus, instr.dest, instr)?;
        self.write8(bus, instr.dest, byte & !(1 << bit), instr)?;
        Ok(0)
    }

    pub(super) fn set_bit(&mut self, bus: &mut GbBus, instr: &Instruction) -> Result<u32, EmulationError> {
        let Operand::Bit(bit) = instr.src else {
            return Err(invalid_operand(instr));
        };

        let byte = self.read8(bus, instr.dest, instr)?;
        self.write8(bus, instr.dest, byte | (1 << bit), instr)?;
        Ok(0)
    }
}

#[inline]
fn invalid_operand(instr: &Instruction) -> EmulationError {
    EmulationError::InvalidOperand { mnemonic: instr.mnemonic.as_str() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gb::bus::{IE_REG, IF_REG};

    const PROGRAM_START: u16 = 0xC000;

    fn setup(program: &[u8]) -> (CpuLr35902, GbBus) {
        let mut bus = GbBus::test_new();
        for (offset, &byte) in program.iter().enumerate() {
            bus.write(PROGRAM_START + offset as u16, byte);
        }
        bus.write(IF_REG, 0x00);

        let mut cpu = CpuLr35902::post_boot();
        cpu.regs.pc = PROGRAM_START;
        (cpu, bus)
    }

    fn run(cpu: &mut CpuLr35902, bus: &mut GbBus, steps: usize) -> Vec<u32> {
        (0..steps).map(|_| cpu.step(bus).unwrap()).collect()
    }

    #[test]
    fn test_post_boot_registers() {
        let cpu = CpuLr35902::post_boot();
        assert_eq!(cpu.regs.af(), 0x01B0);
        assert_eq!(cpu.regs.sp, 0xFFFE);
        assert_eq!(cpu.regs.pc, 0x0100);
    }

    #[test]
    fn test_load_and_add() {
        // LD A,0x42; LD B,A; ADD A,B
        let (mut cpu, mut bus) = setup(&[0x3E, 0x42, 0x47, 0x80]);
        assert_eq!(run(&mut cpu, &mut bus, 3), vec![8, 4, 4]);
        assert_eq!(cpu.regs.a, 0x84);
        assert_eq!(cpu.regs.b, 0x42);
        assert_eq!(cpu.regs.flags, Flags { zero: false, subtract: false, half_carry: false, carry: false });
        assert_eq!(cpu.regs.pc, 0xC004);
        assert_eq!(cpu.snapshot().total_cycles, 16);
    }

    #[test]
    fn test_unimplemented_opcode_is_fatal() {
        let (mut cpu, mut bus) = setup(&[0x00, 0xD3]);
        cpu.step(&mut bus).unwrap();
        assert_eq!(
            cpu.step(&mut bus),
            Err(EmulationError::UnimplementedOpcode { opcode: 0xD3, prefixed: false, pc: 0xC001 })
        );
    }

    #[test]
    fn test_interrupt_priority_and_service() {
        let (mut cpu, mut bus) = setup(&[0x00]);
        cpu.set_ime(true);
        bus.write(IE_REG, 0x1F);
        bus.write(IF_REG, 0x05);

        assert_eq!(cpu.step(&mut bus).unwrap(), 20);
        assert_eq!(cpu.regs.pc, 0x0040);
        assert_eq!(cpu.regs.sp, 0xFFFC);
        assert_eq!(bus.read16(0xFFFC), PROGRAM_START);
        assert_eq!(bus.interrupt_flag, Interrupt::TIMER);
        assert!(!cpu.ime);
    }

    #[test]
    fn test_masked_interrupt_is_ignored() {
        let (mut cpu, mut bus) = setup(&[0x00]);
        cpu.set_ime(true);
        bus.write(IE_REG, 0x01);
        bus.write(IF_REG, 0x04);

        assert_eq!(cpu.step(&mut bus).unwrap(), 4);
        assert_eq!(cpu.regs.pc, 0xC001);
    }

    #[test]
    fn test_ei_takes_effect_after_next_instruction() {
        // EI; NOP; NOP
        let (mut cpu, mut bus) = setup(&[0xFB, 0x00, 0x00]);
        bus.write(IE_REG, 0x01);
        bus.write(IF_REG, 0x01);

        cpu.step(&mut bus).unwrap();
        assert!(!cpu.ime);
        cpu.step(&mut bus).unwrap();
        assert!(cpu.ime);
        assert_eq!(cpu.regs.pc, 0xC002);

        assert_eq!(cpu.step(&mut bus).unwrap(), 20);
        assert_eq!(cpu.regs.pc, 0x0040);
    }

    #[test]
    fn test_di_cancels_pending_ei() {
        // EI; DI; NOP
        let (mut cpu, mut bus) = setup(&[0xFB, 0xF3, 0x00]);
        run(&mut cpu, &mut bus, 3);
        assert!(!cpu.ime);
    }

    #[test]
    fn test_halt_wakes_without_ime() {
        // HALT; INC A
        let (mut cpu, mut bus) = setup(&[0x76, 0x3C]);
        cpu.regs.a = 0;
        assert_eq!(run(&mut cpu, &mut bus, 3), vec![4, 4, 4]);
        assert!(cpu.halted);
        assert_eq!(cpu.regs.pc, 0xC001);

        bus.write(IE_REG, 0x04);
        bus.interrupt_flag.insert(Interrupt::TIMER);
        cpu.step(&mut bus).unwrap();
        assert!(!cpu.halted);
        assert_eq!(cpu.regs.a, 1);
        assert!(bus.interrupt_flag.contains(Interrupt::TIMER));
    }

    #[test]
    fn test_stop_waits_for_joypad() {
        // STOP 0; INC A
        let (mut cpu, mut bus) = setup(&[0x10, 0x00, 0x3C]);
        cpu.regs.a = 0;
        run(&mut cpu, &mut bus, 3);
        assert!(cpu.stopped);
        assert_eq!(cpu.regs.a, 0);

        cpu.wake_from_stop();
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 1);
    }

    #[test]
    fn test_conditional_jump_cycles() {
        // XOR A; JR NZ,+2; JR Z,+2; NOP; NOP; INC A
        let (mut cpu, mut bus) = setup(&[0xAF, 0x20, 0x02, 0x28, 0x02, 0x00, 0x00, 0x3C]);
        assert_eq!(run(&mut cpu, &mut bus, 3), vec![4, 8, 12]);
        assert_eq!(cpu.regs.pc, 0xC007);
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 1);
    }

    #[test]
    fn test_jr_backwards() {
        // NOP; JR -3
        let (mut cpu, mut bus) = setup(&[0x00, 0x18, 0xFD]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.regs.pc, 0xC000);
    }

    #[test]
    fn test_call_and_return() {
        let mut program = vec![0xCD, 0x10, 0xC0];
        program.resize(0x10, 0x00);
        program.push(0xC9);
        let (mut cpu, mut bus) = setup(&program);

        assert_eq!(cpu.step(&mut bus).unwrap(), 24);
        assert_eq!(cpu.regs.pc, 0xC010);
        assert_eq!(cpu.regs.sp, 0xFFFC);

        assert_eq!(cpu.step(&mut bus).unwrap(), 16);
        assert_eq!(cpu.regs.pc, 0xC003);
        assert_eq!(cpu.regs.sp, 0xFFFE);
    }

    #[test]
    fn test_conditional_return_cycles() {
        // XOR A; RET NZ; RET Z
        let (mut cpu, mut bus) = setup(&[0xAF, 0xC0, 0xC8]);
        cpu.regs.sp = 0xDFF0;
        bus.write16(0xDFF0, 0x1234);
        assert_eq!(run(&mut cpu, &mut bus, 3), vec![4, 8, 20]);
        assert_eq!(cpu.regs.pc, 0x1234);
    }

    #[test]
    fn test_rst_pushes_return_address() {
        let (mut cpu, mut bus) = setup(&[0xEF]);
        assert_eq!(cpu.step(&mut bus).unwrap(), 16);
        assert_eq!(cpu.regs.pc, 0x0028);
        assert_eq!(bus.read16(cpu.regs.sp), 0xC001);
    }

    #[test]
    fn test_pop_af_masks_low_nibble() {
        // LD BC,0x12FF; PUSH BC; POP AF
        let (mut cpu, mut bus) = setup(&[0x01, 0xFF, 0x12, 0xC5, 0xF1]);
        assert_eq!(run(&mut cpu, &mut bus, 3), vec![12, 16, 12]);
        assert_eq!(cpu.regs.a, 0x12);
        assert_eq!(cpu.regs.f(), 0xF0);
    }

    #[test]
    fn test_store_sp_writes_both_bytes() {
        // LD (0xC100),SP
        let (mut cpu, mut bus) = setup(&[0x08, 0x00, 0xC1]);
        cpu.regs.sp = 0xFFF8;
        assert_eq!(cpu.step(&mut bus).unwrap(), 20);
        assert_eq!(bus.read(0xC100), 0xF8);
        assert_eq!(bus.read(0xC101), 0xFF);
    }

    #[test]
    fn test_hl_increment_and_decrement_loads() {
        // LD HL,0xC100; LD (HL+),A; LD (HL-),A; LD A,(HL-)
        let (mut cpu, mut bus) = setup(&[0x21, 0x00, 0xC1, 0x22, 0x32, 0x3A]);
        cpu.regs.a = 0x5A;
        run(&mut cpu, &mut bus, 3);
        assert_eq!(bus.read(0xC100), 0x5A);
        assert_eq!(bus.read(0xC101), 0x5A);
        assert_eq!(cpu.regs.hl(), 0xC100);

        bus.write(0xC100, 0x77);
        cpu.step(&mut bus).unwrap();
        assert_eq!(cpu.regs.a, 0x77);
        assert_eq!(cpu.regs.hl(), 0xC0FF);
    }

    #[test]
    fn test_high_page_loads() {
        // LDH (0x80),A; LD C,0x81; LD (C),A; LDH A,(0x80)
        let (mut cpu, mut bus) = setup(&[0xE0, 0x80, 0x0E, 0x81, 0xE2, 0xF0, 0x80]);
        cpu.regs.a = 0x99;
        assert_eq!(run(&mut cpu, &mut bus, 4), vec![12, 8, 8, 12]);
        assert_eq!(bus.read(0xFF80), 0x99);
        assert_eq!(bus.read(0xFF81), 0x99);
    }

    #[test]
    fn test_daa_after_bcd_add() {
        // LD A,0x15; ADD A,0x27; DAA
        let (mut cpu, mut bus) = setup(&[0x3E, 0x15, 0xC6, 0x27, 0x27]);
        run(&mut cpu, &mut bus, 3);
        assert_eq!(cpu.regs.a, 0x42);
        assert!(!cpu.regs.flags.carry);
    }

    #[test]
    fn test_add_sp_and_ld_hl_sp_offset() {
        // ADD SP,-1; LD HL,SP+2
        let (mut cpu, mut bus) = setup(&[0xE8, 0xFF, 0xF8, 0x02]);
        cpu.regs.sp = 0xD000;
        assert_eq!(run(&mut cpu, &mut bus, 2), vec![16, 12]);
        assert_eq!(cpu.regs.sp, 0xCFFF);
        assert_eq!(cpu.regs.hl(), 0xD001);
        assert!(!cpu.regs.flags.zero);
    }

    #[test]
    fn test_accumulator_rotate_clears_zero() {
        // XOR A; RLA
        let (mut cpu, mut bus) = setup(&[0xAF, 0x17]);
        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.regs.a, 0);
        assert!(!cpu.regs.flags.zero);
    }

    #[test]
    fn test_prefixed_rotate_and_bit() {
        // LD A,0x80; RLC A; BIT 7,A; SET 7,A; RES 0,A
        let (mut cpu, mut bus) = setup(&[0x3E, 0x80, 0xCB, 0x07, 0xCB, 0x7F, 0xCB, 0xFF, 0xCB, 0x87]);
        assert_eq!(run(&mut cpu, &mut bus, 2), vec![8, 8]);
        assert_eq!(cpu.regs.a, 0x01);
        assert!(cpu.regs.flags.carry);

        cpu.step(&mut bus).unwrap();
        assert!(cpu.regs.flags.zero);
        assert!(cpu.regs.flags.half_carry);
        assert!(cpu.regs.flags.carry);

        run(&mut cpu, &mut bus, 2);
        assert_eq!(cpu.regs.a, 0x80);
        assert_eq!(cpu.regs.pc, 0xC00A);
    }

    #[test]
    fn test_prefixed_memory_operand_cycles() {
        // LD HL,0xC100; SWAP (HL); BIT 0,(HL)
        let (mut cpu, mut bus) = setup(&[0x21, 0x00, 0xC1, 0xCB, 0x36, 0xCB, 0x46]);
        bus.write(0xC100, 0x1F);
        assert_eq!(run(&mut cpu, &mut bus, 3), vec![12, 16, 12]);
        assert_eq!(bus.read(0xC100), 0xF1);
        assert!(!cpu.regs.flags.zero);
    }

    #[test]
    fn test_inc_memory_keeps_carry() {
        // SCF; LD HL,0xC100; INC (HL)
        let (mut cpu, mut bus) = setup(&[0x37, 0x21, 0x00, 0xC1, 0x34]);
        bus.write(0xC100, 0x0F);
        assert_eq!(run(&mut cpu, &mut bus, 3), vec![4, 12, 12]);
        assert_eq!(bus.read(0xC100), 0x10);
        assert!(cpu.regs.flags.half_carry);
        assert!(cpu.regs.flags.carry);
    }
}
