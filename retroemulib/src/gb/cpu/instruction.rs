use crate::gb::bus::GbBus;
use crate::EmulationError;

use super::CpuLr35902;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mnemonic {
    NOP, LD, LDH, INC, DEC, ADD, ADC, SUB, SBC, AND, XOR, OR, CP,
    RLCA, RRCA, RLA, RRA, DAA, CPL, SCF, CCF,
    JR, JP, CALL, RET, RETI, RST, PUSH, POP,
    HALT, STOP, DI, EI,

    // 0xCB page
    RLC, RRC, RL, RR, SLA, SRA, SWAP, SRL, BIT, RES, SET,
}

impl Mnemonic {
    pub const fn as_str(self) -> &'static str {
        match self {
            Mnemonic::NOP => "NOP", Mnemonic::LD => "LD", Mnemonic::LDH => "LDH",
            Mnemonic::INC => "INC", Mnemonic::DEC => "DEC", Mnemonic::ADD => "ADD",
            Mnemonic::ADC => "ADC", Mnemonic::SUB => "SUB", Mnemonic::SBC => "SBC",
            Mnemonic::AND => "AND", Mnemonic::XOR => "XOR", Mnemonic::OR => "OR",
            Mnemonic::CP => "CP", Mnemonic::RLCA => "RLCA", Mnemonic::RRCA => "RRCA",
            Mnemonic::RLA => "RLA", Mnemonic::RRA => "RRA", Mnemonic::DAA => "DAA",
            Mnemonic::CPL => "CPL", Mnemonic::SCF => "SCF", Mnemonic::CCF => "CCF",
            Mnemonic::JR => "JR", Mnemonic::JP => "JP", Mnemonic::CALL => "CALL",
            Mnemonic::RET => "RET", Mnemonic::RETI => "RETI", Mnemonic::RST => "RST",
            Mnemonic::PUSH => "PUSH", Mnemonic::POP => "POP", Mnemonic::HALT => "HALT",
            Mnemonic::STOP => "STOP", Mnemonic::DI => "DI", Mnemonic::EI => "EI",
            Mnemonic::RLC => "RLC", Mnemonic::RRC => "RRC", Mnemonic::RL => "RL",
            Mnemonic::RR => "RR", Mnemonic::SLA => "SLA", Mnemonic::SRA => "SRA",
            Mnemonic::SWAP => "SWAP", Mnemonic::SRL => "SRL", Mnemonic::BIT => "BIT",
            Mnemonic::RES => "RES", Mnemonic::SET => "SET",
        }
    }
}

/// Where an instruction reads its source or writes its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operand {
    None,
    A, B, C, D, E, H, L,
    AF, BC, DE, HL, SP,

    /// Immediate byte
    D8,
    /// Immediate little-endian word
    D16,
    /// Signed immediate byte
    R8,
    /// Memory at an immediate address
    A16,

    IndBC, IndDE, IndHL,
    /// (HL), then HL is incremented
    IndHLInc,
    /// (HL), then HL is decremented
    IndHLDec,
    /// 0xFF00 + immediate byte
    HighA8,
    /// 0xFF00 + C
    HighC,
    /// SP + signed immediate byte
    SpOffset,

    /// RST target
    Vector(u8),
    /// Bit index of BIT/RES/SET
    Bit(u8),
}

impl Operand {
    /// Immediate bytes following the opcode.
    pub const fn immediate_bytes(self) -> u16 {
        match self {
            Operand::D8 | Operand::R8 | Operand::HighA8 | Operand::SpOffset => 1,
            Operand::D16 | Operand::A16 => 2,
            _ => 0,
        }
    }

    /// Operands that carry a 16-bit value.
    pub const fn is_wide(self) -> bool {
        matches!(self, Operand::AF | Operand::BC | Operand::DE | Operand::HL | Operand::SP | Operand::D16)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    Always,
    NZ,
    Z,
    NC,
    C,
}

type ExecFn = fn(&mut CpuLr35902, &mut GbBus, &Instruction) -> Result<u32, EmulationError>;

pub struct Instruction {
    pub opcode: u8,
    pub prefixed: bool,
    pub mnemonic: Mnemonic,
    pub dest: Operand,
    pub src: Operand,
    pub condition: Condition,
    pub size: u16,
    /// T-cycles when not branching
    pub cycles: u32,
    /// Extra T-cycles when a conditional branch is taken
    pub branch_cycles: u32,
    exec_fn: ExecFn,
}

impl Instruction {
    /// Runs the instruction. The program counter must already point past its bytes.
    pub fn execute(&self, cpu: &mut CpuLr35902, bus: &mut GbBus) -> Result<u32, EmulationError> {
        let extra_cycles = (self.exec_fn)(cpu, bus, self)?;
        Ok(self.cycles + extra_cycles)
    }

    fn new(opcode: u8, prefixed: bool, mnemonic: Mnemonic, dest: Operand, src: Operand,
        condition: Condition, cycles: u32, branch_cycles: u32) -> Self
    {
        let exec_fn: ExecFn = match mnemonic {
            Mnemonic::NOP => CpuLr35902::no_operation,
            Mnemonic::LD | Mnemonic::LDH => CpuLr35902::load,
            Mnemonic::INC => CpuLr35902::increment,
            Mnemonic::DEC => CpuLr35902::decrement,
            Mnemonic::ADD => CpuLr35902::add,
            Mnemonic::ADC => CpuLr35902::add_with_carry,
            Mnemonic::SUB => CpuLr35902::subtract,
            Mnemonic::SBC => CpuLr35902::subtract_with_carry,
            Mnemonic::AND => CpuLr35902::and_accumulator,
            Mnemonic::XOR => CpuLr35902::xor_accumulator,
            Mnemonic::OR => CpuLr35902::or_accumulator,
            Mnemonic::CP => CpuLr35902::compare,
            Mnemonic::RLCA | Mnemonic::RRCA | Mnemonic::RLA | Mnemonic::RRA => CpuLr35902::rotate_accumulator,
            Mnemonic::DAA => CpuLr35902::decimal_adjust,
            Mnemonic::CPL => CpuLr35902::complement_accumulator,
            Mnemonic::SCF => CpuLr35902::set_carry_flag,
            Mnemonic::CCF => CpuLr35902::complement_carry_flag,
            Mnemonic::JR => CpuLr35902::jump_relative,
            Mnemonic::JP => CpuLr35902::jump,
            Mnemonic::CALL => CpuLr35902::call,
            Mnemonic::RET => CpuLr35902::return_from_subroutine,
            Mnemonic::RETI => CpuLr35902::return_from_interrupt,
            Mnemonic::RST => CpuLr35902::restart,
            Mnemonic::PUSH => CpuLr35902::push_register,
            Mnemonic::POP => CpuLr35902::pop_register,
            Mnemonic::HALT => CpuLr35902::halt,
            Mnemonic::STOP => CpuLr35902::stop,
            Mnemonic::DI => CpuLr35902::disable_interrupts,
            Mnemonic::EI => CpuLr35902::enable_interrupts,
            Mnemonic::RLC | Mnemonic::RRC | Mnemonic::RL | Mnemonic::RR
            | Mnemonic::SLA | Mnemonic::SRA | Mnemonic::SWAP | Mnemonic::SRL => CpuLr35902::shift_operand,
            Mnemonic::BIT => CpuLr35902::test_bit,
            Mnemonic::RES => CpuLr35902::reset_bit,
            Mnemonic::SET => CpuLr35902::set_bit,
        };

        let size = match (prefixed, mnemonic) {
            (true, _) => 2,
            // STOP is followed by a padding byte
            (false, Mnemonic::STOP) => 2,
            _ => 1 + dest.immediate_bytes() + src.immediate_bytes(),
        };

        Self {
            opcode,
            prefixed,
            mnemonic,
            dest,
            src,
            condition,
            size,
            cycles,
            branch_cycles,
            exec_fn,
        }
    }
}

fn op(opcode: u8, mnemonic: Mnemonic, dest: Operand, src: Operand, cycles: u32) -> Instruction {
    Instruction::new(opcode, false, mnemonic, dest, src, Condition::Always, cycles, 0)
}

fn branch(opcode: u8, mnemonic: Mnemonic, condition: Condition, src: Operand, cycles: u32, taken: u32) -> Instruction {
    Instruction::new(opcode, false, mnemonic, Operand::None, src, condition, cycles, taken)
}

/// Register operand encoded in the low three bits of an opcode (or bits 3-5).
const fn register_operand(index: u8) -> Operand {
    match index & 0x07 {
        0 => Operand::B,
        1 => Operand::C,
        2 => Operand::D,
        3 => Operand::E,
        4 => Operand::H,
        5 => Operand::L,
        6 => Operand::IndHL,
        _ => Operand::A,
    }
}

/// LD r,r' and the accumulator ALU block (0x40-0xBF).
fn register_block() -> Vec<Instruction> {
    let mut instructions = Vec::with_capacity(0x80);

    for opcode in 0x40..=0x7Fu8 {
        // LD (HL),(HL) is HALT
        if opcode == 0x76 {
            continue;
        }
        let dest = register_operand(opcode >> 3);
        let src = register_operand(opcode);
        let cycles = if dest == Operand::IndHL || src == Operand::IndHL { 8 } else { 4 };
        instructions.push(op(opcode, Mnemonic::LD, dest, src, cycles));
    }

    for opcode in 0x80..=0xBFu8 {
        let mnemonic = alu_mnemonic(opcode >> 3);
        let src = register_operand(opcode);
        let cycles = if src == Operand::IndHL { 8 } else { 4 };
        instructions.push(op(opcode, mnemonic, Operand::A, src, cycles));
    }

    instructions
}

const fn alu_mnemonic(index: u8) -> Mnemonic {
    match index & 0x07 {
        0 => Mnemonic::ADD,
        1 => Mnemonic::ADC,
        2 => Mnemonic::SUB,
        3 => Mnemonic::SBC,
        4 => Mnemonic::AND,
        5 => Mnemonic::XOR,
        6 => Mnemonic::OR,
        _ => Mnemonic::CP,
    }
}

fn prefixed_instruction(opcode: u8) -> Instruction {
    let target = register_operand(opcode);
    let bit = (opcode >> 3) & 0x07;
    let indirect = target == Operand::IndHL;

    let (mnemonic, src) = match opcode >> 6 {
        0 => {
            let mnemonic = match bit {
                0 => Mnemonic::RLC,
                1 => Mnemonic::RRC,
                2 => Mnemonic::RL,
                3 => Mnemonic::RR,
                4 => Mnemonic::SLA,
                5 => Mnemonic::SRA,
                6 => Mnemonic::SWAP,
                _ => Mnemonic::SRL,
            };
            (mnemonic, Operand::None)
        }
        1 => (Mnemonic::BIT, Operand::Bit(bit)),
        2 => (Mnemonic::RES, Operand::Bit(bit)),
        _ => (Mnemonic::SET, Operand::Bit(bit)),
    };

    // BIT only reads (HL); the others read and write it back
    let cycles = match (mnemonic, indirect) {
        (_, false) => 8,
        (Mnemonic::BIT, true) => 12,
        (_, true) => 16,
    };

    Instruction::new(opcode, true, mnemonic, target, src, Condition::Always, cycles, 0)
}

lazy_static! {
    static ref INSTRUCTION_LIST: Vec<Instruction> = {
        use Condition::*;
        use Mnemonic::*;
        use Operand::{A as RegA, B as RegB, C as RegC, D as RegD, E as RegE, H as RegH, L as RegL};
        use Operand::{AF, BC, DE, HL, SP, D8, D16, R8, A16, IndBC, IndDE, IndHL, IndHLInc, IndHLDec,
            HighA8, HighC, SpOffset, Vector};
        use Operand::None as Nil;

        let mut instructions = vec![
            op(0x00, NOP, Nil, Nil, 4),
            op(0x10, STOP, Nil, Nil, 4),
            op(0x76, HALT, Nil, Nil, 4),
            op(0xF3, DI, Nil, Nil, 4),
            op(0xFB, EI, Nil, Nil, 4),

            op(0x01, LD, BC, D16, 12), op(0x11, LD, DE, D16, 12), op(0x21, LD, HL, D16, 12), op(0x31, LD, SP, D16, 12),
            op(0x08, LD, A16, SP, 20),
            op(0xF9, LD, SP, HL, 8),
            op(0xF8, LD, HL, SpOffset, 12),

            op(0x02, LD, IndBC, RegA, 8), op(0x12, LD, IndDE, RegA, 8),
            op(0x22, LD, IndHLInc, RegA, 8), op(0x32, LD, IndHLDec, RegA, 8),
            op(0x0A, LD, RegA, IndBC, 8), op(0x1A, LD, RegA, IndDE, 8),
            op(0x2A, LD, RegA, IndHLInc, 8), op(0x3A, LD, RegA, IndHLDec, 8),

            op(0x06, LD, RegB, D8, 8), op(0x0E, LD, RegC, D8, 8), op(0x16, LD, RegD, D8, 8), op(0x1E, LD, RegE, D8, 8),
            op(0x26, LD, RegH, D8, 8), op(0x2E, LD, RegL, D8, 8), op(0x36, LD, IndHL, D8, 12), op(0x3E, LD, RegA, D8, 8),

            op(0xE0, LDH, HighA8, RegA, 12), op(0xF0, LDH, RegA, HighA8, 12),
            op(0xE2, LD, HighC, RegA, 8), op(0xF2, LD, RegA, HighC, 8),
            op(0xEA, LD, A16, RegA, 16), op(0xFA, LD, RegA, A16, 16),

            op(0x03, INC, BC, Nil, 8), op(0x13, INC, DE, Nil, 8), op(0x23, INC, HL, Nil, 8), op(0x33, INC, SP, Nil, 8),
            op(0x0B, DEC, BC, Nil, 8), op(0x1B, DEC, DE, Nil, 8), op(0x2B, DEC, HL, Nil, 8), op(0x3B, DEC, SP, Nil, 8),

            op(0x04, INC, RegB, Nil, 4), op(0x0C, INC, RegC, Nil, 4), op(0x14, INC, RegD, Nil, 4), op(0x1C, INC, RegE, Nil, 4),
            op(0x24, INC, RegH, Nil, 4), op(0x2C, INC, RegL, Nil, 4), op(0x34, INC, IndHL, Nil, 12), op(0x3C, INC, RegA, Nil, 4),
            op(0x05, DEC, RegB, Nil, 4), op(0x0D, DEC, RegC, Nil, 4), op(0x15, DEC, RegD, Nil, 4), op(0x1D, DEC, RegE, Nil, 4),
            op(0x25, DEC, RegH, Nil, 4), op(0x2D, DEC, RegL, Nil, 4), op(0x35, DEC, IndHL, Nil, 12), op(0x3D, DEC, RegA, Nil, 4),

            op(0x09, ADD, HL, BC, 8), op(0x19, ADD, HL, DE, 8), op(0x29, ADD, HL, HL, 8), op(0x39, ADD, HL, SP, 8),
            op(0xE8, ADD, SP, R8, 16),

            op(0xC6, ADD, RegA, D8, 8), op(0xCE, ADC, RegA, D8, 8), op(0xD6, SUB, RegA, D8, 8), op(0xDE, SBC, RegA, D8, 8),
            op(0xE6, AND, RegA, D8, 8), op(0xEE, XOR, RegA, D8, 8), op(0xF6, OR, RegA, D8, 8), op(0xFE, CP, RegA, D8, 8),

            op(0x07, RLCA, RegA, Nil, 4), op(0x0F, RRCA, RegA, Nil, 4), op(0x17, RLA, RegA, Nil, 4), op(0x1F, RRA, RegA, Nil, 4),
            op(0x27, DAA, RegA, Nil, 4), op(0x2F, CPL, RegA, Nil, 4), op(0x37, SCF, Nil, Nil, 4), op(0x3F, CCF, Nil, Nil, 4),

            branch(0x18, JR, Always, R8, 12, 0),
            branch(0x20, JR, NZ, R8, 8, 4), branch(0x28, JR, Z, R8, 8, 4),
            branch(0x30, JR, NC, R8, 8, 4), branch(0x38, JR, C, R8, 8, 4),

            branch(0xC3, JP, Always, D16, 16, 0),
            branch(0xC2, JP, NZ, D16, 12, 4), branch(0xCA, JP, Z, D16, 12, 4),
            branch(0xD2, JP, NC, D16, 12, 4), branch(0xDA, JP, C, D16, 12, 4),
            branch(0xE9, JP, Always, HL, 4, 0),

            branch(0xCD, CALL, Always, D16, 24, 0),
            branch(0xC4, CALL, NZ, D16, 12, 12), branch(0xCC, CALL, Z, D16, 12, 12),
            branch(0xD4, CALL, NC, D16, 12, 12), branch(0xDC, CALL, C, D16, 12, 12),

            branch(0xC9, RET, Always, Nil, 16, 0),
            branch(0xC0, RET, NZ, Nil, 8, 12), branch(0xC8, RET, Z, Nil, 8, 12),
            branch(0xD0, RET, NC, Nil, 8, 12), branch(0xD8, RET, C, Nil, 8, 12),
            branch(0xD9, RETI, Always, Nil, 16, 0),

            op(0xC7, RST, Nil, Vector(0x00), 16), op(0xCF, RST, Nil, Vector(0x08), 16),
            op(0xD7, RST, Nil, Vector(0x10), 16), op(0xDF, RST, Nil, Vector(0x18), 16),
            op(0xE7, RST, Nil, Vector(0x20), 16), op(0xEF, RST, Nil, Vector(0x28), 16),
            op(0xF7, RST, Nil, Vector(0x30), 16), op(0xFF, RST, Nil, Vector(0x38), 16),

            op(0xC5, PUSH, Nil, BC, 16), op(0xD5, PUSH, Nil, DE, 16), op(0xE5, PUSH, Nil, HL, 16), op(0xF5, PUSH, Nil, AF, 16),
            op(0xC1, POP, BC, Nil, 12), op(0xD1, POP, DE, Nil, 12), op(0xE1, POP, HL, Nil, 12), op(0xF1, POP, AF, Nil, 12),
        ];

        instructions.extend(register_block());
        instructions
    };

    static ref PREFIXED_LIST: Vec<Instruction> = (0..=0xFFu8).map(prefixed_instruction).collect();

    /// Dense lookup by opcode byte. 0xCB escapes to the prefixed table; the eleven
    /// opcodes the LR35902 leaves undefined hold `None`.
    pub static ref INSTRUCTIONS: [Option<&'static Instruction>; 256] = {
        let mut lookup: [Option<&'static Instruction>; 256] = [None; 256];
        for instruction in INSTRUCTION_LIST.iter() {
            lookup[instruction.opcode as usize] = Some(instruction);
        }
        lookup
    };

    pub static ref CB_INSTRUCTIONS: [Option<&'static Instruction>; 256] = {
        let mut lookup: [Option<&'static Instruction>; 256] = [None; 256];
        for instruction in PREFIXED_LIST.iter() {
            lookup[instruction.opcode as usize] = Some(instruction);
        }
        lookup
    };
}

pub const PREFIX_OPCODE: u8 = 0xCB;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_no_duplicates() {
        let mut seen = [false; 256];
        for instruction in INSTRUCTION_LIST.iter() {
            assert!(!seen[instruction.opcode as usize], "opcode {:02X} listed twice", instruction.opcode);
            seen[instruction.opcode as usize] = true;
        }
    }

    #[test]
    fn test_table_sizes() {
        assert_eq!(INSTRUCTIONS.iter().filter(|slot| slot.is_some()).count(), 244);
        assert_eq!(CB_INSTRUCTIONS.iter().filter(|slot| slot.is_some()).count(), 256);
    }

    #[test]
    fn test_undefined_slots_are_empty() {
        for opcode in [0xCB, 0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD] {
            assert!(INSTRUCTIONS[opcode].is_none(), "opcode {:02X} should be empty", opcode);
        }
    }

    #[test]
    fn test_sizes_follow_operands() {
        assert_eq!(INSTRUCTIONS[0x00].unwrap().size, 1);
        assert_eq!(INSTRUCTIONS[0x3E].unwrap().size, 2);
        assert_eq!(INSTRUCTIONS[0x01].unwrap().size, 3);
        assert_eq!(INSTRUCTIONS[0x08].unwrap().size, 3);
        assert_eq!(INSTRUCTIONS[0xE0].unwrap().size, 2);
        assert_eq!(INSTRUCTIONS[0xF8].unwrap().size, 2);
        assert_eq!(INSTRUCTIONS[0x10].unwrap().size, 2);
        assert_eq!(CB_INSTRUCTIONS[0x37].unwrap().size, 2);
    }

    #[test]
    fn test_cycle_table() {
        let cycles = |opcode: usize| INSTRUCTIONS[opcode].unwrap().cycles;
        assert_eq!(cycles(0x41), 4);
        assert_eq!(cycles(0x46), 8);
        assert_eq!(cycles(0x36), 12);
        assert_eq!(cycles(0x08), 20);
        assert_eq!(cycles(0xCD), 24);
        assert_eq!(cycles(0xC3), 16);
        assert_eq!(cycles(0xC9), 16);
        assert_eq!(cycles(0xE8), 16);
        assert_eq!(cycles(0xF8), 12);
        assert_eq!(cycles(0xC5), 16);
        assert_eq!(cycles(0xC1), 12);

        let cond_ret = INSTRUCTIONS[0xC0].unwrap();
        assert_eq!(cond_ret.cycles + cond_ret.branch_cycles, 20);
        let cond_jr = INSTRUCTIONS[0x20].unwrap();
        assert_eq!((cond_jr.cycles, cond_jr.cycles + cond_jr.branch_cycles), (8, 12));

        assert_eq!(CB_INSTRUCTIONS[0x11].unwrap().cycles, 8);
        assert_eq!(CB_INSTRUCTIONS[0x06].unwrap().cycles, 16);
        assert_eq!(CB_INSTRUCTIONS[0x46].unwrap().cycles, 12);
        assert_eq!(CB_INSTRUCTIONS[0xC6].unwrap().cycles, 16);
    }

    #[test]
    fn test_decoded_operands() {
        let ld = INSTRUCTIONS[0x78].unwrap();
        assert_eq!((ld.mnemonic, ld.dest, ld.src), (Mnemonic::LD, Operand::A, Operand::B));

        let cp = INSTRUCTIONS[0xBE].unwrap();
        assert_eq!((cp.mnemonic, cp.src), (Mnemonic::CP, Operand::IndHL));

        let bit = CB_INSTRUCTIONS[0x7C].unwrap();
        assert_eq!((bit.mnemonic, bit.dest, bit.src), (Mnemonic::BIT, Operand::H, Operand::Bit(7)));
        assert!(bit.prefixed);
    }
}
