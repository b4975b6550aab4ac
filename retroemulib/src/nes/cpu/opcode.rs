use crate::nes::bus::SystemBus;

use super::Cpu6502;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddrMode {
    IMP, ACC, IMM,
    ZPG, ZPX, ZPY,
    REL, ABS, ABX,
    ABY, IND, IZX, IZY,
}

impl AddrMode {
    /// Bytes occupied by an instruction using this mode, opcode included.
    pub const fn size(self) -> u16 {
        match self {
            AddrMode::IMP | AddrMode::ACC => 1,
            AddrMode::IMM | AddrMode::ZPG | AddrMode::ZPX | AddrMode::ZPY
            | AddrMode::REL | AddrMode::IZX | AddrMode::IZY => 2,
            AddrMode::ABS | AddrMode::ABX | AddrMode::ABY | AddrMode::IND => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instr {
    ADC, AND, ASL, BCC, BCS, BEQ, BIT, BMI, BNE, BPL, BRK, BVC, BVS, CLC,
    CLD, CLI, CLV, CMP, CPX, CPY, DEC, DEX, DEY, EOR, INC, INX, INY, JMP,
    JSR, LDA, LDX, LDY, LSR, NOP, ORA, PHA, PHP, PLA, PLP, ROL, ROR, RTI,
    RTS, SBC, SEC, SED, SEI, STA, STX, STY, TAX, TAY, TSX, TXA, TXS, TYA,

    // stable unofficial opcodes
    ALR, ANC, ARR, DCP, ISC, LAX, RLA, RRA, SAX, SBX, SLO, SRE, USBC,
}

type AddrModeFn = fn(&mut Cpu6502, &mut SystemBus);
type InstrFn = fn(&mut Cpu6502, &mut SystemBus) -> u32;

pub struct Opcode {
    pub opcode: u8,
    pub instr: Instr,
    pub addr_mode: AddrMode,
    pub size: u16,
    pub cycles: u32,
    pub unofficial: bool,
    addr_mode_fn: AddrModeFn,
    instr_fn: InstrFn,
}

impl Opcode {
    /// Resolves the operand then runs the instruction. The program counter must
    /// already point past this instruction's bytes.
    pub fn execute_op(&self, cpu: &mut Cpu6502, bus: &mut SystemBus) -> u32 {
        (self.addr_mode_fn)(cpu, bus);
        let extra_cycles = (self.instr_fn)(cpu, bus);
        self.cycles + extra_cycles
    }

    fn new(opcode: u8, addr_mode: AddrMode, instr: Instr, cycles: u32, unofficial: bool) -> Self {
        let addr_mode_fn: AddrModeFn = match addr_mode {
            AddrMode::IMP => Cpu6502::imp_addressing,
            AddrMode::ACC => Cpu6502::acc_addressing,
            AddrMode::IMM => Cpu6502::imm_addressing,
            AddrMode::ZPG => Cpu6502::zpg_addressing,
            AddrMode::ZPX => Cpu6502::zpx_addressing,
            AddrMode::ZPY => Cpu6502::zpy_addressing,
            AddrMode::REL => Cpu6502::rel_addressing,
            AddrMode::ABS => Cpu6502::abs_addressing,
            AddrMode::ABX => Cpu6502::abx_addressing,
            AddrMode::ABY => Cpu6502::aby_addressing,
            AddrMode::IND => Cpu6502::ind_addressing,
            AddrMode::IZX => Cpu6502::izx_addressing,
            AddrMode::IZY => Cpu6502::izy_addressing,
        };

        let instr_fn: InstrFn = match instr {
            Instr::ADC => Cpu6502::add_with_carry,
            Instr::AND => Cpu6502::and_accumulator,
            Instr::ASL => Cpu6502::arithmetic_shift_left,
            Instr::BCC => Cpu6502::branch_if_carry_clear,
            Instr::BCS => Cpu6502::branch_if_carry_set,
            Instr::BEQ => Cpu6502::branch_if_equal,
            Instr::BIT => Cpu6502::bit_test,
            Instr::BMI => Cpu6502::branch_if_minus,
            Instr::BNE => Cpu6502::branch_if_not_equal,
            Instr::BPL => Cpu6502::branch_if_positive,
            Instr::BRK => Cpu6502::force_interrupt,
            Instr::BVC => Cpu6502::branch_if_overflow_clear,
            Instr::BVS => Cpu6502::branch_if_overflow_set,
            Instr::CLC => Cpu6502::clear_carry_flag,
            Instr::CLD => Cpu6502::clear_decimal_mode,
            Instr::CLI => Cpu6502::clear_interrupt_disable,
            Instr::CLV => Cpu6502::clear_overflow_flag,
            Instr::CMP => Cpu6502::compare_accumulator,
            Instr::CPX => Cpu6502::compare_x_reg,
            Instr::CPY => Cpu6502::compare_y_reg,
            Instr::DEC => Cpu6502::decrement_memory,
            Instr::DEX => Cpu6502::decrement_x_reg,
            Instr::DEY => Cpu6502::decrement_y_reg,
            Instr::EOR => Cpu6502::exclusive_or_accumulator,
            Instr::INC => Cpu6502::increment_memory,
            Instr::INX => Cpu6502::increment_x_reg,
            Instr::INY => Cpu6502::increment_y_reg,
            Instr::JMP => Cpu6502::jump,
            Instr::JSR => Cpu6502::jump_to_subroutine,
            Instr::LDA => Cpu6502::load_accumulator,
            Instr::LDX => Cpu6502::load_x_reg,
            Instr::LDY => Cpu6502::load_y_reg,
            Instr::LSR => Cpu6502::logical_shift_right,
            Instr::NOP => Cpu6502::no_operation,
            Instr::ORA => Cpu6502::or_accumulator,
            Instr::PHA => Cpu6502::push_accumulator,
            Instr::PHP => Cpu6502::push_processor_status,
            Instr::PLA => Cpu6502::pull_accumulator,
            Instr::PLP => Cpu6502::pull_processor_status,
            Instr::ROL => Cpu6502::rotate_left,
            Instr::ROR => Cpu6502::rotate_right,
            Instr::RTI => Cpu6502::return_from_interrupt,
            Instr::RTS => Cpu6502::return_from_subroutine,
            Instr::SBC => Cpu6502::subtract_with_carry,
            Instr::SEC => Cpu6502::set_carry_flag,
            Instr::SED => Cpu6502::set_decimal_mode,
            Instr::SEI => Cpu6502::set_interrupt_disable,
            Instr::STA => Cpu6502::store_accumulator,
            Instr::STX => Cpu6502::store_x_reg,
            Instr::STY => Cpu6502::store_y_reg,
            Instr::TAX => Cpu6502::transfer_accumulator_to_x,
            Instr::TAY => Cpu6502::transfer_accumulator_to_y,
            Instr::TSX => Cpu6502::transfer_stack_pointer_to_x,
            Instr::TXA => Cpu6502::transfer_x_to_accumulator,
            Instr::TXS => Cpu6502::transfer_x_to_stack_pointer,
            Instr::TYA => Cpu6502::transfer_y_to_accumulator,

            Instr::ALR => Cpu6502::alr,
            Instr::ANC => Cpu6502::anc,
            Instr::ARR => Cpu6502::arr,
            Instr::DCP => Cpu6502::dcp,
            Instr::ISC => Cpu6502::isc,
            Instr::LAX => Cpu6502::lax,
            Instr::RLA => Cpu6502::rla,
            Instr::RRA => Cpu6502::rra,
            Instr::SAX => Cpu6502::sax,
            Instr::SBX => Cpu6502::sbx,
            Instr::SLO => Cpu6502::slo,
            Instr::SRE => Cpu6502::sre,
            Instr::USBC => Cpu6502::subtract_with_carry,
        };

        // BRK skips a padding byte after the opcode
        let size = match instr {
            Instr::BRK => 2,
            _ => addr_mode.size(),
        };

        Self {
            opcode,
            instr,
            addr_mode,
            size,
            cycles,
            unofficial,
            addr_mode_fn,
            instr_fn,
        }
    }
}

fn op(opcode: u8, addr_mode: AddrMode, instr: Instr, cycles: u32) -> Opcode {
    Opcode::new(opcode, addr_mode, instr, cycles, false)
}

fn unofficial(opcode: u8, addr_mode: AddrMode, instr: Instr, cycles: u32) -> Opcode {
    Opcode::new(opcode, addr_mode, instr, cycles, true)
}

lazy_static! {
    static ref OPCODES: Vec<Opcode> = {
        use AddrMode::*;
        use Instr::*;

        vec![
            op(0x69, IMM, ADC, 2), op(0x65, ZPG, ADC, 3), op(0x75, ZPX, ADC, 4), op(0x6D, ABS, ADC, 4),
            op(0x7D, ABX, ADC, 4), op(0x79, ABY, ADC, 4), op(0x61, IZX, ADC, 6), op(0x71, IZY, ADC, 5),

            op(0x29, IMM, AND, 2), op(0x25, ZPG, AND, 3), op(0x35, ZPX, AND, 4), op(0x2D, ABS, AND, 4),
            op(0x3D, ABX, AND, 4), op(0x39, ABY, AND, 4), op(0x21, IZX, AND, 6), op(0x31, IZY, AND, 5),

            op(0x0A, ACC, ASL, 2), op(0x06, ZPG, ASL, 5), op(0x16, ZPX, ASL, 6), op(0x0E, ABS, ASL, 6),
            op(0x1E, ABX, ASL, 7),

            op(0x90, REL, BCC, 2), op(0xB0, REL, BCS, 2), op(0xF0, REL, BEQ, 2), op(0x30, REL, BMI, 2),
            op(0xD0, REL, BNE, 2), op(0x10, REL, BPL, 2), op(0x50, REL, BVC, 2), op(0x70, REL, BVS, 2),

            op(0x24, ZPG, BIT, 3), op(0x2C, ABS, BIT, 4),

            op(0x00, IMP, BRK, 7),

            op(0x18, IMP, CLC, 2), op(0xD8, IMP, CLD, 2), op(0x58, IMP, CLI, 2), op(0xB8, IMP, CLV, 2),
            op(0x38, IMP, SEC, 2), op(0xF8, IMP, SED, 2), op(0x78, IMP, SEI, 2),

            op(0xC9, IMM, CMP, 2), op(0xC5, ZPG, CMP, 3), op(0xD5, ZPX, CMP, 4), op(0xCD, ABS, CMP, 4),
            op(0xDD, ABX, CMP, 4), op(0xD9, ABY, CMP, 4), op(0xC1, IZX, CMP, 6), op(0xD1, IZY, CMP, 5),

            op(0xE0, IMM, CPX, 2), op(0xE4, ZPG, CPX, 3), op(0xEC, ABS, CPX, 4),
            op(0xC0, IMM, CPY, 2), op(0xC4, ZPG, CPY, 3), op(0xCC, ABS, CPY, 4),

            op(0xC6, ZPG, DEC, 5), op(0xD6, ZPX, DEC, 6), op(0xCE, ABS, DEC, 6), op(0xDE, ABX, DEC, 7),
            op(0xCA, IMP, DEX, 2), op(0x88, IMP, DEY, 2),

            op(0x49, IMM, EOR, 2), op(0x45, ZPG, EOR, 3), op(0x55, ZPX, EOR, 4), op(0x4D, ABS, EOR, 4),
            op(0x5D, ABX, EOR, 4), op(0x59, ABY, EOR, 4), op(0x41, IZX, EOR, 6), op(0x51, IZY, EOR, 5),

            op(0xE6, ZPG, INC, 5), op(0xF6, ZPX, INC, 6), op(0xEE, ABS, INC, 6), op(0xFE, ABX, INC, 7),
            op(0xE8, IMP, INX, 2), op(0xC8, IMP, INY, 2),

            op(0x4C, ABS, JMP, 3), op(0x6C, IND, JMP, 5), op(0x20, ABS, JSR, 6),

            op(0xA9, IMM, LDA, 2), op(0xA5, ZPG, LDA, 3), op(0xB5, ZPX, LDA, 4), op(0xAD, ABS, LDA, 4),
            op(0xBD, ABX, LDA, 4), op(0xB9, ABY, LDA, 4), op(0xA1, IZX, LDA, 6), op(0xB1, IZY, LDA, 5),

            op(0xA2, IMM, LDX, 2), op(0xA6, ZPG, LDX, 3), op(0xB6, ZPY, LDX, 4), op(0xAE, ABS, LDX, 4),
            op(0xBE, ABY, LDX, 4),

            op(0xA0, IMM, LDY, 2), op(0xA4, ZPG, LDY, 3), op(0xB4, ZPX, LDY, 4), op(0xAC, ABS, LDY, 4),
            op(0xBC, ABX, LDY, 4),

            op(0x4A, ACC, LSR, 2), op(0x46, ZPG, LSR, 5), op(0x56, ZPX, LSR, 6), op(0x4E, ABS, LSR, 6),
            op(0x5E, ABX, LSR, 7),

            op(0xEA, IMP, NOP, 2),

            op(0x09, IMM, ORA, 2), op(0x05, ZPG, ORA, 3), op(0x15, ZPX, ORA, 4), op(0x0D, ABS, ORA, 4),
            op(0x1D, ABX, ORA, 4), op(0x19, ABY, ORA, 4), op(0x01, IZX, ORA, 6), op(0x11, IZY, ORA, 5),

            op(0x48, IMP, PHA, 3), op(0x08, IMP, PHP, 3), op(0x68, IMP, PLA, 4), op(0x28, IMP, PLP, 4),

            op(0x2A, ACC, ROL, 2), op(0x26, ZPG, ROL, 5), op(0x36, ZPX, ROL, 6), op(0x2E, ABS, ROL, 6),
            op(0x3E, ABX, ROL, 7),

            op(0x6A, ACC, ROR, 2), op(0x66, ZPG, ROR, 5), op(0x76, ZPX, ROR, 6), op(0x6E, ABS, ROR, 6),
            op(0x7E, ABX, ROR, 7),

            op(0x40, IMP, RTI, 6), op(0x60, IMP, RTS, 6),

            op(0xE9, IMM, SBC, 2), op(0xE5, ZPG, SBC, 3), op(0xF5, ZPX, SBC, 4), op(0xED, ABS, SBC, 4),
            op(0xFD, ABX, SBC, 4), op(0xF9, ABY, SBC, 4), op(0xE1, IZX, SBC, 6), op(0xF1, IZY, SBC, 5),

            op(0x85, ZPG, STA, 3), op(0x95, ZPX, STA, 4), op(0x8D, ABS, STA, 4), op(0x9D, ABX, STA, 5),
            op(0x99, ABY, STA, 5), op(0x81, IZX, STA, 6), op(0x91, IZY, STA, 6),

            op(0x86, ZPG, STX, 3), op(0x96, ZPY, STX, 4), op(0x8E, ABS, STX, 4),
            op(0x84, ZPG, STY, 3), op(0x94, ZPX, STY, 4), op(0x8C, ABS, STY, 4),

            op(0xAA, IMP, TAX, 2), op(0xA8, IMP, TAY, 2), op(0xBA, IMP, TSX, 2), op(0x8A, IMP, TXA, 2),
            op(0x9A, IMP, TXS, 2), op(0x98, IMP, TYA, 2),

            unofficial(0x4B, IMM, ALR, 2),
            unofficial(0x0B, IMM, ANC, 2), unofficial(0x2B, IMM, ANC, 2),
            unofficial(0x6B, IMM, ARR, 2),
            unofficial(0xCB, IMM, SBX, 2),
            unofficial(0xEB, IMM, USBC, 2),

            unofficial(0xC7, ZPG, DCP, 5), unofficial(0xD7, ZPX, DCP, 6), unofficial(0xCF, ABS, DCP, 6),
            unofficial(0xDF, ABX, DCP, 7), unofficial(0xDB, ABY, DCP, 7), unofficial(0xC3, IZX, DCP, 8),
            unofficial(0xD3, IZY, DCP, 8),

            unofficial(0xE7, ZPG, ISC, 5), unofficial(0xF7, ZPX, ISC, 6), unofficial(0xEF, ABS, ISC, 6),
            unofficial(0xFF, ABX, ISC, 7), unofficial(0xFB, ABY, ISC, 7), unofficial(0xE3, IZX, ISC, 8),
            unofficial(0xF3, IZY, ISC, 8),

            unofficial(0xA7, ZPG, LAX, 3), unofficial(0xB7, ZPY, LAX, 4), unofficial(0xAF, ABS, LAX, 4),
            unofficial(0xBF, ABY, LAX, 4), unofficial(0xA3, IZX, LAX, 6), unofficial(0xB3, IZY, LAX, 5),

            unofficial(0x27, ZPG, RLA, 5), unofficial(0x37, ZPX, RLA, 6), unofficial(0x2F, ABS, RLA, 6),
            unofficial(0x3F, ABX, RLA, 7), unofficial(0x3B, ABY, RLA, 7), unofficial(0x23, IZX, RLA, 8),
            unofficial(0x33, IZY, RLA, 8),

            unofficial(0x67, ZPG, RRA, 5), unofficial(0x77, ZPX, RRA, 6), unofficial(0x6F, ABS, RRA, 6),
            unofficial(0x7F, ABX, RRA, 7), unofficial(0x7B, ABY, RRA, 7), unofficial(0x63, IZX, RRA, 8),
            unofficial(0x73, IZY, RRA, 8),

            unofficial(0x87, ZPG, SAX, 3), unofficial(0x97, ZPY, SAX, 4), unofficial(0x8F, ABS, SAX, 4),
            unofficial(0x83, IZX, SAX, 6),

            unofficial(0x07, ZPG, SLO, 5), unofficial(0x17, ZPX, SLO, 6), unofficial(0x0F, ABS, SLO, 6),
            unofficial(0x1F, ABX, SLO, 7), unofficial(0x1B, ABY, SLO, 7), unofficial(0x03, IZX, SLO, 8),
            unofficial(0x13, IZY, SLO, 8),

            unofficial(0x47, ZPG, SRE, 5), unofficial(0x57, ZPX, SRE, 6), unofficial(0x4F, ABS, SRE, 6),
            unofficial(0x5F, ABX, SRE, 7), unofficial(0x5B, ABY, SRE, 7), unofficial(0x43, IZX, SRE, 8),
            unofficial(0x53, IZY, SRE, 8),

            unofficial(0x1A, IMP, NOP, 2), unofficial(0x3A, IMP, NOP, 2), unofficial(0x5A, IMP, NOP, 2),
            unofficial(0x7A, IMP, NOP, 2), unofficial(0xDA, IMP, NOP, 2), unofficial(0xFA, IMP, NOP, 2),
            unofficial(0x80, IMM, NOP, 2), unofficial(0x82, IMM, NOP, 2), unofficial(0x89, IMM, NOP, 2),
            unofficial(0xC2, IMM, NOP, 2), unofficial(0xE2, IMM, NOP, 2),
            unofficial(0x04, ZPG, NOP, 3), unofficial(0x44, ZPG, NOP, 3), unofficial(0x64, ZPG, NOP, 3),
            unofficial(0x14, ZPX, NOP, 4), unofficial(0x34, ZPX, NOP, 4), unofficial(0x54, ZPX, NOP, 4),
            unofficial(0x74, ZPX, NOP, 4), unofficial(0xD4, ZPX, NOP, 4), unofficial(0xF4, ZPX, NOP, 4),
            unofficial(0x0C, ABS, NOP, 4),
            unofficial(0x1C, ABX, NOP, 4), unofficial(0x3C, ABX, NOP, 4), unofficial(0x5C, ABX, NOP, 4),
            unofficial(0x7C, ABX, NOP, 4), unofficial(0xDC, ABX, NOP, 4), unofficial(0xFC, ABX, NOP, 4),
        ]
    };

    /// Dense lookup by opcode byte. Unassigned slots (the JAM opcodes and the
    /// unstable unofficial ones) hold `None`.
    pub static ref OPCODES_LOOKUP: [Option<&'static Opcode>; 256] = {
        let mut lookup: [Option<&'static Opcode>; 256] = [None; 256];
        for op in OPCODES.iter() {
            lookup[op.opcode as usize] = Some(op);
        }
        lookup
    };
}
