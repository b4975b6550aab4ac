mod opcode;

use crate::nes::bus::SystemBus;
use crate::EmulationError;

use self::opcode::{AddrMode, OPCODES_LOOKUP};

const STACK_START: u16 = 0x100;
const STACK_END: u16 = 0x1FF;

const NMI_VECTOR: u16 = 0xFFFA;
const RESET_VECTOR: u16 = 0xFFFC;
const IRQ_VECTOR: u16 = 0xFFFE;

const INTERRUPT_CYCLES: u32 = 7;

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatusFlag: u8 {
        const C = 0b00000001;
        const Z = 0b00000010;
        const I = 0b00000100;
        const D = 0b00001000;
        const B = 0b00010000;
        const U = 0b00100000;
        const V = 0b01000000;
        const N = 0b10000000;
    }
}

/// Processor flags. B and U only exist in the packed byte pushed to the stack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Status {
    pub carry: bool,
    pub zero: bool,
    pub interrupt_disable: bool,
    pub decimal: bool,
    pub overflow: bool,
    pub negative: bool,
}

impl Status {
    pub fn to_byte(&self, brk: bool) -> u8 {
        let mut flags = StatusFlag::U;
        flags.set(StatusFlag::C, self.carry);
        flags.set(StatusFlag::Z, self.zero);
        flags.set(StatusFlag::I, self.interrupt_disable);
        flags.set(StatusFlag::D, self.decimal);
        flags.set(StatusFlag::B, brk);
        flags.set(StatusFlag::V, self.overflow);
        flags.set(StatusFlag::N, self.negative);
        flags.bits()
    }

    pub fn from_byte(byte: u8) -> Self {
        let flags = StatusFlag::from_bits_truncate(byte);
        Self {
            carry: flags.contains(StatusFlag::C),
            zero: flags.contains(StatusFlag::Z),
            interrupt_disable: flags.contains(StatusFlag::I),
            decimal: flags.contains(StatusFlag::D),
            overflow: flags.contains(StatusFlag::V),
            negative: flags.contains(StatusFlag::N),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CpuSnapshot {
    pub accumulator: u8,
    pub x_index_reg: u8,
    pub y_index_reg: u8,
    pub program_counter: u16,
    pub stack_pointer: u8,
    pub status: Status,
    pub total_cycles: u64,
}

pub struct Cpu6502 {
    accumulator: u8,
    x_index_reg: u8,
    y_index_reg: u8,
    program_counter: u16,
    stack_pointer: u8,
    status: Status,

    addr_mode: AddrMode,
    operand_addr: u16,
    operand_data: u8,
    page_crossed: bool,

    nmi_pending: bool,
    allow_unofficial: bool,
    total_cycles: u64,
}

impl Cpu6502 {
    pub fn new(allow_unofficial: bool) -> Self {
        Self {
            accumulator: 0,
            x_index_reg: 0,
            y_index_reg: 0,
            program_counter: 0,
            stack_pointer: 0xFD,
            status: Status::from_byte(0x24),

            addr_mode: AddrMode::IMP,
            operand_addr: 0,
            operand_data: 0,
            page_crossed: false,

            nmi_pending: false,
            allow_unofficial,
            total_cycles: 0,
        }
    }

    /// Services a pending interrupt or executes one instruction, returning the cycles consumed.
    pub fn step(&mut self, bus: &mut SystemBus) -> Result<u32, EmulationError> {
        let cycles = if self.nmi_pending {
            self.nmi_pending = false;
            tracing::debug!("nmi taken at {:04X}", self.program_counter);
            self.trigger_interrupt(bus, NMI_VECTOR, false);
            INTERRUPT_CYCLES
        } else if bus.irq_line() && !self.status.interrupt_disable {
            tracing::debug!("irq taken at {:04X}", self.program_counter);
            self.trigger_interrupt(bus, IRQ_VECTOR, false);
            INTERRUPT_CYCLES
        } else {
            self.execute_instruction(bus)?
        };

        self.total_cycles += cycles as u64;
        Ok(cycles)
    }

    #[inline]
    fn execute_instruction(&mut self, bus: &mut SystemBus) -> Result<u32, EmulationError> {
        let pc = self.program_counter;
        let opcode = self.read_byte(bus, pc);

        let op = match OPCODES_LOOKUP[opcode as usize] {
            Some(op) if !op.unofficial || self.allow_unofficial => op,
            _ => return Err(EmulationError::UnimplementedOpcode { opcode, prefixed: false, pc }),
        };

        tracing::trace!("{:04X} {:?} {:?} A:{:02X} X:{:02X} Y:{:02X} P:{:02X} SP:{:02X}",
            pc, op.instr, op.addr_mode, self.accumulator, self.x_index_reg, self.y_index_reg,
            self.status.to_byte(false), self.stack_pointer);

        self.program_counter = pc.wrapping_add(op.size);
        Ok(op.execute_op(self, bus))
    }

    /// Loads the reset vector and returns the cycles the reset sequence takes.
    pub fn reset(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator = 0x00;
        self.x_index_reg = 0x00;
        self.y_index_reg = 0x00;
        self.stack_pointer = 0xFD;
        self.status = Status::from_byte(0x24);
        self.program_counter = self.read_word(bus, RESET_VECTOR);

        self.addr_mode = AddrMode::IMP;
        self.operand_addr = 0x0000;
        self.operand_data = 0x00;
        self.page_crossed = false;
        self.nmi_pending = false;
        self.total_cycles = INTERRUPT_CYCLES as u64;

        INTERRUPT_CYCLES
    }

    /// Latches an NMI; it is serviced at the start of the next step.
    pub fn request_nmi(&mut self) {
        self.nmi_pending = true;
    }

    pub fn snapshot(&self) -> CpuSnapshot {
        CpuSnapshot {
            accumulator: self.accumulator,
            x_index_reg: self.x_index_reg,
            y_index_reg: self.y_index_reg,
            program_counter: self.program_counter,
            stack_pointer: self.stack_pointer,
            status: self.status,
            total_cycles: self.total_cycles,
        }
    }

    fn trigger_interrupt(&mut self, bus: &mut SystemBus, vector_addr: u16, brk_caused: bool) {
        self.push_word_to_stack(bus, self.program_counter);
        self.push_byte_to_stack(bus, self.status.to_byte(brk_caused));

        self.status.interrupt_disable = true;
        self.program_counter = self.read_word(bus, vector_addr);
    }

    #[inline]
    pub(super) fn add_with_carry(&mut self, bus: &mut SystemBus) -> u32 {
        let operand = self.read_operand(bus);
        self.add_to_accumulator(operand);

        self.page_crossed as u32
    }

    #[inline]
    fn add_to_accumulator(&mut self, operand: u8) {
        let op1 = self.accumulator;
        let sum = op1 as u16 + operand as u16 + self.status.carry as u16;
        self.accumulator = sum as u8;

        self.status.carry = sum > 0xFF;
        self.status.overflow = (op1 ^ operand) & 0x80 == 0 && (op1 ^ self.accumulator) & 0x80 != 0;
        self.set_z_and_n_flag(self.accumulator);
    }

    #[inline]
    pub(super) fn and_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator &= self.read_operand(bus);

        self.set_z_and_n_flag(self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn arithmetic_shift_left(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        let result = data << 1;
        self.write_operand(bus, result);

        self.status.carry = data & 0b10000000 != 0;
        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn branch_if_carry_clear(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if_cond(!self.status.carry)
    }

    #[inline]
    pub(super) fn branch_if_carry_set(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if_cond(self.status.carry)
    }

    #[inline]
    pub(super) fn branch_if_equal(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if_cond(self.status.zero)
    }

    #[inline]
    pub(super) fn bit_test(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        self.status.zero = self.accumulator & data == 0;
        self.status.overflow = data & 0b01000000 != 0;
        self.status.negative = data & 0b10000000 != 0;

        0
    }

    #[inline]
    pub(super) fn branch_if_minus(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if_cond(self.status.negative)
    }

    #[inline]
    pub(super) fn branch_if_not_equal(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if_cond(!self.status.zero)
    }

    #[inline]
    pub(super) fn branch_if_positive(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if_cond(!self.status.negative)
    }

    #[inline]
    pub(super) fn branch_if_overflow_clear(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if_cond(!self.status.overflow)
    }

    #[inline]
    pub(super) fn branch_if_overflow_set(&mut self, _bus: &mut SystemBus) -> u32 {
        self.branch_if_cond(self.status.overflow)
    }

    /// Taken branches cost one cycle, plus one more when the target is on another page.
    #[inline]
    fn branch_if_cond(&mut self, cond: bool) -> u32 {
        if cond {
            self.program_counter = self.operand_addr;

            1 + self.page_crossed as u32
        } else {
            0
        }
    }

    #[inline]
    pub(super) fn clear_carry_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.status.carry = false;

        0
    }

    #[inline]
    pub(super) fn clear_decimal_mode(&mut self, _bus: &mut SystemBus) -> u32 {
        self.status.decimal = false;

        0
    }

    #[inline]
    pub(super) fn clear_interrupt_disable(&mut self, _bus: &mut SystemBus) -> u32 {
        self.status.interrupt_disable = false;

        0
    }

    #[inline]
    pub(super) fn clear_overflow_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.status.overflow = false;

        0
    }

    #[inline]
    pub(super) fn compare_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.compare_register(bus, self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn compare_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.compare_register(bus, self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn compare_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.compare_register(bus, self.y_index_reg);

        0
    }

    #[inline]
    fn compare_register(&mut self, bus: &mut SystemBus, register: u8) {
        let data = self.read_operand(bus);
        self.status.carry = register >= data;
        self.set_z_and_n_flag(register.wrapping_sub(data));
    }

    #[inline]
    pub(super) fn decrement_memory(&mut self, bus: &mut SystemBus) -> u32 {
        let result = self.read_operand(bus).wrapping_sub(1);
        self.write_operand(bus, result);

        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn decrement_x_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.x_index_reg.wrapping_sub(1);

        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn decrement_y_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.y_index_reg.wrapping_sub(1);

        self.set_z_and_n_flag(self.y_index_reg);

        0
    }

    #[inline]
    pub(super) fn exclusive_or_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator ^= self.read_operand(bus);

        self.set_z_and_n_flag(self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn force_interrupt(&mut self, bus: &mut SystemBus) -> u32 {
        self.trigger_interrupt(bus, IRQ_VECTOR, true);

        0
    }

    #[inline]
    pub(super) fn increment_memory(&mut self, bus: &mut SystemBus) -> u32 {
        let result = self.read_operand(bus).wrapping_add(1);
        self.write_operand(bus, result);

        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn increment_x_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.x_index_reg.wrapping_add(1);

        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn increment_y_reg(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.y_index_reg.wrapping_add(1);

        self.set_z_and_n_flag(self.y_index_reg);

        0
    }

    #[inline]
    pub(super) fn jump(&mut self, _bus: &mut SystemBus) -> u32 {
        self.program_counter = self.operand_addr;

        0
    }

    #[inline]
    pub(super) fn jump_to_subroutine(&mut self, bus: &mut SystemBus) -> u32 {
        let return_addr = self.program_counter.wrapping_sub(1);
        self.push_word_to_stack(bus, return_addr);

        // the target's high byte is fetched after the push, so a JSR whose
        // operand lives on the stack page sees the pushed return address
        self.program_counter = if matches!(return_addr, STACK_START..=STACK_END) {
            ((self.read_byte(bus, return_addr) as u16) << 8) | (self.operand_addr & 0x00FF)
        } else {
            self.operand_addr
        };

        0
    }

    #[inline]
    pub(super) fn load_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator = self.read_operand(bus);

        self.set_z_and_n_flag(self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn load_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.read_operand(bus);

        self.set_z_and_n_flag(self.x_index_reg);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn load_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.read_operand(bus);

        self.set_z_and_n_flag(self.y_index_reg);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn logical_shift_right(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        let result = data >> 1;
        self.write_operand(bus, result);

        self.status.carry = data & 0b00000001 != 0;
        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn no_operation(&mut self, _bus: &mut SystemBus) -> u32 {
        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn or_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator |= self.read_operand(bus);

        self.set_z_and_n_flag(self.accumulator);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn push_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.push_byte_to_stack(bus, self.accumulator);

        0
    }

    #[inline]
    pub(super) fn push_processor_status(&mut self, bus: &mut SystemBus) -> u32 {
        self.push_byte_to_stack(bus, self.status.to_byte(true));

        0
    }

    #[inline]
    pub(super) fn pull_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.accumulator = self.pop_byte_from_stack(bus);

        self.set_z_and_n_flag(self.accumulator);

        0
    }

    #[inline]
    pub(super) fn pull_processor_status(&mut self, bus: &mut SystemBus) -> u32 {
        let byte = self.pop_byte_from_stack(bus);
        self.status = Status::from_byte(byte);

        0
    }

    #[inline]
    pub(super) fn return_from_interrupt(&mut self, bus: &mut SystemBus) -> u32 {
        let byte = self.pop_byte_from_stack(bus);
        self.status = Status::from_byte(byte);
        self.program_counter = self.pop_word_from_stack(bus);

        0
    }

    #[inline]
    pub(super) fn return_from_subroutine(&mut self, bus: &mut SystemBus) -> u32 {
        self.program_counter = self.pop_word_from_stack(bus).wrapping_add(1);

        0
    }

    #[inline]
    pub(super) fn rotate_left(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        let result = (data << 1) | (self.status.carry as u8);
        self.write_operand(bus, result);

        self.status.carry = data & 0b10000000 != 0;
        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn rotate_right(&mut self, bus: &mut SystemBus) -> u32 {
        let data = self.read_operand(bus);
        let result = (data >> 1) | ((self.status.carry as u8) << 7);
        self.write_operand(bus, result);

        self.status.carry = data & 0b00000001 != 0;
        self.set_z_and_n_flag(result);

        0
    }

    #[inline]
    pub(super) fn set_carry_flag(&mut self, _bus: &mut SystemBus) -> u32 {
        self.status.carry = true;

        0
    }

    #[inline]
    pub(super) fn set_decimal_mode(&mut self, _bus: &mut SystemBus) -> u32 {
        self.status.decimal = true;

        0
    }

    #[inline]
    pub(super) fn set_interrupt_disable(&mut self, _bus: &mut SystemBus) -> u32 {
        self.status.interrupt_disable = true;

        0
    }

    #[inline]
    pub(super) fn store_accumulator(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_operand(bus, self.accumulator);

        0
    }

    #[inline]
    pub(super) fn store_x_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_operand(bus, self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn store_y_reg(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_operand(bus, self.y_index_reg);

        0
    }

    /// Binary subtraction only; the 2A03 has no decimal mode.
    #[inline]
    pub(super) fn subtract_with_carry(&mut self, bus: &mut SystemBus) -> u32 {
        let operand = self.read_operand(bus);
        self.add_to_accumulator(!operand);

        self.page_crossed as u32
    }

    #[inline]
    pub(super) fn transfer_accumulator_to_x(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.accumulator;

        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn transfer_accumulator_to_y(&mut self, _bus: &mut SystemBus) -> u32 {
        self.y_index_reg = self.accumulator;

        self.set_z_and_n_flag(self.y_index_reg);

        0
    }

    #[inline]
    pub(super) fn transfer_stack_pointer_to_x(&mut self, _bus: &mut SystemBus) -> u32 {
        self.x_index_reg = self.stack_pointer;

        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn transfer_x_to_accumulator(&mut self, _bus: &mut SystemBus) -> u32 {
        self.accumulator = self.x_index_reg;

        self.set_z_and_n_flag(self.accumulator);

        0
    }

    #[inline]
    pub(super) fn transfer_x_to_stack_pointer(&mut self, _bus: &mut SystemBus) -> u32 {
        self.stack_pointer = self.x_index_reg;

        0
    }

    #[inline]
    pub(super) fn transfer_y_to_accumulator(&mut self, _bus: &mut SystemBus) -> u32 {
        self.accumulator = self.y_index_reg;

        self.set_z_and_n_flag(self.accumulator);

        0
    }

    #[inline]
    pub(super) fn alr(&mut self, bus: &mut SystemBus) -> u32 {
        let anded = self.accumulator & self.read_operand(bus);
        self.accumulator = anded >> 1;

        self.status.carry = anded & 0x01 != 0;
        self.set_z_and_n_flag(self.accumulator);

        0
    }

    #[inline]
    pub(super) fn anc(&mut self, bus: &mut SystemBus) -> u32 {
        self.and_accumulator(bus);
        self.status.carry = self.status.negative;

        0
    }

    #[inline]
    pub(super) fn arr(&mut self, bus: &mut SystemBus) -> u32 {
        let anded = self.accumulator & self.read_operand(bus);
        self.accumulator = (anded >> 1) | ((self.status.carry as u8) << 7);

        self.status.carry = self.accumulator & 0x40 != 0;
        self.status.overflow = ((self.accumulator >> 6) ^ (self.accumulator >> 5)) & 0x01 != 0;
        self.set_z_and_n_flag(self.accumulator);

        0
    }

    #[inline]
    pub(super) fn dcp(&mut self, bus: &mut SystemBus) -> u32 {
        self.decrement_memory(bus);
        self.compare_accumulator(bus);

        0
    }

    #[inline]
    pub(super) fn isc(&mut self, bus: &mut SystemBus) -> u32 {
        self.increment_memory(bus);
        self.subtract_with_carry(bus);

        0
    }

    #[inline]
    pub(super) fn lax(&mut self, bus: &mut SystemBus) -> u32 {
        let extra = self.load_accumulator(bus);
        self.x_index_reg = self.accumulator;

        extra
    }

    #[inline]
    pub(super) fn rla(&mut self, bus: &mut SystemBus) -> u32 {
        self.rotate_left(bus);
        self.and_accumulator(bus);

        0
    }

    #[inline]
    pub(super) fn rra(&mut self, bus: &mut SystemBus) -> u32 {
        self.rotate_right(bus);
        self.add_with_carry(bus);

        0
    }

    #[inline]
    pub(super) fn sax(&mut self, bus: &mut SystemBus) -> u32 {
        self.write_operand(bus, self.accumulator & self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn sbx(&mut self, bus: &mut SystemBus) -> u32 {
        let masked = self.accumulator & self.x_index_reg;
        let data = self.read_operand(bus);
        self.x_index_reg = masked.wrapping_sub(data);

        self.status.carry = masked >= data;
        self.set_z_and_n_flag(self.x_index_reg);

        0
    }

    #[inline]
    pub(super) fn slo(&mut self, bus: &mut SystemBus) -> u32 {
        self.arithmetic_shift_left(bus);
        self.or_accumulator(bus);

        0
    }

    #[inline]
    pub(super) fn sre(&mut self, bus: &mut SystemBus) -> u32 {
        self.logical_shift_right(bus);
        self.exclusive_or_accumulator(bus);

        0
    }

    #[inline]
    pub(super) fn imp_addressing(&mut self, _bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IMP;

        self.set_operand_data(0);
    }

    #[inline]
    pub(super) fn acc_addressing(&mut self, _bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ACC;

        self.set_operand_data(self.accumulator);
    }

    #[inline]
    pub(super) fn imm_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IMM;
        let operand_data = self.operand_byte(bus);

        self.set_operand_data(operand_data);
    }

    #[inline]
    pub(super) fn zpg_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPG;
        let operand_addr = self.operand_byte(bus) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn zpx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPX;
        let operand_addr = self.operand_byte(bus).wrapping_add(self.x_index_reg) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn zpy_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ZPY;
        let operand_addr = self.operand_byte(bus).wrapping_add(self.y_index_reg) as u16;

        self.set_operand_addr(operand_addr);
    }

    #[inline]
    pub(super) fn rel_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::REL;
        let offset = self.operand_byte(bus) as i8;
        let target = self.program_counter.wrapping_add(offset as u16);

        self.set_operand_addr(target);
        self.page_crossed = (self.program_counter & 0xFF00) != (target & 0xFF00);
    }

    #[inline]
    pub(super) fn abs_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABS;
        let abs_address = self.operand_word(bus);

        self.set_operand_addr(abs_address);
    }

    #[inline]
    pub(super) fn abx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABX;
        let base = self.operand_word(bus);
        let addr = base.wrapping_add(self.x_index_reg as u16);

        self.set_operand_addr(addr);
        self.page_crossed = ((addr ^ base) & 0xFF00) != 0;
    }

    #[inline]
    pub(super) fn aby_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::ABY;
        let base = self.operand_word(bus);
        let addr = base.wrapping_add(self.y_index_reg as u16);

        self.set_operand_addr(addr);
        self.page_crossed = ((addr ^ base) & 0xFF00) != 0;
    }

    #[inline]
    pub(super) fn ind_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IND;
        let ptr = self.operand_word(bus);

        let lo = self.read_byte(bus, ptr) as u16;

        // the pointer's high byte never carries into the next page
        let hi = self.read_byte(bus, (ptr & 0xFF00) | (ptr.wrapping_add(1) & 0x00FF)) as u16;

        self.set_operand_addr((hi << 8) | lo);
    }

    #[inline]
    pub(super) fn izx_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IZX;
        let ptr = self.operand_byte(bus).wrapping_add(self.x_index_reg);
        let addr = self.read_zero_page_word(bus, ptr);

        self.set_operand_addr(addr);
    }

    #[inline]
    pub(super) fn izy_addressing(&mut self, bus: &mut SystemBus) {
        self.addr_mode = AddrMode::IZY;
        let ptr = self.operand_byte(bus);
        let base = self.read_zero_page_word(bus, ptr);
        let addr = base.wrapping_add(self.y_index_reg as u16);

        self.set_operand_addr(addr);
        self.page_crossed = ((addr ^ base) & 0xFF00) != 0;
    }

    #[inline]
    fn write_operand(&mut self, bus: &mut SystemBus, byte: u8) {
        match self.addr_mode {
            AddrMode::ACC | AddrMode::IMP => self.accumulator = byte,
            _ => self.write_byte(bus, self.operand_addr, byte),
        }
    }

    #[inline]
    fn read_operand(&self, bus: &mut SystemBus) -> u8 {
        match self.addr_mode {
            AddrMode::IMP | AddrMode::ACC | AddrMode::IMM => self.operand_data,
            _ => self.read_byte(bus, self.operand_addr),
        }
    }

    #[inline]
    fn set_operand_addr(&mut self, operand_addr: u16) {
        self.operand_addr = operand_addr;
        self.page_crossed = false;
    }

    #[inline]
    fn set_operand_data(&mut self, operand_data: u8) {
        self.operand_data = operand_data;
        self.page_crossed = false;
    }

    /// The one-byte operand of a two-byte instruction, which ends just before the program counter.
    #[inline]
    fn operand_byte(&self, bus: &mut SystemBus) -> u8 {
        self.read_byte(bus, self.program_counter.wrapping_sub(1))
    }

    /// The little-endian operand of a three-byte instruction.
    #[inline]
    fn operand_word(&self, bus: &mut SystemBus) -> u16 {
        let lo = self.read_byte(bus, self.program_counter.wrapping_sub(2)) as u16;
        let hi = self.read_byte(bus, self.program_counter.wrapping_sub(1)) as u16;

        (hi << 8) | lo
    }

    #[inline]
    fn read_zero_page_word(&self, bus: &mut SystemBus, ptr: u8) -> u16 {
        let lo = self.read_byte(bus, ptr as u16) as u16;
        let hi = self.read_byte(bus, ptr.wrapping_add(1) as u16) as u16;

        (hi << 8) | lo
    }

    #[inline]
    fn read_word(&self, bus: &mut SystemBus, addr: u16) -> u16 {
        let lo = self.read_byte(bus, addr) as u16;
        let hi = self.read_byte(bus, addr.wrapping_add(1)) as u16;

        (hi << 8) | lo
    }

    #[inline]
    fn push_word_to_stack(&mut self, bus: &mut SystemBus, word: u16) {
        self.push_byte_to_stack(bus, (word >> 8) as u8);
        self.push_byte_to_stack(bus, word as u8);
    }

    #[inline]
    fn pop_word_from_stack(&mut self, bus: &mut SystemBus) -> u16 {
        let lo = self.pop_byte_from_stack(bus) as u16;
        let hi = self.pop_byte_from_stack(bus) as u16;
        (hi << 8) | lo
    }

    #[inline]
    fn push_byte_to_stack(&mut self, bus: &mut SystemBus, byte: u8) {
        self.write_byte(bus, STACK_START | self.stack_pointer as u16, byte);
        self.stack_pointer = self.stack_pointer.wrapping_sub(1);
    }

    #[inline]
    fn pop_byte_from_stack(&mut self, bus: &mut SystemBus) -> u8 {
        self.stack_pointer = self.stack_pointer.wrapping_add(1);
        self.read_byte(bus, STACK_START | self.stack_pointer as u16)
    }

    #[inline]
    fn set_z_and_n_flag(&mut self, byte: u8) {
        self.status.zero = byte == 0;
        self.status.negative = byte & 0b10000000 != 0;
    }

    fn read_byte(&self, bus: &mut SystemBus, addr: u16) -> u8 {
        bus.cpu_read(addr)
    }

    fn write_byte(&mut self, bus: &mut SystemBus, addr: u16, byte: u8) {
        bus.cpu_write(addr, byte);
    }
}
