use super::registers::Flags;

/// Result of an 8-bit ALU operation and the flags it leaves behind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AluResult {
    pub value: u8,
    pub flags: Flags,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shift {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Srl,
    Swap,
}

pub fn add8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = carry as u8;
    let sum = a as u16 + b as u16 + c as u16;
    let value = sum as u8;

    AluResult {
        value,
        flags: Flags {
            zero: value == 0,
            subtract: false,
            half_carry: (a & 0x0F) + (b & 0x0F) + c > 0x0F,
            carry: sum > 0xFF,
        },
    }
}

pub fn sub8(a: u8, b: u8, carry: bool) -> AluResult {
    let c = carry as u8;
    let value = a.wrapping_sub(b).wrapping_sub(c);

    AluResult {
        value,
        flags: Flags {
            zero: value == 0,
            subtract: true,
            half_carry: (a & 0x0F) < (b & 0x0F) + c,
            carry: (a as u16) < b as u16 + c as u16,
        },
    }
}

pub fn and8(a: u8, b: u8) -> AluResult {
    let value = a & b;
    AluResult { value, flags: Flags { zero: value == 0, subtract: false, half_carry: true, carry: false } }
}

pub fn or8(a: u8, b: u8) -> AluResult {
    let value = a | b;
    AluResult { value, flags: Flags { zero: value == 0, ..Flags::default() } }
}

pub fn xor8(a: u8, b: u8) -> AluResult {
    let value = a ^ b;
    AluResult { value, flags: Flags { zero: value == 0, ..Flags::default() } }
}

/// INC leaves the carry flag alone.
pub fn inc8(v: u8, flags: Flags) -> AluResult {
    let value = v.wrapping_add(1);
    AluResult {
        value,
        flags: Flags { zero: value == 0, subtract: false, half_carry: (v & 0x0F) == 0x0F, carry: flags.carry },
    }
}

/// DEC leaves the carry flag alone.
pub fn dec8(v: u8, flags: Flags) -> AluResult {
    let value = v.wrapping_sub(1);
    AluResult {
        value,
        flags: Flags { zero: value == 0, subtract: true, half_carry: (v & 0x0F) == 0x00, carry: flags.carry },
    }
}

/// ADD HL,rr. Half carry comes out of bit 11, carry out of bit 15; Z is untouched.
pub fn add16(hl: u16, rr: u16, flags: Flags) -> (u16, Flags) {
    let sum = hl as u32 + rr as u32;
    (sum as u16, Flags {
        zero: flags.zero,
        subtract: false,
        half_carry: (hl & 0x0FFF) + (rr & 0x0FFF) > 0x0FFF,
        carry: sum > 0xFFFF,
    })
}

/// SP plus a signed offset, as used by ADD SP,e and LD HL,SP+e. Flags come from the
/// unsigned addition of the low byte.
pub fn add_sp_offset(sp: u16, offset: i8) -> (u16, Flags) {
    let e = offset as u8;
    (sp.wrapping_add(offset as i16 as u16), Flags {
        zero: false,
        subtract: false,
        half_carry: (sp & 0x000F) + (e as u16 & 0x000F) > 0x000F,
        carry: (sp & 0x00FF) + e as u16 > 0x00FF,
    })
}

pub fn daa(a: u8, flags: Flags) -> AluResult {
    let mut value = a;
    let mut carry = flags.carry;

    if !flags.subtract {
        if flags.carry || value > 0x99 {
            value = value.wrapping_add(0x60);
            carry = true;
        }
        if flags.half_carry || (value & 0x0F) > 0x09 {
            value = value.wrapping_add(0x06);
        }
    } else {
        if flags.carry {
            value = value.wrapping_sub(0x60);
        }
        if flags.half_carry {
            value = value.wrapping_sub(0x06);
        }
    }

    AluResult {
        value,
        flags: Flags { zero: value == 0, subtract: flags.subtract, half_carry: false, carry },
    }
}

/// The CB-page shifts and rotates. Z reflects the result; the accumulator-only
/// forms (RLCA and friends) clear it afterwards.
pub fn shift(op: Shift, v: u8, carry_in: bool) -> AluResult {
    let (value, carry) = match op {
        Shift::Rlc => (v.rotate_left(1), v & 0x80 != 0),
        Shift::Rrc => (v.rotate_right(1), v & 0x01 != 0),
        Shift::Rl => (v << 1 | carry_in as u8, v & 0x80 != 0),
        Shift::Rr => (v >> 1 | (carry_in as u8) << 7, v & 0x01 != 0),
        Shift::Sla => (v << 1, v & 0x80 != 0),
        Shift::Sra => (v >> 1 | (v & 0x80), v & 0x01 != 0),
        Shift::Srl => (v >> 1, v & 0x01 != 0),
        Shift::Swap => (v.rotate_left(4), false),
    };

    AluResult { value, flags: Flags { zero: value == 0, subtract: false, half_carry: false, carry } }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn flags(zero: bool, subtract: bool, half_carry: bool, carry: bool) -> Flags {
        Flags { zero, subtract, half_carry, carry }
    }

    #[test]
    fn test_adc_golden_vectors() {
        assert_eq!(add8(0x3F, 0x40, true), AluResult { value: 0x80, flags: flags(false, false, true, false) });
        assert_eq!(add8(0xFF, 0x01, false), AluResult { value: 0x00, flags: flags(true, false, true, true) });
        assert_eq!(add8(0xF0, 0xF0, false), AluResult { value: 0xE0, flags: flags(false, false, false, true) });
        assert_eq!(add8(0x0E, 0x01, true), AluResult { value: 0x10, flags: flags(false, false, true, false) });
        assert_eq!(add8(0xFF, 0xFF, true), AluResult { value: 0xFF, flags: flags(false, false, true, true) });
    }

    #[test]
    fn test_sbc_golden_vectors() {
        assert_eq!(sub8(0x3E, 0x3E, false), AluResult { value: 0x00, flags: flags(true, true, false, false) });
        assert_eq!(sub8(0x3E, 0x0F, false), AluResult { value: 0x2F, flags: flags(false, true, true, false) });
        assert_eq!(sub8(0x3E, 0x40, false), AluResult { value: 0xFE, flags: flags(false, true, false, true) });
        assert_eq!(sub8(0x3B, 0x2A, true), AluResult { value: 0x10, flags: flags(false, true, false, false) });
        assert_eq!(sub8(0x00, 0x00, true), AluResult { value: 0xFF, flags: flags(false, true, true, true) });
    }

    #[test]
    fn test_inc_dec_keep_carry() {
        let carry_set = flags(false, false, false, true);
        assert_eq!(inc8(0x0F, carry_set), AluResult { value: 0x10, flags: flags(false, false, true, true) });
        assert_eq!(inc8(0xFF, Flags::default()), AluResult { value: 0x00, flags: flags(true, false, true, false) });
        assert_eq!(dec8(0x10, carry_set), AluResult { value: 0x0F, flags: flags(false, true, true, true) });
        assert_eq!(dec8(0x01, Flags::default()), AluResult { value: 0x00, flags: flags(true, true, false, false) });
    }

    #[test]
    fn test_daa() {
        // 0x15 + 0x27 = 0x3C, adjusted to BCD 42
        let sum = add8(0x15, 0x27, false);
        assert_eq!(daa(sum.value, sum.flags).value, 0x42);

        // 0x99 + 0x01 = 0x9A, adjusted to 00 with carry
        let sum = add8(0x99, 0x01, false);
        let adjusted = daa(sum.value, sum.flags);
        assert_eq!(adjusted, AluResult { value: 0x00, flags: flags(true, false, false, true) });

        // 0x42 - 0x15 = 0x2D, adjusted to BCD 27
        let diff = sub8(0x42, 0x15, false);
        let adjusted = daa(diff.value, diff.flags);
        assert_eq!(adjusted.value, 0x27);
        assert!(adjusted.flags.subtract);
    }

    #[test]
    fn test_add16_and_sp_offset() {
        let (value, f) = add16(0x0FFF, 0x0001, flags(true, true, false, false));
        assert_eq!(value, 0x1000);
        assert_eq!(f, flags(true, false, true, false));

        let (value, f) = add16(0xFFFF, 0x0001, Flags::default());
        assert_eq!(value, 0x0000);
        assert_eq!(f, flags(false, false, true, true));

        let (value, f) = add_sp_offset(0xFFF8, 0x08);
        assert_eq!(value, 0x0000);
        assert_eq!(f, flags(false, false, true, true));

        let (value, f) = add_sp_offset(0x0005, -1);
        assert_eq!(value, 0x0004);
        assert_eq!(f, flags(false, false, true, true));
    }

    #[test]
    fn test_shifts() {
        assert_eq!(shift(Shift::Rlc, 0x85, false), AluResult { value: 0x0B, flags: flags(false, false, false, true) });
        assert_eq!(shift(Shift::Rr, 0x01, false), AluResult { value: 0x00, flags: flags(true, false, false, true) });
        assert_eq!(shift(Shift::Rl, 0x80, true), AluResult { value: 0x01, flags: flags(false, false, false, true) });
        assert_eq!(shift(Shift::Sra, 0x81, false).value, 0xC0);
        assert_eq!(shift(Shift::Srl, 0x81, false).value, 0x40);
        assert_eq!(shift(Shift::Swap, 0xF1, true), AluResult { value: 0x1F, flags: flags(false, false, false, false) });
    }
}
