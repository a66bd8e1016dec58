use bitflags::bitflags;

bitflags! {
    /// The flags register. Bits 0..=3 always read zero.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Flags: u8 {
        const CARRY      = 0b0001_0000;
        const HALF_CARRY = 0b0010_0000;
        const SUBTRACT   = 0b0100_0000;
        const ZERO       = 0b1000_0000;
    }
}

/// The eight-bit register file plus SP/PC.
///
/// Pair accessors expose BC/DE/HL/AF as the 16-bit values the instruction
/// set operates on; AF writes mask the undefined low flag bits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: Flags,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    /// Post-boot state, as the boot ROM leaves it.
    pub fn new() -> Self {
        Self {
            a: 0x01,
            f: Flags::from_bits_truncate(0xB0),
            b: 0x00,
            c: 0x13,
            d: 0x00,
            e: 0xD8,
            h: 0x01,
            l: 0x4D,
            sp: 0xFFFE,
            pc: 0x0100,
        }
    }

    pub fn af(&self) -> u16 {
        u16::from_be_bytes([self.a, self.f.bits()])
    }

    pub fn set_af(&mut self, value: u16) {
        let [a, f] = value.to_be_bytes();
        self.a = a;
        self.f = Flags::from_bits_truncate(f);
    }

    pub fn bc(&self) -> u16 {
        u16::from_be_bytes([self.b, self.c])
    }

    pub fn set_bc(&mut self, value: u16) {
        [self.b, self.c] = value.to_be_bytes();
    }

    pub fn de(&self) -> u16 {
        u16::from_be_bytes([self.d, self.e])
    }

    pub fn set_de(&mut self, value: u16) {
        [self.d, self.e] = value.to_be_bytes();
    }

    pub fn hl(&self) -> u16 {
        u16::from_be_bytes([self.h, self.l])
    }

    pub fn set_hl(&mut self, value: u16) {
        [self.h, self.l] = value.to_be_bytes();
    }

    pub fn set_flag(&mut self, flag: Flags, value: bool) {
        self.f.set(flag, value);
    }

    pub fn flag(&self, flag: Flags) -> bool {
        self.f.contains(flag)
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Condition codes used by conditional jumps, calls, and returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Condition {
    NotZero,
    Zero,
    NotCarry,
    Carry,
}

impl Condition {
    /// Decodes bits 3..=4 of the conditional opcode groups.
    pub fn decode(bits: u8) -> Self {
        match bits & 0b11 {
            0 => Self::NotZero,
            1 => Self::Zero,
            2 => Self::NotCarry,
            _ => Self::Carry,
        }
    }

    pub fn holds(self, registers: &Registers) -> bool {
        match self {
            Self::NotZero => !registers.flag(Flags::ZERO),
            Self::Zero => registers.flag(Flags::ZERO),
            Self::NotCarry => !registers.flag(Flags::CARRY),
            Self::Carry => registers.flag(Flags::CARRY),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn post_boot_values() {
        let registers = Registers::new();
        assert_eq!(registers.af(), 0x01B0);
        assert_eq!(registers.bc(), 0x0013);
        assert_eq!(registers.de(), 0x00D8);
        assert_eq!(registers.hl(), 0x014D);
        assert_eq!(registers.sp, 0xFFFE);
        assert_eq!(registers.pc, 0x0100);
    }

    #[test]
    fn af_write_masks_low_flag_bits() {
        let mut registers = Registers::new();
        registers.set_af(0x12FF);
        assert_eq!(registers.a, 0x12);
        assert_eq!(registers.f.bits(), 0xF0);
        assert_eq!(registers.af(), 0x12F0);
    }

    #[test]
    fn conditions_follow_flags() {
        let mut registers = Registers::new();
        registers.set_flag(Flags::ZERO, true);
        registers.set_flag(Flags::CARRY, false);
        assert!(Condition::Zero.holds(&registers));
        assert!(!Condition::NotZero.holds(&registers));
        assert!(Condition::NotCarry.holds(&registers));
        assert!(!Condition::Carry.holds(&registers));
    }
}
