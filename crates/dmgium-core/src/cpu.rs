//! SM83 processor core.
//!
//! The core steps one dot at a time but works in machine cycles internally:
//! executing an instruction returns its length in M-cycles and the core then
//! idles for `cycles * 4 - 1` dots before fetching again. Interrupt dispatch,
//! the delayed effect of EI, and the HALT fetch bug are all modeled at the
//! instruction boundary, which is where real software can observe them.

use crate::bus::Bus;
use crate::error::Error;
use crate::memory::io;

pub mod registers;

pub use registers::{Condition, Flags, Registers};

/// Dots per machine cycle.
const DOTS_PER_M_CYCLE: u8 = 4;
/// M-cycles consumed by an interrupt dispatch.
const DISPATCH_CYCLES: u8 = 5;
/// Register index encoding `(HL)` in the 3-bit operand fields.
const MEM_HL: u8 = 6;

#[derive(Debug)]
pub struct Cpu {
    registers: Registers,
    /// Dots left before the next instruction boundary.
    wait_ticks: u8,
    ime: bool,
    /// Set by EI; promoted to `ime` after the following instruction.
    ime_pending: bool,
    halted: bool,
    /// One-shot: the next opcode fetch does not advance PC.
    halt_bug: bool,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            registers: Registers::new(),
            wait_ticks: 0,
            ime: false,
            ime_pending: false,
            halted: false,
            halt_bug: false,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn registers(&self) -> &Registers {
        &self.registers
    }

    pub fn halted(&self) -> bool {
        self.halted
    }

    pub fn interrupts_enabled(&self) -> bool {
        self.ime
    }

    /// Advances the core by one dot.
    pub fn tick(&mut self, bus: &mut Bus) -> Result<(), Error> {
        if self.wait_ticks > 0 {
            self.wait_ticks -= 1;
            return Ok(());
        }
        let cycles = self.step(bus)?;
        self.wait_ticks = cycles * DOTS_PER_M_CYCLE - 1;
        Ok(())
    }

    /// Runs one instruction boundary: wake from HALT, dispatch a pending
    /// interrupt, or execute the next instruction. Returns M-cycles spent.
    fn step(&mut self, bus: &mut Bus) -> Result<u8, Error> {
        if self.halted {
            // Any requested-and-enabled interrupt wakes the core, with or
            // without IME.
            if bus.interrupts().pending() != 0 {
                self.halted = false;
            } else {
                return Ok(1);
            }
        }

        if let Some(cycles) = self.service_interrupt(bus) {
            return Ok(cycles);
        }

        let promote_ime = self.ime_pending;
        let cycles = self.execute(bus)?;
        // EI takes effect after the instruction that follows it; DI in that
        // slot cancels the pending enable.
        if promote_ime && self.ime_pending {
            self.ime = true;
            self.ime_pending = false;
        }
        Ok(cycles)
    }

    fn service_interrupt(&mut self, bus: &mut Bus) -> Option<u8> {
        if !self.ime {
            return None;
        }
        let interrupt = bus.interrupts().next_pending()?;
        self.ime = false;
        self.ime_pending = false;
        bus.interrupts().acknowledge(interrupt);
        self.push_word(bus, self.registers.pc);
        self.registers.pc = interrupt.vector();
        Some(DISPATCH_CYCLES)
    }

    fn fetch(&mut self, bus: &mut Bus) -> u8 {
        let byte = bus.read(self.registers.pc);
        if self.halt_bug {
            self.halt_bug = false;
        } else {
            self.registers.pc = self.registers.pc.wrapping_add(1);
        }
        byte
    }

    fn fetch_word(&mut self, bus: &mut Bus) -> u16 {
        let low = self.fetch(bus);
        let high = self.fetch(bus);
        u16::from_le_bytes([low, high])
    }

    fn push_word(&mut self, bus: &mut Bus, value: u16) {
        let [high, low] = value.to_be_bytes();
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        bus.write(self.registers.sp, high);
        self.registers.sp = self.registers.sp.wrapping_sub(1);
        bus.write(self.registers.sp, low);
    }

    fn pop_word(&mut self, bus: &mut Bus) -> u16 {
        let low = bus.read(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(1);
        let high = bus.read(self.registers.sp);
        self.registers.sp = self.registers.sp.wrapping_add(1);
        u16::from_be_bytes([high, low])
    }

    /// Reads the 3-bit-encoded operand: B C D E H L (HL) A.
    fn read_r8(&mut self, bus: &mut Bus, code: u8) -> u8 {
        match code {
            0 => self.registers.b,
            1 => self.registers.c,
            2 => self.registers.d,
            3 => self.registers.e,
            4 => self.registers.h,
            5 => self.registers.l,
            MEM_HL => bus.read(self.registers.hl()),
            _ => self.registers.a,
        }
    }

    fn write_r8(&mut self, bus: &mut Bus, code: u8, value: u8) {
        match code {
            0 => self.registers.b = value,
            1 => self.registers.c = value,
            2 => self.registers.d = value,
            3 => self.registers.e = value,
            4 => self.registers.h = value,
            5 => self.registers.l = value,
            MEM_HL => bus.write(self.registers.hl(), value),
            _ => self.registers.a = value,
        }
    }

    /// Reads the 2-bit-encoded pair from the BC DE HL SP group.
    fn read_rr(&self, code: u8) -> u16 {
        match code & 0b11 {
            0 => self.registers.bc(),
            1 => self.registers.de(),
            2 => self.registers.hl(),
            _ => self.registers.sp,
        }
    }

    fn write_rr(&mut self, code: u8, value: u16) {
        match code & 0b11 {
            0 => self.registers.set_bc(value),
            1 => self.registers.set_de(value),
            2 => self.registers.set_hl(value),
            _ => self.registers.sp = value,
        }
    }

    fn execute(&mut self, bus: &mut Bus) -> Result<u8, Error> {
        let pc = self.registers.pc;
        let opcode = self.fetch(bus);

        let cycles = match opcode {
            0x00 => 1, // NOP

            // LD rr, d16
            0x01 | 0x11 | 0x21 | 0x31 => {
                let value = self.fetch_word(bus);
                self.write_rr(opcode >> 4, value);
                3
            }

            // LD (rr), A and LD A, (rr), with the HL post-inc/dec forms
            0x02 => {
                bus.write(self.registers.bc(), self.registers.a);
                2
            }
            0x12 => {
                bus.write(self.registers.de(), self.registers.a);
                2
            }
            0x22 => {
                let hl = self.registers.hl();
                bus.write(hl, self.registers.a);
                self.registers.set_hl(hl.wrapping_add(1));
                2
            }
            0x32 => {
                let hl = self.registers.hl();
                bus.write(hl, self.registers.a);
                self.registers.set_hl(hl.wrapping_sub(1));
                2
            }
            0x0A => {
                self.registers.a = bus.read(self.registers.bc());
                2
            }
            0x1A => {
                self.registers.a = bus.read(self.registers.de());
                2
            }
            0x2A => {
                let hl = self.registers.hl();
                self.registers.a = bus.read(hl);
                self.registers.set_hl(hl.wrapping_add(1));
                2
            }
            0x3A => {
                let hl = self.registers.hl();
                self.registers.a = bus.read(hl);
                self.registers.set_hl(hl.wrapping_sub(1));
                2
            }

            // INC rr / DEC rr; no flags
            0x03 | 0x13 | 0x23 | 0x33 => {
                let code = opcode >> 4;
                self.write_rr(code, self.read_rr(code).wrapping_add(1));
                2
            }
            0x0B | 0x1B | 0x2B | 0x3B => {
                let code = opcode >> 4;
                self.write_rr(code, self.read_rr(code).wrapping_sub(1));
                2
            }

            // INC r / DEC r
            0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => {
                let target = (opcode >> 3) & 0b111;
                let value = self.read_r8(bus, target);
                let result = self.inc8(value);
                self.write_r8(bus, target, result);
                if target == MEM_HL { 3 } else { 1 }
            }
            0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => {
                let target = (opcode >> 3) & 0b111;
                let value = self.read_r8(bus, target);
                let result = self.dec8(value);
                self.write_r8(bus, target, result);
                if target == MEM_HL { 3 } else { 1 }
            }

            // LD r, d8
            0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => {
                let target = (opcode >> 3) & 0b111;
                let value = self.fetch(bus);
                self.write_r8(bus, target, value);
                if target == MEM_HL { 3 } else { 2 }
            }

            // Accumulator rotates; Z is always cleared
            0x07 => {
                self.registers.a = self.rlc(self.registers.a);
                self.registers.set_flag(Flags::ZERO, false);
                1
            }
            0x0F => {
                self.registers.a = self.rrc(self.registers.a);
                self.registers.set_flag(Flags::ZERO, false);
                1
            }
            0x17 => {
                self.registers.a = self.rl(self.registers.a);
                self.registers.set_flag(Flags::ZERO, false);
                1
            }
            0x1F => {
                self.registers.a = self.rr(self.registers.a);
                self.registers.set_flag(Flags::ZERO, false);
                1
            }

            // LD (a16), SP
            0x08 => {
                let address = self.fetch_word(bus);
                let [high, low] = self.registers.sp.to_be_bytes();
                bus.write(address, low);
                bus.write(address.wrapping_add(1), high);
                5
            }

            // ADD HL, rr
            0x09 | 0x19 | 0x29 | 0x39 => {
                self.add_hl(self.read_rr(opcode >> 4));
                2
            }

            // STOP: swallow the padding byte, clear the divider
            0x10 => {
                self.fetch(bus);
                bus.write_address(io::DIV, 0, true);
                1
            }

            // JR r8 / JR cc, r8
            0x18 => {
                let offset = self.fetch(bus) as i8;
                self.registers.pc = self.registers.pc.wrapping_add_signed(offset.into());
                3
            }
            0x20 | 0x28 | 0x30 | 0x38 => {
                let offset = self.fetch(bus) as i8;
                if Condition::decode(opcode >> 3).holds(&self.registers) {
                    self.registers.pc = self.registers.pc.wrapping_add_signed(offset.into());
                    3
                } else {
                    2
                }
            }

            0x27 => {
                self.daa();
                1
            }
            0x2F => {
                self.registers.a = !self.registers.a;
                self.registers.set_flag(Flags::SUBTRACT, true);
                self.registers.set_flag(Flags::HALF_CARRY, true);
                1
            }
            0x37 => {
                self.registers.set_flag(Flags::SUBTRACT, false);
                self.registers.set_flag(Flags::HALF_CARRY, false);
                self.registers.set_flag(Flags::CARRY, true);
                1
            }
            0x3F => {
                let carry = self.registers.flag(Flags::CARRY);
                self.registers.set_flag(Flags::SUBTRACT, false);
                self.registers.set_flag(Flags::HALF_CARRY, false);
                self.registers.set_flag(Flags::CARRY, !carry);
                1
            }

            0x76 => {
                // HALT with IME clear and a pending interrupt does not halt;
                // instead the next opcode fetch fails to advance PC.
                if !self.ime && bus.interrupts().pending() != 0 {
                    self.halt_bug = true;
                } else {
                    self.halted = true;
                }
                1
            }

            // LD r, r
            0x40..=0x7F => {
                let src = opcode & 0b111;
                let dst = (opcode >> 3) & 0b111;
                let value = self.read_r8(bus, src);
                self.write_r8(bus, dst, value);
                if src == MEM_HL || dst == MEM_HL { 2 } else { 1 }
            }

            // ALU A, r
            0x80..=0xBF => {
                let src = opcode & 0b111;
                let value = self.read_r8(bus, src);
                self.alu((opcode >> 3) & 0b111, value);
                if src == MEM_HL { 2 } else { 1 }
            }

            // ALU A, d8
            0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => {
                let value = self.fetch(bus);
                self.alu((opcode >> 3) & 0b111, value);
                2
            }

            // RET cc / RET / RETI
            0xC0 | 0xC8 | 0xD0 | 0xD8 => {
                if Condition::decode(opcode >> 3).holds(&self.registers) {
                    self.registers.pc = self.pop_word(bus);
                    5
                } else {
                    2
                }
            }
            0xC9 => {
                self.registers.pc = self.pop_word(bus);
                4
            }
            0xD9 => {
                // RETI enables interrupts without the EI delay.
                self.registers.pc = self.pop_word(bus);
                self.ime = true;
                4
            }

            // POP rr / PUSH rr (the pair group here ends in AF, not SP)
            0xC1 | 0xD1 | 0xE1 => {
                let value = self.pop_word(bus);
                self.write_rr(opcode >> 4, value);
                3
            }
            0xF1 => {
                let value = self.pop_word(bus);
                self.registers.set_af(value);
                3
            }
            0xC5 | 0xD5 | 0xE5 => {
                self.push_word(bus, self.read_rr(opcode >> 4));
                4
            }
            0xF5 => {
                self.push_word(bus, self.registers.af());
                4
            }

            // JP cc / JP / JP HL
            0xC2 | 0xCA | 0xD2 | 0xDA => {
                let target = self.fetch_word(bus);
                if Condition::decode(opcode >> 3).holds(&self.registers) {
                    self.registers.pc = target;
                    4
                } else {
                    3
                }
            }
            0xC3 => {
                self.registers.pc = self.fetch_word(bus);
                4
            }
            0xE9 => {
                self.registers.pc = self.registers.hl();
                1
            }

            // CALL cc / CALL
            0xC4 | 0xCC | 0xD4 | 0xDC => {
                let target = self.fetch_word(bus);
                if Condition::decode(opcode >> 3).holds(&self.registers) {
                    self.push_word(bus, self.registers.pc);
                    self.registers.pc = target;
                    6
                } else {
                    3
                }
            }
            0xCD => {
                let target = self.fetch_word(bus);
                self.push_word(bus, self.registers.pc);
                self.registers.pc = target;
                6
            }

            // RST
            0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => {
                self.push_word(bus, self.registers.pc);
                self.registers.pc = u16::from(opcode & 0x38);
                4
            }

            0xCB => self.execute_extended(bus),

            // LDH / LD (C)
            0xE0 => {
                let offset = self.fetch(bus);
                bus.write(0xFF00 | u16::from(offset), self.registers.a);
                3
            }
            0xF0 => {
                let offset = self.fetch(bus);
                self.registers.a = bus.read(0xFF00 | u16::from(offset));
                3
            }
            0xE2 => {
                bus.write(0xFF00 | u16::from(self.registers.c), self.registers.a);
                2
            }
            0xF2 => {
                self.registers.a = bus.read(0xFF00 | u16::from(self.registers.c));
                2
            }

            // LD (a16), A / LD A, (a16)
            0xEA => {
                let address = self.fetch_word(bus);
                bus.write(address, self.registers.a);
                4
            }
            0xFA => {
                let address = self.fetch_word(bus);
                self.registers.a = bus.read(address);
                4
            }

            // Signed SP arithmetic
            0xE8 => {
                let offset = self.fetch(bus);
                self.registers.sp = self.add_signed(self.registers.sp, offset);
                4
            }
            0xF8 => {
                let offset = self.fetch(bus);
                let result = self.add_signed(self.registers.sp, offset);
                self.registers.set_hl(result);
                3
            }
            0xF9 => {
                self.registers.sp = self.registers.hl();
                2
            }

            0xF3 => {
                self.ime = false;
                self.ime_pending = false;
                1
            }
            0xFB => {
                self.ime_pending = true;
                1
            }

            0xD3 | 0xDB | 0xDD | 0xE3 | 0xE4 | 0xEB | 0xEC | 0xED | 0xF4 | 0xFC | 0xFD => {
                return Err(Error::UnknownOpcode { opcode, pc });
            }
        };
        Ok(cycles)
    }

    /// The 0xCB-prefixed rotate/shift/bit block; all 256 encodings are valid.
    fn execute_extended(&mut self, bus: &mut Bus) -> u8 {
        let opcode = self.fetch(bus);
        let target = opcode & 0b111;
        let bit = (opcode >> 3) & 0b111;

        match opcode >> 6 {
            0 => {
                let value = self.read_r8(bus, target);
                let result = match bit {
                    0 => self.rlc(value),
                    1 => self.rrc(value),
                    2 => self.rl(value),
                    3 => self.rr(value),
                    4 => self.sla(value),
                    5 => self.sra(value),
                    6 => self.swap(value),
                    _ => self.srl(value),
                };
                self.write_r8(bus, target, result);
                if target == MEM_HL { 4 } else { 2 }
            }
            1 => {
                let value = self.read_r8(bus, target);
                self.registers.set_flag(Flags::ZERO, value & (1 << bit) == 0);
                self.registers.set_flag(Flags::SUBTRACT, false);
                self.registers.set_flag(Flags::HALF_CARRY, true);
                if target == MEM_HL { 3 } else { 2 }
            }
            2 => {
                let value = self.read_r8(bus, target);
                self.write_r8(bus, target, value & !(1 << bit));
                if target == MEM_HL { 4 } else { 2 }
            }
            _ => {
                let value = self.read_r8(bus, target);
                self.write_r8(bus, target, value | (1 << bit));
                if target == MEM_HL { 4 } else { 2 }
            }
        }
    }

    /// Dispatches the 3-bit ALU group: ADD ADC SUB SBC AND XOR OR CP.
    fn alu(&mut self, op: u8, value: u8) {
        match op {
            0 => self.add_a(value, false),
            1 => self.add_a(value, true),
            2 => self.sub_a(value, false, true),
            3 => self.sub_a(value, true, true),
            4 => {
                self.registers.a &= value;
                self.logic_flags(true);
            }
            5 => {
                self.registers.a ^= value;
                self.logic_flags(false);
            }
            6 => {
                self.registers.a |= value;
                self.logic_flags(false);
            }
            _ => self.sub_a(value, false, false),
        }
    }

    fn logic_flags(&mut self, half_carry: bool) {
        self.registers.set_flag(Flags::ZERO, self.registers.a == 0);
        self.registers.set_flag(Flags::SUBTRACT, false);
        self.registers.set_flag(Flags::HALF_CARRY, half_carry);
        self.registers.set_flag(Flags::CARRY, false);
    }

    fn add_a(&mut self, value: u8, with_carry: bool) {
        let a = self.registers.a;
        let carry = u8::from(with_carry && self.registers.flag(Flags::CARRY));
        let result = a.wrapping_add(value).wrapping_add(carry);
        self.registers.set_flag(Flags::ZERO, result == 0);
        self.registers.set_flag(Flags::SUBTRACT, false);
        self.registers
            .set_flag(Flags::HALF_CARRY, (a & 0x0F) + (value & 0x0F) + carry > 0x0F);
        self.registers.set_flag(
            Flags::CARRY,
            u16::from(a) + u16::from(value) + u16::from(carry) > 0xFF,
        );
        self.registers.a = result;
    }

    fn sub_a(&mut self, value: u8, with_carry: bool, store: bool) {
        let a = self.registers.a;
        let carry = u8::from(with_carry && self.registers.flag(Flags::CARRY));
        let result = a.wrapping_sub(value).wrapping_sub(carry);
        self.registers.set_flag(Flags::ZERO, result == 0);
        self.registers.set_flag(Flags::SUBTRACT, true);
        self.registers.set_flag(
            Flags::HALF_CARRY,
            u16::from(a & 0x0F) < u16::from(value & 0x0F) + u16::from(carry),
        );
        self.registers.set_flag(
            Flags::CARRY,
            u16::from(a) < u16::from(value) + u16::from(carry),
        );
        if store {
            self.registers.a = result;
        }
    }

    fn inc8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_add(1);
        self.registers.set_flag(Flags::ZERO, result == 0);
        self.registers.set_flag(Flags::SUBTRACT, false);
        self.registers.set_flag(Flags::HALF_CARRY, value & 0x0F == 0x0F);
        result
    }

    fn dec8(&mut self, value: u8) -> u8 {
        let result = value.wrapping_sub(1);
        self.registers.set_flag(Flags::ZERO, result == 0);
        self.registers.set_flag(Flags::SUBTRACT, true);
        self.registers.set_flag(Flags::HALF_CARRY, value & 0x0F == 0);
        result
    }

    fn add_hl(&mut self, value: u16) {
        let hl = self.registers.hl();
        self.registers.set_flag(Flags::SUBTRACT, false);
        self.registers
            .set_flag(Flags::HALF_CARRY, (hl & 0x0FFF) + (value & 0x0FFF) > 0x0FFF);
        self.registers
            .set_flag(Flags::CARRY, u32::from(hl) + u32::from(value) > 0xFFFF);
        self.registers.set_hl(hl.wrapping_add(value));
    }

    /// SP plus a signed byte; flags come from the unsigned low-byte adds.
    fn add_signed(&mut self, base: u16, offset: u8) -> u16 {
        self.registers.set_flag(Flags::ZERO, false);
        self.registers.set_flag(Flags::SUBTRACT, false);
        self.registers
            .set_flag(Flags::HALF_CARRY, (base & 0x0F) + u16::from(offset & 0x0F) > 0x0F);
        self.registers
            .set_flag(Flags::CARRY, (base & 0xFF) + u16::from(offset) > 0xFF);
        base.wrapping_add_signed(i16::from(offset as i8))
    }

    fn daa(&mut self) {
        let mut a = self.registers.a;
        let mut carry = self.registers.flag(Flags::CARRY);
        if self.registers.flag(Flags::SUBTRACT) {
            if carry {
                a = a.wrapping_sub(0x60);
            }
            if self.registers.flag(Flags::HALF_CARRY) {
                a = a.wrapping_sub(0x06);
            }
        } else {
            if carry || a > 0x99 {
                a = a.wrapping_add(0x60);
                carry = true;
            }
            if self.registers.flag(Flags::HALF_CARRY) || a & 0x0F > 0x09 {
                a = a.wrapping_add(0x06);
            }
        }
        self.registers.a = a;
        self.registers.set_flag(Flags::ZERO, a == 0);
        self.registers.set_flag(Flags::HALF_CARRY, false);
        self.registers.set_flag(Flags::CARRY, carry);
    }

    fn rotate_flags(&mut self, result: u8, carry: bool) {
        self.registers.set_flag(Flags::ZERO, result == 0);
        self.registers.set_flag(Flags::SUBTRACT, false);
        self.registers.set_flag(Flags::HALF_CARRY, false);
        self.registers.set_flag(Flags::CARRY, carry);
    }

    fn rlc(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(1);
        self.rotate_flags(result, value & 0x80 != 0);
        result
    }

    fn rrc(&mut self, value: u8) -> u8 {
        let result = value.rotate_right(1);
        self.rotate_flags(result, value & 0x01 != 0);
        result
    }

    fn rl(&mut self, value: u8) -> u8 {
        let result = (value << 1) | u8::from(self.registers.flag(Flags::CARRY));
        self.rotate_flags(result, value & 0x80 != 0);
        result
    }

    fn rr(&mut self, value: u8) -> u8 {
        let result = (value >> 1) | (u8::from(self.registers.flag(Flags::CARRY)) << 7);
        self.rotate_flags(result, value & 0x01 != 0);
        result
    }

    fn sla(&mut self, value: u8) -> u8 {
        let result = value << 1;
        self.rotate_flags(result, value & 0x80 != 0);
        result
    }

    fn sra(&mut self, value: u8) -> u8 {
        let result = ((value as i8) >> 1) as u8;
        self.rotate_flags(result, value & 0x01 != 0);
        result
    }

    fn swap(&mut self, value: u8) -> u8 {
        let result = value.rotate_left(4);
        self.rotate_flags(result, false);
        result
    }

    fn srl(&mut self, value: u8) -> u8 {
        let result = value >> 1;
        self.rotate_flags(result, value & 0x01 != 0);
        result
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
