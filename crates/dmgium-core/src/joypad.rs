use bitflags::bitflags;

use crate::bus::Component;
use crate::interrupt::{Interrupt, InterruptLine};
use crate::memory::io;

bitflags! {
    /// Host-side button snapshot, pressed = set.
    ///
    /// Bit layout matches the two JOYP matrix rows: the low nibble holds the
    /// action buttons, the high nibble the directional pad.
    #[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
    pub struct Buttons: u8 {
        const A      = 0b0000_0001;
        const B      = 0b0000_0010;
        const SELECT = 0b0000_0100;
        const START  = 0b0000_1000;
        const RIGHT  = 0b0001_0000;
        const LEFT   = 0b0010_0000;
        const UP     = 0b0100_0000;
        const DOWN   = 0b1000_0000;
    }
}

/// Joypad matrix (0xFF00).
///
/// The snapshot passed into [`Joypad::tick`] each dot is the only input
/// source; the component keeps no channel back to the host.
#[derive(Debug, Clone, Copy)]
pub struct Joypad {
    /// Written select bits (4-5); low selects a matrix row.
    select: u8,
    buttons: Buttons,
    /// Previous readback nibble, for the high-to-low interrupt edge.
    last_lines: u8,
}

impl Joypad {
    pub fn new() -> Self {
        Self {
            select: 0x30,
            buttons: Buttons::empty(),
            last_lines: 0xF,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn tick(&mut self, buttons: Buttons, interrupts: &mut InterruptLine) {
        self.buttons = buttons;
        let lines = self.lines();
        // Any selected line falling requests the Joypad interrupt.
        if self.last_lines & !lines != 0 {
            interrupts.request(Interrupt::Joypad);
        }
        self.last_lines = lines;
    }

    /// Active-low readback nibble for the currently selected matrix row.
    fn lines(&self) -> u8 {
        let pressed = self.buttons.bits();
        let mut lines = 0xF;
        if self.select & 0x10 == 0 {
            lines &= !(pressed >> 4) & 0xF;
        }
        if self.select & 0x20 == 0 {
            lines &= !pressed & 0xF;
        }
        lines
    }
}

impl Default for Joypad {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Joypad {
    fn read_io_register(&mut self, address: u16) -> u8 {
        match address {
            io::JOYP => 0xC0 | self.select | self.lines(),
            _ => 0xFF,
        }
    }

    fn write_io_register(&mut self, address: u16, value: u8) {
        if address == io::JOYP {
            // Only the select bits are writable.
            self.select = value & 0x30;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selected_row_reads_active_low() {
        let mut joypad = Joypad::new();
        let mut interrupts = InterruptLine::new();
        joypad.write_io_register(io::JOYP, 0x20); // select dpad row
        joypad.tick(Buttons::LEFT | Buttons::A, &mut interrupts);
        let value = joypad.read_io_register(io::JOYP);
        assert_eq!(value & 0x0F, 0b1101, "LEFT pulls line 1 low");

        joypad.write_io_register(io::JOYP, 0x10); // select action row
        assert_eq!(joypad.read_io_register(io::JOYP) & 0x0F, 0b1110);
    }

    #[test]
    fn no_row_selected_reads_high() {
        let mut joypad = Joypad::new();
        let mut interrupts = InterruptLine::new();
        joypad.tick(Buttons::all(), &mut interrupts);
        assert_eq!(joypad.read_io_register(io::JOYP) & 0x0F, 0x0F);
    }

    #[test]
    fn falling_line_requests_interrupt() {
        let mut joypad = Joypad::new();
        let mut interrupts = InterruptLine::new();
        joypad.write_io_register(io::JOYP, 0x10);
        joypad.tick(Buttons::empty(), &mut interrupts);
        assert_eq!(interrupts.read_request() & 0x1F, 0);

        joypad.tick(Buttons::START, &mut interrupts);
        assert_ne!(interrupts.read_request() & Interrupt::Joypad.mask(), 0);
    }
}
