use crate::bus::Component;
use crate::interrupt::{Interrupt, InterruptLine};
use crate::memory::io;

/// TIMA periods in dots for the four TAC clock selects.
const PERIOD_MASKS: [u16; 4] = [1024 - 1, 16 - 1, 64 - 1, 256 - 1];

/// Divider and timer registers (0xFF04..=0xFF07).
///
/// DIV is the upper byte of a free-running 16-bit counter incremented every
/// dot; TIMA ticks at the TAC-selected period and requests the Timer
/// interrupt when it overflows, reloading from TMA.
#[derive(Debug, Clone, Copy, Default)]
pub struct Timer {
    div: u16,
    tima: u8,
    tma: u8,
    enabled: bool,
    clock_select: u8,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn tick(&mut self, interrupts: &mut InterruptLine) {
        self.div = self.div.wrapping_add(1);

        if !self.enabled {
            return;
        }
        let mask = PERIOD_MASKS[self.clock_select as usize];
        if self.div & mask == 0 {
            let (next, overflowed) = self.tima.overflowing_add(1);
            self.tima = if overflowed { self.tma } else { next };
            if overflowed {
                interrupts.request(Interrupt::Timer);
            }
        }
    }

    pub fn div(&self) -> u8 {
        (self.div >> 8) as u8
    }

    /// STOP clears the divider the same way a DIV write does.
    pub fn clear_div(&mut self) {
        self.div = 0;
    }
}

impl Component for Timer {
    fn read_io_register(&mut self, address: u16) -> u8 {
        match address {
            io::DIV => self.div(),
            io::TIMA => self.tima,
            io::TMA => self.tma,
            io::TAC => 0xF8 | (u8::from(self.enabled) << 2) | self.clock_select,
            _ => 0xFF,
        }
    }

    fn write_io_register(&mut self, address: u16, value: u8) {
        match address {
            io::DIV => self.clear_div(),
            io::TIMA => self.tima = value,
            io::TMA => self.tma = value,
            io::TAC => {
                self.clock_select = value & 0b11;
                self.enabled = value & (1 << 2) != 0;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tima_overflow_reloads_tma_and_requests_interrupt() {
        let mut timer = Timer::new();
        let mut interrupts = InterruptLine::new();
        timer.write_io_register(io::TAC, 0b101); // enabled, /16
        timer.write_io_register(io::TMA, 0x42);
        timer.write_io_register(io::TIMA, 0xFF);

        for _ in 0..16 {
            timer.tick(&mut interrupts);
        }
        assert_eq!(timer.read_io_register(io::TIMA), 0x42);
        assert_eq!(
            interrupts.read_request() & Interrupt::Timer.mask(),
            Interrupt::Timer.mask()
        );
    }

    #[test]
    fn div_increments_every_256_dots() {
        let mut timer = Timer::new();
        let mut interrupts = InterruptLine::new();
        for _ in 0..256 {
            timer.tick(&mut interrupts);
        }
        assert_eq!(timer.read_io_register(io::DIV), 1);
        timer.write_io_register(io::DIV, 0xAB);
        assert_eq!(timer.read_io_register(io::DIV), 0, "any DIV write resets");
    }

    #[test]
    fn disabled_timer_leaves_tima_alone() {
        let mut timer = Timer::new();
        let mut interrupts = InterruptLine::new();
        timer.write_io_register(io::TAC, 0b001); // /16 but disabled
        for _ in 0..1024 {
            timer.tick(&mut interrupts);
        }
        assert_eq!(timer.read_io_register(io::TIMA), 0);
    }
}
