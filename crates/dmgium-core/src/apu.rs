use crate::bus::Component;
use crate::memory::io;

/// Audio collaborator, present only through the component contract.
///
/// Synthesis lives outside the core; this keeps the register file
/// (0xFF10..=0xFF3F) readable and writable so software that probes or
/// configures the channels behaves as on hardware.
#[derive(Debug, Clone)]
pub struct Apu {
    registers: [u8; REGISTER_COUNT],
    powered: bool,
}

const REGISTER_COUNT: usize = (io::APU_END - io::APU_START + 1) as usize;

impl Apu {
    pub fn new() -> Self {
        Self {
            registers: [0; REGISTER_COUNT],
            powered: true,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn tick(&mut self) {}

    fn index(address: u16) -> Option<usize> {
        (io::APU_START..=io::APU_END)
            .contains(&address)
            .then(|| (address - io::APU_START) as usize)
    }
}

impl Default for Apu {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for Apu {
    fn read_io_register(&mut self, address: u16) -> u8 {
        match Self::index(address) {
            Some(index) if address == io::NR52 => {
                (u8::from(self.powered) << 7) | 0x70 | (self.registers[index] & 0x0F)
            }
            Some(index) => self.registers[index],
            None => 0xFF,
        }
    }

    fn write_io_register(&mut self, address: u16, value: u8) {
        let Some(index) = Self::index(address) else {
            return;
        };
        if address == io::NR52 {
            self.powered = value & 0x80 != 0;
            if !self.powered {
                self.registers = [0; REGISTER_COUNT];
            }
            return;
        }
        // Register writes are ignored while the APU is powered down,
        // except the wave pattern RAM which stays accessible.
        if self.powered || address >= 0xFF30 {
            self.registers[index] = value;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn power_off_clears_and_gates_registers() {
        let mut apu = Apu::new();
        apu.write_io_register(0xFF12, 0xF3);
        assert_eq!(apu.read_io_register(0xFF12), 0xF3);

        apu.write_io_register(io::NR52, 0x00);
        assert_eq!(apu.read_io_register(0xFF12), 0x00);
        apu.write_io_register(0xFF12, 0x55);
        assert_eq!(apu.read_io_register(0xFF12), 0x00);

        // Wave RAM is writable regardless of power.
        apu.write_io_register(0xFF30, 0xAA);
        assert_eq!(apu.read_io_register(0xFF30), 0xAA);
    }
}
