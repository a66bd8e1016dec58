use crate::error::Error;
use crate::memory::map;

pub mod header;

pub use header::{Header, Mbc};

/// Cartridge collaborator: ROM banks at 0x0000..=0x7FFF and external RAM at
/// 0xA000..=0xBFFF, with MBC1/MBC2 bank arithmetic behind the write path.
///
/// Before [`Cartridge::load_rom`] succeeds every read returns 0xFF, so a
/// system constructed without a ROM is safe to poke at in tests.
#[derive(Debug, Clone, Default)]
pub struct Cartridge {
    header: Option<Header>,
    rom: Vec<u8>,
    ram: Vec<u8>,
    mbc: Mbc,
    rom_bank: u16,
    ram_bank: u8,
    ram_enabled: bool,
    banking_mode: u8,
}

impl Cartridge {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the header (checksum included) and takes ownership of the
    /// image. A checksum mismatch leaves the previous contents untouched.
    pub fn load_rom(&mut self, bytes: Vec<u8>) -> Result<(), Error> {
        let header = Header::parse(&bytes)?;
        self.ram = vec![
            0;
            if header.mbc == Mbc::Mbc2 {
                // 512 half-byte cells, stored one per byte.
                512
            } else {
                header.ram_bytes()
            }
        ];
        self.rom = bytes;
        self.mbc = header.mbc;
        self.header = Some(header);
        self.rom_bank = 0;
        self.ram_bank = 0;
        self.ram_enabled = false;
        self.banking_mode = 0;
        Ok(())
    }

    pub fn header(&self) -> Option<&Header> {
        self.header.as_ref()
    }

    pub fn loaded(&self) -> bool {
        self.header.is_some()
    }

    pub fn read_address(&self, address: u16) -> u8 {
        if self.rom.is_empty() {
            return 0xFF;
        }
        match address {
            map::ROM_START..=map::ROM_END => {
                let offset = self.rom_offset(address);
                self.rom.get(offset).copied().unwrap_or(0xFF)
            }
            map::EXTERNAL_RAM_START..=map::EXTERNAL_RAM_END => self.read_ram(address),
            _ => 0xFF,
        }
    }

    pub fn write_address(&mut self, address: u16, value: u8) {
        match self.mbc {
            Mbc::Mbc1 => self.write_mbc1(address, value),
            Mbc::Mbc2 => self.write_mbc2(address, value),
            // ROM-only: data writes to the ROM window are a silent bus fault.
            Mbc::None => {}
        }
    }

    /// Effective ROM offset after MBC bank selection.
    fn rom_offset(&self, address: u16) -> usize {
        let in_upper_window = address as usize >= map::ROM_BANK_SIZE;
        let bank = match self.mbc {
            Mbc::None => usize::from(in_upper_window),
            Mbc::Mbc1 => {
                let low = {
                    // A zero in the low five bits always selects bank 1.
                    let bits = (self.rom_bank & 0x1F) as usize;
                    if bits == 0 { 1 } else { bits }
                };
                let high = ((self.rom_bank >> 5) & 0x03) as usize;
                if in_upper_window {
                    (high << 5) | low
                } else if self.banking_mode == 1 {
                    high << 5
                } else {
                    0
                }
            }
            Mbc::Mbc2 => {
                if in_upper_window {
                    let bank = (self.rom_bank & 0x0F) as usize;
                    if bank == 0 { 1 } else { bank }
                } else {
                    0
                }
            }
        };
        let bank = bank & (self.bank_count().saturating_sub(1));
        (address as usize % map::ROM_BANK_SIZE) + bank * map::ROM_BANK_SIZE
    }

    fn bank_count(&self) -> usize {
        (self.rom.len() / map::ROM_BANK_SIZE).max(1)
    }

    fn read_ram(&self, address: u16) -> u8 {
        if !self.ram_enabled || self.ram.is_empty() {
            return 0xFF;
        }
        let offset = (address - map::EXTERNAL_RAM_START) as usize;
        match self.mbc {
            // Mirrored across the window; only the low nibble is wired.
            Mbc::Mbc2 => 0xF0 | (self.ram[offset % 512] & 0x0F),
            Mbc::Mbc1 => {
                let banked = if self.banking_mode == 1 {
                    offset + usize::from(self.ram_bank) * map::EXTERNAL_RAM_BANK_SIZE
                } else {
                    offset
                };
                self.ram.get(banked).copied().unwrap_or(0xFF)
            }
            Mbc::None => self.ram.get(offset).copied().unwrap_or(0xFF),
        }
    }

    fn write_mbc1(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x1FFF => self.ram_enabled = value & 0x0F == 0x0A,
            0x2000..=0x3FFF => {
                self.rom_bank = (self.rom_bank & !0x1F) | u16::from(value & 0x1F);
            }
            0x4000..=0x5FFF => {
                self.rom_bank = (self.rom_bank & 0x1F) | (u16::from(value & 0x03) << 5);
                self.ram_bank = value & 0x03;
            }
            0x6000..=0x7FFF => self.banking_mode = value & 0x01,
            map::EXTERNAL_RAM_START..=map::EXTERNAL_RAM_END => {
                if !self.ram_enabled {
                    return;
                }
                let mut offset = (address - map::EXTERNAL_RAM_START) as usize;
                if self.banking_mode == 1 {
                    offset += usize::from(self.ram_bank) * map::EXTERNAL_RAM_BANK_SIZE;
                }
                if let Some(cell) = self.ram.get_mut(offset) {
                    *cell = value;
                }
            }
            _ => {}
        }
    }

    fn write_mbc2(&mut self, address: u16, value: u8) {
        match address {
            0x0000..=0x3FFF => {
                // Address bit 8 picks between RAM enable and ROM bank select.
                if address & 0x0100 != 0 {
                    self.rom_bank = u16::from(value & 0x0F);
                } else {
                    self.ram_enabled = value == 0x0A;
                }
            }
            map::EXTERNAL_RAM_START..=map::EXTERNAL_RAM_END => {
                if !self.ram_enabled {
                    return;
                }
                let offset = (address - map::EXTERNAL_RAM_START) as usize % 512;
                self.ram[offset] = value & 0x0F;
            }
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mbc1_rom(banks: usize) -> Vec<u8> {
        let mut rom = vec![0u8; banks * map::ROM_BANK_SIZE];
        rom[0x147] = 0x03; // MBC1 + RAM + battery
        rom[0x149] = 0x03; // 32 KiB RAM
        for bank in 0..banks {
            // Tag each bank so reads identify which one is mapped.
            rom[bank * map::ROM_BANK_SIZE] = bank as u8;
        }
        rom[0x14D] = header::checksum(&rom);
        rom
    }

    #[test]
    fn mbc1_bank_zero_remaps_to_one() {
        let mut cart = Cartridge::new();
        cart.load_rom(mbc1_rom(4)).expect("rom should load");
        cart.write_address(0x2000, 0x00);
        assert_eq!(cart.read_address(0x4000), 1);
        cart.write_address(0x2000, 0x02);
        assert_eq!(cart.read_address(0x4000), 2);
        assert_eq!(cart.read_address(0x0000), 0, "fixed bank stays at zero");
    }

    #[test]
    fn mbc1_ram_requires_enable() {
        let mut cart = Cartridge::new();
        cart.load_rom(mbc1_rom(2)).expect("rom should load");
        cart.write_address(0xA000, 0x5A);
        assert_eq!(cart.read_address(0xA000), 0xFF);

        cart.write_address(0x0000, 0x0A);
        cart.write_address(0xA000, 0x5A);
        assert_eq!(cart.read_address(0xA000), 0x5A);
    }

    #[test]
    fn mbc2_ram_is_half_byte_and_mirrored() {
        let mut rom = vec![0u8; 4 * map::ROM_BANK_SIZE];
        rom[0x147] = 0x06;
        rom[0x14D] = header::checksum(&rom);
        let mut cart = Cartridge::new();
        cart.load_rom(rom).expect("rom should load");

        cart.write_address(0x0000, 0x0A); // bit 8 clear: RAM enable
        cart.write_address(0xA000, 0xFF);
        assert_eq!(cart.read_address(0xA000), 0xFF);
        assert_eq!(cart.read_address(0xA200), 0xFF, "mirror of cell 0");
        cart.write_address(0xA001, 0x35);
        assert_eq!(cart.read_address(0xA001), 0xF5, "upper nibble floats high");
    }

    #[test]
    fn unloaded_cartridge_reads_open() {
        let cart = Cartridge::new();
        assert_eq!(cart.read_address(0x0000), 0xFF);
        assert_eq!(cart.read_address(0xA000), 0xFF);
    }
}
