//! Cartridge header parsing.
//!
//! Every Game Boy ROM carries a header at 0x100..=0x14F describing the title,
//! the memory bank controller wired into the cartridge, ROM/RAM sizing, and
//! an 8-bit checksum over 0x134..=0x14C that the boot ROM verifies before
//! handing control to the game. [`Header::parse`] understands that layout and
//! rejects images whose checksum does not match, surfacing the mismatch as an
//! [`Error`] the host can refuse to start on.

use crate::error::Error;

/// First byte past the header; any valid ROM is at least this long.
pub const HEADER_END: usize = 0x150;

const TITLE_RANGE: core::ops::Range<usize> = 0x134..0x13F;
const CHECKSUM_RANGE: core::ops::RangeInclusive<usize> = 0x134..=0x14C;
const CGB_FLAG: usize = 0x143;
const CARTRIDGE_TYPE: usize = 0x147;
const ROM_SIZE: usize = 0x148;
const RAM_SIZE: usize = 0x149;
const HEADER_CHECKSUM: usize = 0x14D;

/// Memory bank controller variants the core distinguishes.
///
/// Anything the loader does not recognize is treated as [`Mbc::None`]
/// (ROM-only): reads come straight from the image and writes are dropped.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Mbc {
    #[default]
    None,
    Mbc1,
    Mbc2,
}

impl Mbc {
    fn from_cartridge_type(value: u8) -> Self {
        match value {
            0x01..=0x03 => Self::Mbc1,
            0x05 | 0x06 => Self::Mbc2,
            _ => Self::None,
        }
    }
}

/// Parsed cartridge header fields the core consumes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub title: String,
    /// True when the image advertises Game Boy Color support (0x143 bit 7).
    pub cgb: bool,
    pub mbc: Mbc,
    /// ROM size code: total size is 32 KiB << code.
    pub rom_size_code: u8,
    /// RAM size code (0x149), decoded by [`Header::ram_bytes`].
    pub ram_size_code: u8,
    pub checksum: u8,
}

impl Header {
    /// Parses and validates a header from a full ROM image.
    pub fn parse(rom: &[u8]) -> Result<Self, Error> {
        if rom.len() < HEADER_END {
            return Err(Error::RomTooShort { actual: rom.len() });
        }

        let computed = checksum(rom);
        let stored = rom[HEADER_CHECKSUM];
        if computed != stored {
            return Err(Error::HeaderChecksumMismatch {
                expected: computed,
                actual: stored,
            });
        }

        let title = rom[TITLE_RANGE]
            .iter()
            .take_while(|&&b| b != 0)
            .map(|&b| char::from(b))
            .collect();

        Ok(Self {
            title,
            cgb: rom[CGB_FLAG] & 0x80 != 0,
            mbc: Mbc::from_cartridge_type(rom[CARTRIDGE_TYPE]),
            rom_size_code: rom[ROM_SIZE],
            ram_size_code: rom[RAM_SIZE],
            checksum: stored,
        })
    }

    /// External RAM size decoded from the header code.
    pub fn ram_bytes(&self) -> usize {
        match self.ram_size_code {
            0x02 => 8 * 1024,
            0x03 => 32 * 1024,
            0x04 => 128 * 1024,
            0x05 => 64 * 1024,
            _ => 0,
        }
    }
}

/// Header checksum: `x = x - byte - 1` over 0x134..=0x14C.
pub fn checksum(rom: &[u8]) -> u8 {
    rom[CHECKSUM_RANGE]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_sub(b).wrapping_sub(1))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom_with_header() -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[TITLE_RANGE][..4].copy_from_slice(b"TEST");
        rom[CARTRIDGE_TYPE] = 0x01;
        rom[RAM_SIZE] = 0x02;
        rom[HEADER_CHECKSUM] = checksum(&rom);
        rom
    }

    #[test]
    fn parses_valid_header() {
        let rom = rom_with_header();
        let header = Header::parse(&rom).expect("header should parse");
        assert_eq!(header.title, "TEST");
        assert_eq!(header.mbc, Mbc::Mbc1);
        assert_eq!(header.ram_bytes(), 8 * 1024);
        assert!(!header.cgb);
    }

    #[test]
    fn rejects_corrupted_checksum() {
        let mut rom = rom_with_header();
        rom[0x134] ^= 0xFF;
        assert!(matches!(
            Header::parse(&rom),
            Err(Error::HeaderChecksumMismatch { .. })
        ));
    }

    #[test]
    fn rejects_truncated_image() {
        let rom = vec![0u8; 0x100];
        assert!(matches!(
            Header::parse(&rom),
            Err(Error::RomTooShort { actual: 0x100 })
        ));
    }
}
