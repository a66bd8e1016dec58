use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// The CPU fetched an opcode that exists in neither dispatch table.
    ///
    /// This is fatal: it signals a core defect or an incompatible ROM, and
    /// the scheduler must not be stepped past it.
    UnknownOpcode {
        opcode: u8,
        /// Address the opcode was fetched from.
        pc: u16,
    },
    /// Provided buffer is shorter than the 0x150-byte cartridge header.
    RomTooShort { actual: usize },
    /// Header checksum over 0x134..=0x14C does not match byte 0x14D.
    HeaderChecksumMismatch { expected: u8, actual: u8 },
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnknownOpcode { opcode, pc } => {
                write!(f, "unknown opcode {opcode:02X} at {pc:04X}")
            }
            Self::RomTooShort { actual } => {
                write!(f, "ROM expected at least 0x150 bytes, got {actual}")
            }
            Self::HeaderChecksumMismatch { expected, actual } => write!(
                f,
                "header checksum mismatch: computed {expected:02X}, header says {actual:02X}"
            ),
        }
    }
}

impl std::error::Error for Error {}
