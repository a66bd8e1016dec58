use bitflags::bitflags;

bitflags! {
    /// Display control register (LCDC, 0xFF40).
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Control: u8 {
        /// Background/window pixels are drawn at all.
        const BG_ENABLE      = 0b0000_0001;
        /// Sprites are drawn.
        const OBJ_ENABLE     = 0b0000_0010;
        /// Sprites are 8x16 instead of 8x8.
        const OBJ_SIZE       = 0b0000_0100;
        /// Background reads the upper tile map (0x9C00).
        const BG_MAP         = 0b0000_1000;
        /// Tile data is addressed unsigned from 0x8000.
        const TILE_DATA      = 0b0001_0000;
        /// Window layer enabled.
        const WINDOW_ENABLE  = 0b0010_0000;
        /// Window reads the upper tile map (0x9C00).
        const WINDOW_MAP     = 0b0100_0000;
        /// Display enabled; clearing freezes the pipeline.
        const DISPLAY_ENABLE = 0b1000_0000;
    }
}

bitflags! {
    /// Software-writable STAT interrupt enables (bits 3..=6 of 0xFF41).
    ///
    /// The mode and LYC-match bits of STAT are derived state and live on the
    /// pipeline itself; only these enables are storage.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct StatEnable: u8 {
        const HBLANK_INT = 0b0000_1000;
        const VBLANK_INT = 0b0001_0000;
        const OAM_INT    = 0b0010_0000;
        const LYC_INT    = 0b0100_0000;
    }
}

/// Pipeline mode, numerically matching STAT's 2-bit mode field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Drawing = 3,
}

impl Mode {
    /// STAT enable bit gating this mode's entry interrupt, when it has one.
    pub fn interrupt_enable(self) -> StatEnable {
        match self {
            Self::HBlank => StatEnable::HBLANK_INT,
            Self::VBlank => StatEnable::VBLANK_INT,
            Self::OamScan => StatEnable::OAM_INT,
            // Entering Drawing never raises STAT.
            Self::Drawing => StatEnable::empty(),
        }
    }
}

/// CPU-visible PPU register file, minus the derived STAT/LY bits.
#[derive(Debug, Clone, Copy)]
pub struct Registers {
    pub control: Control,
    pub stat_enable: StatEnable,
    pub scy: u8,
    pub scx: u8,
    pub lyc: u8,
    pub bgp: u8,
    pub obp0: u8,
    pub obp1: u8,
    pub wy: u8,
    pub wx: u8,
}

impl Registers {
    /// Documented post-boot values.
    pub fn new() -> Self {
        Self {
            control: Control::from_bits_truncate(0x91),
            stat_enable: StatEnable::empty(),
            scy: 0,
            scx: 0,
            lyc: 0,
            bgp: 0xFC,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
        }
    }
}

impl Default for Registers {
    fn default() -> Self {
        Self::new()
    }
}

/// Maps a 2-bit pixel value through a palette register to a shade index.
pub fn palette_shade(palette: u8, value: u8) -> u8 {
    (palette >> (value * 2)) & 0b11
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn palette_maps_two_bit_values() {
        // Identity palette 0b11100100.
        assert_eq!(palette_shade(0xE4, 0), 0);
        assert_eq!(palette_shade(0xE4, 3), 3);
        // Inverted palette.
        assert_eq!(palette_shade(0x1B, 0), 3);
        assert_eq!(palette_shade(0x1B, 3), 0);
    }
}
