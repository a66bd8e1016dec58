use bitflags::bitflags;

use crate::ram::blocks::Oam;

/// Number of entries in the sprite attribute table.
pub const OAM_ENTRIES: usize = 40;
/// Bytes per sprite attribute entry.
pub const ENTRY_BYTES: usize = 4;
/// Horizontal offset baked into stored sprite X positions.
pub const X_OFFSET: u8 = 8;
/// Vertical offset baked into stored sprite Y positions.
pub const Y_OFFSET: u8 = 16;

bitflags! {
    /// Attribute bits stored in sprite byte 3.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct Attributes: u8 {
        /// Use OBP1 instead of OBP0.
        const PALETTE    = 0b0001_0000;
        /// Mirror the tile horizontally.
        const FLIP_X     = 0b0010_0000;
        /// Mirror the tile vertically.
        const FLIP_Y     = 0b0100_0000;
        /// Background/window colors 1..=3 win over this sprite.
        const BEHIND_BG  = 0b1000_0000;
    }
}

/// One sprite attribute entry, decoded by value.
///
/// Entries are re-parsed from the OAM bytes whenever they are needed; no
/// reference into OAM is ever held across a dot boundary, since DMA may
/// rewrite the table between dots.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Sprite {
    /// Position in OAM, the draw-priority tiebreaker.
    pub index: u8,
    pub y: u8,
    pub x: u8,
    pub tile: u8,
    pub attributes: Attributes,
}

impl Sprite {
    /// Decodes the four bytes of entry `index`.
    pub fn parse(oam: &Oam, index: usize) -> Self {
        let base = index * ENTRY_BYTES;
        Self {
            index: index as u8,
            y: oam.read(base),
            x: oam.read(base + 1),
            tile: oam.read(base + 2),
            attributes: Attributes::from_bits_truncate(oam.read(base + 3)),
        }
    }

    /// Whether this sprite's vertical span covers `scanline` at `height`.
    pub fn covers_line(&self, scanline: u8, height: u8) -> bool {
        let top = i16::from(self.y) - i16::from(Y_OFFSET);
        let line = i16::from(scanline);
        line >= top && line < top + i16::from(height)
    }

    /// Whether this sprite's horizontal span covers screen column `x`.
    pub fn covers_column(&self, x: u8) -> bool {
        let left = i16::from(self.x) - i16::from(X_OFFSET);
        let column = i16::from(x);
        column >= left && column < left + 8
    }

    /// Row within the sprite's tile for `scanline`, after vertical flip.
    pub fn tile_row(&self, scanline: u8, height: u8) -> u8 {
        let row = (i16::from(scanline) - (i16::from(self.y) - i16::from(Y_OFFSET))) as u8;
        if self.attributes.contains(Attributes::FLIP_Y) {
            height - 1 - row
        } else {
            row
        }
    }

    /// Column within the tile for screen column `x`, after horizontal flip.
    pub fn tile_column(&self, x: u8) -> u8 {
        let column = (i16::from(x) - (i16::from(self.x) - i16::from(X_OFFSET))) as u8;
        if self.attributes.contains(Attributes::FLIP_X) {
            7 - column
        } else {
            column
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn oam_with_sprite(index: usize, bytes: [u8; 4]) -> Oam {
        let mut oam = Oam::new();
        oam.as_mut_slice()[index * ENTRY_BYTES..index * ENTRY_BYTES + 4].copy_from_slice(&bytes);
        oam
    }

    #[test]
    fn parse_reads_entry_fields() {
        let oam = oam_with_sprite(7, [0x30, 0x28, 0x12, 0xB0]);
        let sprite = Sprite::parse(&oam, 7);
        assert_eq!(sprite.index, 7);
        assert_eq!(sprite.y, 0x30);
        assert_eq!(sprite.x, 0x28);
        assert_eq!(sprite.tile, 0x12);
        assert!(sprite.attributes.contains(Attributes::BEHIND_BG));
        assert!(sprite.attributes.contains(Attributes::FLIP_X));
        assert!(!sprite.attributes.contains(Attributes::FLIP_Y));
    }

    #[test]
    fn vertical_span_respects_height() {
        let oam = oam_with_sprite(0, [16, 8, 0, 0]); // top-left corner
        let sprite = Sprite::parse(&oam, 0);
        assert!(sprite.covers_line(0, 8));
        assert!(sprite.covers_line(7, 8));
        assert!(!sprite.covers_line(8, 8));
        assert!(sprite.covers_line(15, 16));
    }

    #[test]
    fn flips_mirror_tile_coordinates() {
        let oam = oam_with_sprite(0, [16, 8, 0, 0x60]); // both flips
        let sprite = Sprite::parse(&oam, 0);
        assert_eq!(sprite.tile_row(0, 8), 7);
        assert_eq!(sprite.tile_column(0), 7);
    }

    #[test]
    fn partially_offscreen_sprite_covers_left_edge() {
        let oam = oam_with_sprite(0, [16, 4, 0, 0]); // x=4: left half hidden
        let sprite = Sprite::parse(&oam, 0);
        assert!(sprite.covers_column(0));
        assert!(!sprite.covers_column(4));
    }
}
