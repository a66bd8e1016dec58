//! Background and window tile fetching.
//!
//! Both layers share the same 32x32 tile maps and two-bit-plane tile data;
//! they differ only in which map they read and how the pixel coordinate is
//! derived (scroll registers vs. window position).

use crate::memory::{map, video};
use crate::ppu::registers::Control;
use crate::ram::blocks::Vram;

/// Tiles per tile-map row/column.
const MAP_TILES: u16 = 32;

fn vram_index(address: u16) -> usize {
    (address - map::VRAM_START) as usize
}

/// Absolute address of a tile's data, honoring the LCDC addressing-mode bit.
fn tile_data_addr(control: Control, tile_index: u8) -> u16 {
    if control.contains(Control::TILE_DATA) {
        video::TILE_BLOCK0 + u16::from(tile_index) * video::TILE_BYTES
    } else {
        let signed = i16::from(tile_index as i8);
        (i32::from(video::TILE_BLOCK2) + i32::from(signed) * i32::from(video::TILE_BYTES)) as u16
    }
}

/// 2-bit pixel value at (`x`, `y`) within the 256x256 layer over `map_base`.
fn layer_pixel(vram: &Vram, control: Control, map_base: u16, x: u16, y: u16) -> u8 {
    let tile_col = (x / 8) % MAP_TILES;
    let tile_row = (y / 8) % MAP_TILES;
    let tile_index = vram.read(vram_index(map_base + tile_row * MAP_TILES + tile_col));

    let row_addr = tile_data_addr(control, tile_index) + (y % 8) * 2;
    let low = vram.read(vram_index(row_addr));
    let high = vram.read(vram_index(row_addr + 1));
    decode_pixel(low, high, (x % 8) as u8)
}

/// Combines the two bit-plane bytes of a tile row at `column` (0 = leftmost).
pub fn decode_pixel(low: u8, high: u8, column: u8) -> u8 {
    let bit = 7 - column;
    (((high >> bit) & 1) << 1) | ((low >> bit) & 1)
}

/// Background pixel for screen column `screen_x` on `scanline`.
pub fn background_pixel(vram: &Vram, control: Control, scx: u8, scy: u8, screen_x: u8, scanline: u8) -> u8 {
    let map_base = if control.contains(Control::BG_MAP) {
        video::TILEMAP1
    } else {
        video::TILEMAP0
    };
    let x = u16::from(scx.wrapping_add(screen_x));
    let y = u16::from(scy.wrapping_add(scanline));
    layer_pixel(vram, control, map_base, x, y)
}

/// Window pixel at window-relative column `window_x` on `window_line`.
pub fn window_pixel(vram: &Vram, control: Control, window_x: u8, window_line: u8) -> u8 {
    let map_base = if control.contains(Control::WINDOW_MAP) {
        video::TILEMAP1
    } else {
        video::TILEMAP0
    };
    layer_pixel(vram, control, map_base, u16::from(window_x), u16::from(window_line))
}

/// Sprite tile row data, honoring the 8x16 tile-pair indexing rule.
pub fn sprite_row(vram: &Vram, tall: bool, tile: u8, row: u8) -> (u8, u8) {
    let tile = if tall {
        // The pair ignores the index's low bit; the row selects the half.
        (tile & 0xFE) | u8::from(row >= 8)
    } else {
        tile
    };
    let row_addr = video::TILE_BLOCK0 + u16::from(tile) * video::TILE_BYTES + u16::from(row % 8) * 2;
    (vram.read(vram_index(row_addr)), vram.read(vram_index(row_addr + 1)))
}
