//! Shared definitions for the Game Boy memory map.
//!
//! Centralizing address-related constants keeps the hardware layout in one
//! location, prevents magic numbers from sneaking into other modules, and
//! makes it easier to reference the original console documentation while
//! reading the code base.

/// Bus-level address ranges.
pub mod map {
    /// First cartridge ROM address (fixed bank 0 plus the switchable bank).
    pub const ROM_START: u16 = 0x0000;
    /// Last cartridge ROM address (inclusive).
    pub const ROM_END: u16 = 0x7FFF;
    /// Size of one ROM bank in bytes.
    pub const ROM_BANK_SIZE: usize = 0x4000;

    /// First video RAM address.
    pub const VRAM_START: u16 = 0x8000;
    /// Last video RAM address (inclusive).
    pub const VRAM_END: u16 = 0x9FFF;
    /// Size of the video RAM block.
    pub const VRAM_SIZE: usize = 0x2000;

    /// First external (cartridge) RAM address.
    pub const EXTERNAL_RAM_START: u16 = 0xA000;
    /// Last external RAM address (inclusive).
    pub const EXTERNAL_RAM_END: u16 = 0xBFFF;
    /// Size of one external RAM bank.
    pub const EXTERNAL_RAM_BANK_SIZE: usize = 0x2000;

    /// First work RAM address.
    pub const WRAM_START: u16 = 0xC000;
    /// Last work RAM address (inclusive).
    pub const WRAM_END: u16 = 0xDFFF;
    /// Size of the work RAM block.
    pub const WRAM_SIZE: usize = 0x2000;

    /// First echo RAM address. Reads and writes are rewritten to work RAM.
    pub const ECHO_START: u16 = 0xE000;
    /// Last echo RAM address (inclusive).
    pub const ECHO_END: u16 = 0xFDFF;
    /// Offset subtracted to map an echo address onto work RAM.
    pub const ECHO_OFFSET: u16 = 0x2000;

    /// First byte of the sprite attribute table.
    pub const OAM_START: u16 = 0xFE00;
    /// Last byte of the sprite attribute table (inclusive).
    pub const OAM_END: u16 = 0xFE9F;
    /// Size of the sprite attribute table: 40 entries of 4 bytes.
    pub const OAM_SIZE: usize = 0x00A0;

    /// First IO register address.
    pub const IO_START: u16 = 0xFF00;
    /// Last IO register address (inclusive).
    pub const IO_END: u16 = 0xFF7F;
    /// Number of IO register slots dispatched through the handler table.
    pub const IO_SLOTS: usize = 0x80;

    /// First high RAM address. High RAM stays reachable during OAM DMA.
    pub const HRAM_START: u16 = 0xFF80;
    /// Last high RAM address (inclusive); 0xFFFF itself is the IE register.
    pub const HRAM_END: u16 = 0xFFFE;
    /// Size of the high RAM block.
    pub const HRAM_SIZE: usize = 0x7F;

    /// Interrupt enable register, sitting above high RAM.
    pub const IE: u16 = 0xFFFF;

    /// Base of the interrupt service vectors (0x40, 0x48, 0x50, 0x58, 0x60).
    pub const INTERRUPT_VECTORS: u16 = 0x0040;
}

/// Memory-mapped IO register addresses (0xFF00..=0xFF7F).
pub mod io {
    /// Joypad matrix select / readback.
    pub const JOYP: u16 = 0xFF00;

    /// Divider register (upper byte of the internal 16-bit counter).
    pub const DIV: u16 = 0xFF04;
    /// Timer counter.
    pub const TIMA: u16 = 0xFF05;
    /// Timer modulo, reloaded into TIMA on overflow.
    pub const TMA: u16 = 0xFF06;
    /// Timer control: enable bit 2, clock select bits 0-1.
    pub const TAC: u16 = 0xFF07;

    /// Interrupt request mask (5 bits).
    pub const IF: u16 = 0xFF0F;

    /// First audio register handled by the APU collaborator.
    pub const APU_START: u16 = 0xFF10;
    /// Last audio register (inclusive), end of the wave pattern RAM.
    pub const APU_END: u16 = 0xFF3F;
    /// Audio master control (power bit 7).
    pub const NR52: u16 = 0xFF26;

    /// Display control.
    pub const LCDC: u16 = 0xFF40;
    /// Display status: mode bits 0-1, LYC match bit 2, interrupt enables 3-6.
    pub const STAT: u16 = 0xFF41;
    /// Background vertical scroll.
    pub const SCY: u16 = 0xFF42;
    /// Background horizontal scroll.
    pub const SCX: u16 = 0xFF43;
    /// Current scanline, read-only to software.
    pub const LY: u16 = 0xFF44;
    /// Scanline compare value for the STAT interrupt.
    pub const LYC: u16 = 0xFF45;
    /// OAM DMA trigger; the written byte is the source page.
    pub const DMA: u16 = 0xFF46;
    /// Background palette.
    pub const BGP: u16 = 0xFF47;
    /// Object palette 0.
    pub const OBP0: u16 = 0xFF48;
    /// Object palette 1.
    pub const OBP1: u16 = 0xFF49;
    /// Window top edge.
    pub const WY: u16 = 0xFF4A;
    /// Window left edge plus seven.
    pub const WX: u16 = 0xFF4B;
}

/// Video memory layout inside VRAM.
pub mod video {
    /// Tile data block used when LCDC bit 4 selects unsigned addressing.
    pub const TILE_BLOCK0: u16 = 0x8000;
    /// Base of signed tile addressing (tile index is an i8 around 0x9000).
    pub const TILE_BLOCK2: u16 = 0x9000;
    /// Lower tile map.
    pub const TILEMAP0: u16 = 0x9800;
    /// Upper tile map.
    pub const TILEMAP1: u16 = 0x9C00;
    /// Bytes per 8x8 tile: 8 rows of two bit-plane bytes.
    pub const TILE_BYTES: u16 = 16;
}
