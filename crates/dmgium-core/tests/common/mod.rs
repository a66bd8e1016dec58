#![allow(dead_code)]

use anyhow::Result;
use dmgium_core::{GameBoy, cartridge::header, joypad::Buttons};

/// Where [`build_rom`] places the test program.
pub const PROGRAM_START: usize = 0x150;

/// Builds a 32 KiB ROM-only image with a valid header, `JP 0x0150` at the
/// entry point, and `program` at 0x150.
pub fn build_rom(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    rom[0x100..0x103].copy_from_slice(&[0xC3, 0x50, 0x01]);
    rom[0x134..0x138].copy_from_slice(b"TEST");
    rom[PROGRAM_START..PROGRAM_START + program.len()].copy_from_slice(program);
    seal(&mut rom);
    rom
}

/// Recomputes the header checksum after direct edits to an image.
pub fn seal(rom: &mut [u8]) {
    rom[0x14D] = header::checksum(rom);
}

/// A powered-on console with `program` loaded and PC at the entry point.
pub fn boot(program: &[u8]) -> Result<GameBoy> {
    let mut gb = GameBoy::default();
    gb.load_rom(build_rom(program))?;
    Ok(gb)
}

/// Advances `dots` dots with no buttons pressed.
pub fn run_dots(gb: &mut GameBoy, dots: u32) -> Result<()> {
    for _ in 0..dots {
        gb.tick(Buttons::empty())?;
    }
    Ok(())
}
