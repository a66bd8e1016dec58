//! The shared bus: address decoding, IO register dispatch, and the OAM DMA
//! conflict rule.
//!
//! [`Bus`] is a short-lived view borrowing every component from the system
//! struct. It is rebuilt for each dot, which keeps the borrow checker happy
//! while still letting any component reach any other through a single `&mut
//! Bus` during its turn.

use tracing::debug;

use crate::apu::Apu;
use crate::cartridge::Cartridge;
use crate::dma::DmaController;
use crate::interrupt::{Interrupt, InterruptLine};
use crate::joypad::{Buttons, Joypad};
use crate::memory::{io, map};
use crate::ppu::Ppu;
use crate::ram::blocks::{Hram, Wram};
use crate::timer::Timer;

/// Memory-mapped peripheral contract.
///
/// Components only implement the accessors for registers they own; the
/// defaults give the open-bus behavior of an absent register.
pub trait Component {
    fn read_io_register(&mut self, address: u16) -> u8 {
        let _ = address;
        0xFF
    }

    fn write_io_register(&mut self, address: u16, value: u8) {
        let _ = (address, value);
    }
}

/// Owner of one slot in the IO register table.
///
/// IO dispatch goes through a fixed 128-entry table of these tags rather
/// than trait objects: the set of peripherals is closed, and the table makes
/// the full register map readable in one place.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IoHandler {
    Joypad,
    Timer,
    InterruptFlag,
    Apu,
    Ppu,
    Dma,
    Unmapped,
}

const fn build_io_table() -> [IoHandler; map::IO_SLOTS] {
    let mut table = [IoHandler::Unmapped; map::IO_SLOTS];
    table[0x00] = IoHandler::Joypad;
    let mut slot = 0x04;
    while slot <= 0x07 {
        table[slot] = IoHandler::Timer;
        slot += 1;
    }
    table[0x0F] = IoHandler::InterruptFlag;
    slot = (io::APU_START - map::IO_START) as usize;
    while slot <= (io::APU_END - map::IO_START) as usize {
        table[slot] = IoHandler::Apu;
        slot += 1;
    }
    slot = (io::LCDC - map::IO_START) as usize;
    while slot <= (io::WX - map::IO_START) as usize {
        table[slot] = IoHandler::Ppu;
        slot += 1;
    }
    table[(io::DMA - map::IO_START) as usize] = IoHandler::Dma;
    table
}

const IO_TABLE: [IoHandler; map::IO_SLOTS] = build_io_table();

pub struct Bus<'a> {
    wram: &'a mut Wram,
    hram: &'a mut Hram,
    ppu: &'a mut Ppu,
    apu: &'a mut Apu,
    timer: &'a mut Timer,
    joypad: &'a mut Joypad,
    dma: &'a mut DmaController,
    cartridge: &'a mut Cartridge,
    interrupts: &'a mut InterruptLine,
}

impl<'a> Bus<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        wram: &'a mut Wram,
        hram: &'a mut Hram,
        ppu: &'a mut Ppu,
        apu: &'a mut Apu,
        timer: &'a mut Timer,
        joypad: &'a mut Joypad,
        dma: &'a mut DmaController,
        cartridge: &'a mut Cartridge,
        interrupts: &'a mut InterruptLine,
    ) -> Self {
        Self {
            wram,
            hram,
            ppu,
            apu,
            timer,
            joypad,
            dma,
            cartridge,
            interrupts,
        }
    }

    /// A processor-originated read, subject to the DMA conflict rule.
    pub fn read(&mut self, address: u16) -> u8 {
        self.read_address(address, false)
    }

    /// A processor-originated write, subject to the DMA conflict rule.
    pub fn write(&mut self, address: u16, value: u8) {
        self.write_address(address, value, false);
    }

    /// Resolves a read. `internal` accesses come from the hardware itself
    /// (DMA fetches, pipeline fetches) and bypass both the DMA conflict rule
    /// and the mode-based VRAM/OAM gates.
    pub fn read_address(&mut self, address: u16, internal: bool) -> u8 {
        match address {
            map::IO_START..=map::IO_END => self.read_io(address),
            map::IE => self.interrupts.read_enable(),
            map::HRAM_START..=map::HRAM_END => {
                self.hram.read((address - map::HRAM_START) as usize)
            }
            // While DMA holds the bus, every other external access observes
            // the byte DMA is currently fetching.
            _ if !internal && self.dma.active() => {
                let source = self.dma.current_source();
                self.read_address(source, true)
            }
            map::ROM_START..=map::ROM_END
            | map::EXTERNAL_RAM_START..=map::EXTERNAL_RAM_END => {
                self.cartridge.read_address(address)
            }
            map::ECHO_START..=map::ECHO_END => self
                .wram
                .read((address - map::ECHO_OFFSET - map::WRAM_START) as usize),
            map::WRAM_START..=map::WRAM_END => {
                self.wram.read((address - map::WRAM_START) as usize)
            }
            map::VRAM_START..=map::VRAM_END => self.ppu.read_vram(address, internal),
            map::OAM_START..=map::OAM_END => self.ppu.read_oam(address, internal),
            // 0xFEA0..=0xFEFF is unusable.
            _ => 0xFF,
        }
    }

    /// Resolves a write; see [`Bus::read_address`] for `internal`.
    pub fn write_address(&mut self, address: u16, value: u8, internal: bool) {
        match address {
            map::IO_START..=map::IO_END => self.write_io(address, value),
            map::IE => self.interrupts.write_enable(value),
            map::HRAM_START..=map::HRAM_END => {
                self.hram.write((address - map::HRAM_START) as usize, value);
            }
            // External writes are dropped while DMA holds the bus.
            _ if !internal && self.dma.active() => {}
            map::ROM_START..=map::ROM_END
            | map::EXTERNAL_RAM_START..=map::EXTERNAL_RAM_END => {
                self.cartridge.write_address(address, value);
            }
            map::ECHO_START..=map::ECHO_END => self
                .wram
                .write((address - map::ECHO_OFFSET - map::WRAM_START) as usize, value),
            map::WRAM_START..=map::WRAM_END => {
                self.wram.write((address - map::WRAM_START) as usize, value);
            }
            map::VRAM_START..=map::VRAM_END => self.ppu.write_vram(address, value, internal),
            map::OAM_START..=map::OAM_END => self.ppu.write_oam(address, value, internal),
            _ => {}
        }
    }

    fn read_io(&mut self, address: u16) -> u8 {
        let slot = (address - map::IO_START) as usize;
        match IO_TABLE[slot] {
            IoHandler::Joypad => self.joypad.read_io_register(address),
            IoHandler::Timer => self.timer.read_io_register(address),
            IoHandler::InterruptFlag => self.interrupts.read_request(),
            IoHandler::Apu => self.apu.read_io_register(address),
            IoHandler::Ppu => self.ppu.read_io_register(address),
            IoHandler::Dma => self.dma.read_io_register(address),
            IoHandler::Unmapped => {
                debug!("unmapped IO read at {address:#06x}");
                0xFF
            }
        }
    }

    fn write_io(&mut self, address: u16, value: u8) {
        let slot = (address - map::IO_START) as usize;
        match IO_TABLE[slot] {
            IoHandler::Joypad => self.joypad.write_io_register(address, value),
            IoHandler::Timer => self.timer.write_io_register(address, value),
            IoHandler::InterruptFlag => self.interrupts.write_request(value),
            IoHandler::Apu => self.apu.write_io_register(address, value),
            IoHandler::Ppu => self.ppu.write_io_register(address, value),
            IoHandler::Dma => self.dma.write_io_register(address, value),
            IoHandler::Unmapped => {
                debug!("unmapped IO write at {address:#06x}: {value:#04x}");
            }
        }
    }

    pub fn interrupts(&mut self) -> &mut InterruptLine {
        self.interrupts
    }

    /// Raises an interrupt request; reports whether the bit rose 0 to 1.
    pub fn request_interrupt(&mut self, interrupt: Interrupt) -> bool {
        self.interrupts.request(interrupt)
    }

    pub fn tick_timer(&mut self) {
        self.timer.tick(self.interrupts);
    }

    pub fn tick_ppu(&mut self) {
        // The PPU samples DMA activity before DMA advances this dot, so a
        // scan that starts mid-transfer sees the bus as busy.
        let dma_active = self.dma.active();
        self.ppu.tick(self.interrupts, dma_active);
    }

    pub fn tick_apu(&mut self) {
        self.apu.tick();
    }

    /// Moves one byte of an active OAM DMA transfer; one byte per dot.
    pub fn tick_dma(&mut self) {
        if !self.dma.active() {
            return;
        }
        let value = self.read_address(self.dma.current_source(), true);
        let destination = map::OAM_START + u16::from(self.dma.current_offset());
        self.write_address(destination, value, true);
        self.dma.advance();
    }

    pub fn tick_joypad(&mut self, buttons: Buttons) {
        self.joypad.tick(buttons, self.interrupts);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ppu::Model;

    struct Fixture {
        wram: Wram,
        hram: Hram,
        ppu: Ppu,
        apu: Apu,
        timer: Timer,
        joypad: Joypad,
        dma: DmaController,
        cartridge: Cartridge,
        interrupts: InterruptLine,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                wram: Wram::new(),
                hram: Hram::new(),
                ppu: Ppu::new(Model::Dmg),
                apu: Apu::new(),
                timer: Timer::new(),
                joypad: Joypad::new(),
                dma: DmaController::new(),
                cartridge: Cartridge::new(),
                interrupts: InterruptLine::new(),
            }
        }

        fn bus(&mut self) -> Bus<'_> {
            Bus::new(
                &mut self.wram,
                &mut self.hram,
                &mut self.ppu,
                &mut self.apu,
                &mut self.timer,
                &mut self.joypad,
                &mut self.dma,
                &mut self.cartridge,
                &mut self.interrupts,
            )
        }
    }

    #[test]
    fn echo_ram_mirrors_work_ram() {
        let mut fixture = Fixture::new();
        let mut bus = fixture.bus();
        bus.write(0xC123, 0x5A);
        assert_eq!(bus.read(0xE123), 0x5A);
        bus.write(0xFDFF, 0xA5);
        assert_eq!(bus.read(0xDDFF), 0xA5);
    }

    #[test]
    fn unusable_region_reads_open_bus() {
        let mut fixture = Fixture::new();
        let mut bus = fixture.bus();
        bus.write(0xFEA0, 0x12);
        assert_eq!(bus.read(0xFEA0), 0xFF);
    }

    #[test]
    fn unmapped_io_reads_open_bus() {
        let mut fixture = Fixture::new();
        let mut bus = fixture.bus();
        assert_eq!(bus.read(0xFF01), 0xFF);
        assert_eq!(bus.read(0xFF7F), 0xFF);
    }

    #[test]
    fn dma_copies_one_byte_per_dot() {
        let mut fixture = Fixture::new();
        let mut bus = fixture.bus();
        for offset in 0..0xA0u16 {
            bus.write(0xC000 + offset, offset as u8);
        }
        bus.write(io::DMA, 0xC0);
        for dot in 0..160 {
            assert!(fixture.dma.active(), "active through dot {dot}");
            fixture.bus().tick_dma();
        }
        assert!(!fixture.dma.active());
        assert_eq!(fixture.ppu.read_oam(map::OAM_START, true), 0x00);
        assert_eq!(fixture.ppu.read_oam(map::OAM_START + 0x9F, true), 0x9F);
    }

    #[test]
    fn conflicting_reads_observe_the_dma_source() {
        let mut fixture = Fixture::new();
        let mut bus = fixture.bus();
        bus.write(0xC000, 0x11);
        bus.write(0xC001, 0x22);
        bus.write(io::DMA, 0xC0);

        // Any external non-HRAM read returns the byte DMA is fetching.
        assert_eq!(bus.read(0xD555), 0x11);
        bus.tick_dma();
        assert_eq!(bus.read(0x8000), 0x22);

        // External writes outside HRAM/IO are dropped.
        bus.write(0xC050, 0x99);
        while bus.dma.active() {
            bus.tick_dma();
        }
        assert_eq!(bus.read(0xC050), 0x00);
    }

    #[test]
    fn hram_and_io_stay_reachable_during_dma() {
        let mut fixture = Fixture::new();
        let mut bus = fixture.bus();
        bus.write(io::DMA, 0xC0);
        bus.write(0xFF80, 0x77);
        assert_eq!(bus.read(0xFF80), 0x77);
        assert_eq!(bus.read(io::DMA), 0xC0);
    }

    #[test]
    fn interrupt_registers_resolve_through_the_bus() {
        let mut fixture = Fixture::new();
        let mut bus = fixture.bus();
        bus.write(map::IE, 0xAB);
        assert_eq!(bus.read(map::IE), 0xAB);
        bus.write(io::IF, 0x05);
        assert_eq!(bus.read(io::IF), 0xE5, "unused IF bits float high");

        assert!(!bus.request_interrupt(Interrupt::VBlank), "bit already set");
        assert!(bus.request_interrupt(Interrupt::Stat));
        assert_eq!(bus.read(io::IF), 0xE7);
    }
}
