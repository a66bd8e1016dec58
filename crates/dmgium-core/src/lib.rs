use crate::{
    apu::Apu,
    bus::Bus,
    cartridge::Cartridge,
    cpu::Cpu,
    dma::DmaController,
    error::Error,
    interrupt::InterruptLine,
    joypad::{Buttons, Joypad},
    ppu::{Model, Ppu},
    ram::blocks::{Hram, Wram},
    timer::Timer,
};

pub mod apu;
pub mod bus;
pub mod cartridge;
pub mod cpu;
pub mod dma;
pub mod error;
pub mod interrupt;
pub mod joypad;
pub mod memory;
pub mod ppu;
pub mod ram;
pub mod timer;

/// Dots per frame: 154 scanlines of 456 dots.
pub const DOTS_PER_FRAME: u32 =
    ppu::DOTS_PER_SCANLINE as u32 * ppu::SCANLINES_PER_FRAME as u32;

/// The whole console: every component plus the master dot scheduler.
///
/// Components never hold references to each other. Each call to [`GameBoy::tick`]
/// builds a fresh [`Bus`] view over the fields and hands every component its
/// turn in a fixed order, so all cross-component traffic flows through the
/// bus during that one dot.
#[derive(Debug)]
pub struct GameBoy {
    pub cpu: Cpu,
    pub ppu: Ppu,
    apu: Apu,
    timer: Timer,
    joypad: Joypad,
    dma: DmaController,
    cartridge: Cartridge,
    wram: Wram,
    hram: Hram,
    interrupts: InterruptLine,
    /// Dot position within the current frame.
    frame_dots: u32,
    frame_number: u64,
}

impl GameBoy {
    /// Constructs a powered-on console in the post-boot state.
    pub fn new(model: Model) -> Self {
        Self {
            cpu: Cpu::new(),
            ppu: Ppu::new(model),
            apu: Apu::new(),
            timer: Timer::new(),
            joypad: Joypad::new(),
            dma: DmaController::new(),
            cartridge: Cartridge::new(),
            wram: Wram::new(),
            hram: Hram::new(),
            interrupts: InterruptLine::new(),
            frame_dots: 0,
            frame_number: 0,
        }
    }

    /// Validates and inserts a ROM image, then resets to the post-boot state.
    pub fn load_rom(&mut self, bytes: Vec<u8>) -> Result<(), Error> {
        self.cartridge.load_rom(bytes)?;
        self.reset();
        Ok(())
    }

    /// Returns every component to its post-boot state; the cartridge keeps
    /// its ROM and RAM contents.
    pub fn reset(&mut self) {
        self.cpu.reset();
        self.ppu.reset();
        self.apu.reset();
        self.timer.reset();
        self.joypad.reset();
        self.dma.reset();
        self.interrupts.reset();
        self.wram = Wram::new();
        self.hram = Hram::new();
        self.frame_dots = 0;
        self.frame_number = 0;
    }

    /// Advances the whole system by one dot.
    ///
    /// Components are ticked in a fixed order every dot: timer, pixel
    /// pipeline, audio, DMA, joypad, processor. The processor gates itself
    /// internally to one instruction boundary per four dots at minimum.
    ///
    /// Returns `Ok(true)` exactly once per 70224 dots, when a frame has
    /// completed and the framebuffer is stable.
    pub fn tick(&mut self, buttons: Buttons) -> Result<bool, Error> {
        let mut bus = Bus::new(
            &mut self.wram,
            &mut self.hram,
            &mut self.ppu,
            &mut self.apu,
            &mut self.timer,
            &mut self.joypad,
            &mut self.dma,
            &mut self.cartridge,
            &mut self.interrupts,
        );
        bus.tick_timer();
        bus.tick_ppu();
        bus.tick_apu();
        bus.tick_dma();
        bus.tick_joypad(buttons);
        self.cpu.tick(&mut bus)?;

        self.frame_dots += 1;
        if self.frame_dots == DOTS_PER_FRAME {
            self.frame_dots = 0;
            self.frame_number += 1;
            self.ppu.frame_restart();
            return Ok(true);
        }
        Ok(false)
    }

    /// Ticks until the next frame completes.
    pub fn run_frame(&mut self, buttons: Buttons) -> Result<(), Error> {
        while !self.tick(buttons)? {}
        Ok(())
    }

    /// Completed frames since power-on.
    pub fn frame_count(&self) -> u64 {
        self.frame_number
    }

    /// Shade indices (0..=3) of the last completed frame, row-major 160x144.
    pub fn framebuffer(&self) -> &[u8] {
        self.ppu.framebuffer()
    }

    pub fn cartridge(&self) -> &Cartridge {
        &self.cartridge
    }

    /// A bus view over the components, for frontends and tests that need to
    /// peek or poke memory between dots.
    pub fn bus(&mut self) -> Bus<'_> {
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

impl Default for GameBoy {
    fn default() -> Self {
        Self::new(Model::Dmg)
    }
}

#[cfg(test)]
mod tests {
    use ctor::ctor;
    use tracing::Level;
    use tracing_subscriber::FmtSubscriber;

    #[ctor]
    fn init_tracing() {
        let subscriber = FmtSubscriber::builder()
            .with_file(true)
            .with_line_number(true)
            .with_max_level(Level::DEBUG)
            .pretty()
            .finish();
        tracing::subscriber::set_global_default(subscriber).expect("Failed to set subscriber");
    }
}
