use core::ops::{Deref, DerefMut};

/// Fixed-size byte storage with slice access.
///
/// Every RAM block in the system is a plain array behind this newtype; the
/// typed aliases below keep the sizes tied to the memory map in one place.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ram<const N: usize>([u8; N]);

pub mod blocks {
    use crate::memory::map;
    use crate::ppu::{SCREEN_H, SCREEN_W};

    pub type Wram = super::Ram<{ map::WRAM_SIZE }>;
    pub type Hram = super::Ram<{ map::HRAM_SIZE }>;
    pub type Vram = super::Ram<{ map::VRAM_SIZE }>;
    pub type Oam = super::Ram<{ map::OAM_SIZE }>;
    /// One 2-bit shade index per screen pixel.
    pub type FrameBuffer = super::Ram<{ SCREEN_W as usize * SCREEN_H as usize }>;
}

impl<const N: usize> Ram<N> {
    pub fn new() -> Self {
        Self([0; N])
    }

    pub fn read(&self, addr: usize) -> u8 {
        self.0[addr]
    }

    pub fn write(&mut self, addr: usize, value: u8) {
        self.0[addr] = value;
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.0
    }
}

impl<const N: usize> Default for Ram<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> Deref for Ram<N> {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.as_slice()
    }
}

impl<const N: usize> DerefMut for Ram<N> {
    fn deref_mut(&mut self) -> &mut Self::Target {
        self.as_mut_slice()
    }
}
