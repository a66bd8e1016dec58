use crate::bus::Component;
use crate::memory::{io, map};

/// Total bytes moved by one OAM DMA transfer, one per dot.
pub const TRANSFER_LEN: u8 = map::OAM_SIZE as u8;

/// OAM DMA controller (0xFF46).
///
/// Writing the register latches a source page and restarts the copy; while a
/// transfer runs the bus routes conflicting external accesses to the byte the
/// controller is reading at that instant.
#[derive(Debug, Clone, Copy)]
pub struct DmaController {
    source_page: u8,
    /// Next byte offset to copy; [`TRANSFER_LEN`] means idle.
    counter: u8,
}

impl DmaController {
    pub fn new() -> Self {
        Self {
            source_page: 0,
            counter: TRANSFER_LEN,
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn active(&self) -> bool {
        self.counter < TRANSFER_LEN
    }

    /// Source address of the byte being copied on this dot.
    pub fn current_source(&self) -> u16 {
        (u16::from(self.source_page) << 8) | u16::from(self.counter)
    }

    /// OAM offset of the byte being copied on this dot.
    pub fn current_offset(&self) -> u8 {
        self.counter
    }

    /// Moves to the next byte after the bus has performed the copy.
    pub fn advance(&mut self) {
        if self.active() {
            self.counter += 1;
        }
    }
}

impl Default for DmaController {
    fn default() -> Self {
        Self::new()
    }
}

impl Component for DmaController {
    fn read_io_register(&mut self, address: u16) -> u8 {
        match address {
            // The register reads back the last written source page.
            io::DMA => self.source_page,
            _ => 0xFF,
        }
    }

    fn write_io_register(&mut self, address: u16, value: u8) {
        if address == io::DMA {
            self.source_page = value;
            self.counter = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_restarts_transfer() {
        let mut dma = DmaController::new();
        assert!(!dma.active());

        dma.write_io_register(io::DMA, 0xC1);
        assert!(dma.active());
        assert_eq!(dma.current_source(), 0xC100);

        for _ in 0..40 {
            dma.advance();
        }
        assert_eq!(dma.current_source(), 0xC128);
        assert_eq!(dma.read_io_register(io::DMA), 0xC1);

        for _ in 0..120 {
            dma.advance();
        }
        assert!(!dma.active());
    }
}
