//! Interrupt request/enable fabric shared by every component on the bus.

/// Interrupt sources in priority order; the lowest index always wins when
/// several are pending at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    Stat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl Interrupt {
    /// Fixed service vector: 0x40, 0x48, 0x50, 0x58, 0x60.
    pub fn vector(self) -> u16 {
        crate::memory::map::INTERRUPT_VECTORS + (self as u16) * 0x08
    }

    pub fn mask(self) -> u8 {
        1 << (self as u8)
    }

    fn from_bit(bit: u8) -> Self {
        match bit {
            0 => Self::VBlank,
            1 => Self::Stat,
            2 => Self::Timer,
            3 => Self::Serial,
            _ => Self::Joypad,
        }
    }
}

/// The IF/IE register pair (0xFF0F / 0xFFFF).
///
/// Both masks are mutated through the bus; this struct is the single owner so
/// edge reporting in [`InterruptLine::request`] stays authoritative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InterruptLine {
    requested: u8,
    enabled: u8,
}

impl InterruptLine {
    const USED_BITS: u8 = 0x1F;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        self.requested = 0;
        // Post-boot IE is empty; ROMs enable what they use.
        self.enabled = 0;
    }

    /// Sets the request bit for `interrupt` and reports whether it
    /// transitioned 0 to 1, letting callers distinguish edges from levels.
    pub fn request(&mut self, interrupt: Interrupt) -> bool {
        let mask = interrupt.mask();
        let was_clear = self.requested & mask == 0;
        self.requested |= mask;
        was_clear
    }

    /// Clears the request bit once an interrupt has been dispatched.
    pub fn acknowledge(&mut self, interrupt: Interrupt) {
        self.requested &= !interrupt.mask();
    }

    /// Requested-and-enabled bits.
    pub fn pending(&self) -> u8 {
        self.requested & self.enabled & Self::USED_BITS
    }

    /// Highest-priority pending interrupt, when any.
    pub fn next_pending(&self) -> Option<Interrupt> {
        let pending = self.pending();
        if pending == 0 {
            None
        } else {
            Some(Interrupt::from_bit(pending.trailing_zeros() as u8))
        }
    }

    /// IF read: unused upper bits float high on hardware.
    pub fn read_request(&self) -> u8 {
        !Self::USED_BITS | self.requested
    }

    pub fn write_request(&mut self, value: u8) {
        self.requested = value & Self::USED_BITS;
    }

    /// IE read: all eight bits are writable storage on hardware.
    pub fn read_enable(&self) -> u8 {
        self.enabled
    }

    pub fn write_enable(&mut self, value: u8) {
        self.enabled = value;
    }
}
